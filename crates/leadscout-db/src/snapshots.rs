//! Snapshots of unverified rows awaiting re-verification.

use chrono::{DateTime, Utc};
use leadscout_core::NormalizedRow;
use sqlx::PgPool;

use crate::DbError;

/// A row from the `saved_snapshots` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SnapshotRow {
    pub id: i64,
    pub rows: serde_json::Value,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl SnapshotRow {
    /// Decodes the stored rows.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Json`] if the stored value is not a row array.
    pub fn decode_rows(&self) -> Result<Vec<NormalizedRow>, DbError> {
        serde_json::from_value(self.rows.clone()).map_err(|source| DbError::Json {
            context: "snapshot rows",
            source,
        })
    }
}

fn encode_rows(rows: &[NormalizedRow]) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(rows).map_err(|source| DbError::Json {
        context: "snapshot rows",
        source,
    })
}

/// Stores an unverified snapshot and returns its `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_snapshot(pool: &PgPool, rows: &[NormalizedRow]) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO saved_snapshots (rows) VALUES ($1) RETURNING id",
    )
    .bind(encode_rows(rows)?)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn oldest_unverified_snapshot(pool: &PgPool) -> Result<Option<SnapshotRow>, DbError> {
    let row = sqlx::query_as::<_, SnapshotRow>(
        "SELECT id, rows, verified, created_at, verified_at \
         FROM saved_snapshots \
         WHERE NOT verified \
         ORDER BY created_at, id \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Replaces the snapshot's rows with their verified form and marks it done.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the snapshot is missing or already
/// verified, or [`DbError::Sqlx`] if the update fails.
pub async fn mark_snapshot_verified(
    pool: &PgPool,
    id: i64,
    rows: &[NormalizedRow],
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE saved_snapshots \
         SET rows = $2, verified = TRUE, verified_at = NOW() \
         WHERE id = $1 AND NOT verified",
    )
    .bind(id)
    .bind(encode_rows(rows)?)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
