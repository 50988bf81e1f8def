//! Database operations for the one-time `scrape_queue`.

use chrono::{DateTime, Utc};
use leadscout_core::{JobStatus, JobTemplate, QueuedJob};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const JOB_COLUMNS: &str = "id, public_id, status, job, record_limit, skip_times, \
     error_message, created_at, updated_at";

/// A row from the `scrape_queue` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QueuedJobRow {
    pub id: i64,
    pub public_id: Uuid,
    pub status: String,
    pub job: serde_json::Value,
    pub record_limit: i32,
    pub skip_times: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QueuedJobRow> for QueuedJob {
    type Error = DbError;

    fn try_from(row: QueuedJobRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<JobStatus>()
            .map_err(|e| DbError::Decode {
                context: "job status",
                reason: e.to_string(),
            })?;
        let template: JobTemplate =
            serde_json::from_value(row.job).map_err(|source| DbError::Json {
                context: "queued job",
                source,
            })?;

        Ok(QueuedJob {
            id: row.id,
            public_id: row.public_id,
            status,
            template,
            record_limit: row.record_limit,
            skip_times: row.skip_times,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Inserts a `pending` job and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails or [`DbError::Json`] if the
/// template cannot be serialized.
pub async fn enqueue_job(
    pool: &PgPool,
    template: &JobTemplate,
    record_limit: i32,
    skip_times: i32,
) -> Result<QueuedJob, DbError> {
    let job = serde_json::to_value(template).map_err(|source| DbError::Json {
        context: "queued job",
        source,
    })?;

    let row = sqlx::query_as::<_, QueuedJobRow>(&format!(
        "INSERT INTO scrape_queue (public_id, status, job, record_limit, skip_times) \
         VALUES ($1, 'pending', $2, $3, $4) \
         RETURNING {JOB_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(job)
    .bind(record_limit)
    .bind(skip_times)
    .fetch_one(pool)
    .await?;

    QueuedJob::try_from(row)
}

/// Moves the oldest `pending` job to `running` and returns it.
///
/// Rows locked by another worker are skipped, so two processors never claim
/// the same job.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_next_pending_job(pool: &PgPool) -> Result<Option<QueuedJob>, DbError> {
    let row = sqlx::query_as::<_, QueuedJobRow>(&format!(
        "UPDATE scrape_queue \
         SET status = 'running', updated_at = NOW() \
         WHERE id = ( \
             SELECT id FROM scrape_queue \
             WHERE status = 'pending' \
             ORDER BY created_at, id \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED \
         ) \
         RETURNING {JOB_COLUMNS}"
    ))
    .fetch_optional(pool)
    .await?;

    row.map(QueuedJob::try_from).transpose()
}

/// Marks a `running` job as `completed`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_job(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_queue \
         SET status = 'completed', updated_at = NOW() \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a `running` job as `failed` with `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidJobTransition`] if the job is not running, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_job(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE scrape_queue \
         SET status = 'failed', error_message = $2, updated_at = NOW() \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidJobTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Removes a job outright. Used for jobs whose scrape returned no data.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_job(pool: &PgPool, id: i64) -> Result<(), DbError> {
    sqlx::query("DELETE FROM scrape_queue WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fails every `running` job last touched before `cutoff`. Returns how many
/// jobs were failed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn fail_stale_jobs(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE scrape_queue \
         SET status = 'failed', error_message = 'job timed out', updated_at = NOW() \
         WHERE status = 'running' AND updated_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Deletes `completed` and `failed` jobs last touched before `cutoff`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn reap_finished_jobs(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
    let result = sqlx::query(
        "DELETE FROM scrape_queue \
         WHERE status IN ('completed', 'failed') AND updated_at < $1",
    )
    .bind(cutoff)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_job(pool: &PgPool, public_id: Uuid) -> Result<QueuedJob, DbError> {
    let row = sqlx::query_as::<_, QueuedJobRow>(&format!(
        "SELECT {JOB_COLUMNS} FROM scrape_queue WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    QueuedJob::try_from(row)
}
