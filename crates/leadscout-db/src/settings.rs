//! The `settings` key/value table. Only [`SETTINGS_KEY`] is interpreted.

use leadscout_core::{Settings, SETTINGS_KEY};
use serde_json::Value;
use sqlx::PgPool;

use crate::DbError;

/// Decodes a stored settings value. A string value holds the blob as
/// serialized JSON and is parsed again.
pub(crate) fn decode_settings(value: Value) -> Result<Settings, DbError> {
    let value = match value {
        Value::String(text) => serde_json::from_str(&text).map_err(|source| DbError::Json {
            context: "settings",
            source,
        })?,
        Value::Null => return Ok(Settings::default()),
        other => other,
    };
    serde_json::from_value(value).map_err(|source| DbError::Json {
        context: "settings",
        source,
    })
}

/// Loads the shared settings blob. A missing row yields empty settings.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Json`] if the
/// stored value is not a settings object.
pub async fn load_settings(pool: &PgPool) -> Result<Settings, DbError> {
    let value: Option<Value> =
        sqlx::query_scalar::<_, Value>("SELECT value FROM settings WHERE key = $1")
            .bind(SETTINGS_KEY)
            .fetch_optional(pool)
            .await?;

    match value {
        Some(v) => decode_settings(v),
        None => Ok(Settings::default()),
    }
}

/// Replaces the shared settings blob.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn save_settings(pool: &PgPool, settings: &Settings) -> Result<(), DbError> {
    let value = serde_json::to_value(settings).map_err(|source| DbError::Json {
        context: "settings",
        source,
    })?;

    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES ($1, $2, NOW()) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW()",
    )
    .bind(SETTINGS_KEY)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}
