use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_SOURCE_API_URL: &str = "https://dahab.app.outscraper.com";
pub const DEFAULT_VERIFIER_API_URL: &str = "https://api.millionverifier.com";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_INSTANTLY_API_URL: &str = "https://api.instantly.ai";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_with = |var: &str, default: &str| -> Result<String, ConfigError> {
        Ok(or_default(var, default))
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        parse_with(var, default)?
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        parse_with(var, default)?
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("LEADSCOUT_ENV", "development"))?;

    let bind_addr = or_default("LEADSCOUT_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("LEADSCOUT_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("LEADSCOUT_LOG_LEVEL", "info");
    let area_codes_path = PathBuf::from(or_default(
        "LEADSCOUT_AREA_CODES_PATH",
        "./config/area-codes.json",
    ));

    let db_max_connections = parse_u32("LEADSCOUT_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("LEADSCOUT_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("LEADSCOUT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let http_timeout_secs = parse_u64("LEADSCOUT_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("LEADSCOUT_USER_AGENT", "leadscout/0.1 (lead-collection)");
    let max_retries = parse_u32("LEADSCOUT_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("LEADSCOUT_RETRY_BACKOFF_BASE_MS", "1000")?;

    let verify_budget_ms = parse_u64("LEADSCOUT_VERIFY_BUDGET_MS", "9500")?;
    let verify_batch_delay_ms = parse_u64("LEADSCOUT_VERIFY_BATCH_DELAY_MS", "500")?;
    if verify_batch_delay_ms < 500 {
        return Err(invalid(
            "LEADSCOUT_VERIFY_BATCH_DELAY_MS",
            format!("{verify_batch_delay_ms} is below the 500 ms floor"),
        ));
    }

    let dispatch_cron = or_default("LEADSCOUT_DISPATCH_CRON", "0 * * * * *");
    let default_time_zone = or_default("LEADSCOUT_DEFAULT_TIME_ZONE", "Europe/London")
        .parse::<chrono_tz::Tz>()
        .map_err(|e| invalid("LEADSCOUT_DEFAULT_TIME_ZONE", e.to_string()))?;
    let stale_job_minutes = parse_with("LEADSCOUT_STALE_JOB_MINUTES", "30")?
        .parse::<i64>()
        .map_err(|e| invalid("LEADSCOUT_STALE_JOB_MINUTES", e.to_string()))?;

    let source_api_url = or_default("LEADSCOUT_SOURCE_API_URL", DEFAULT_SOURCE_API_URL);
    let verifier_api_url = or_default("LEADSCOUT_VERIFIER_API_URL", DEFAULT_VERIFIER_API_URL);
    let slack_api_url = or_default("LEADSCOUT_SLACK_API_URL", DEFAULT_SLACK_API_URL);
    let instantly_api_url = or_default("LEADSCOUT_INSTANTLY_API_URL", DEFAULT_INSTANTLY_API_URL);

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        area_codes_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        http_timeout_secs,
        user_agent,
        max_retries,
        retry_backoff_base_ms,
        verify_budget_ms,
        verify_batch_delay_ms,
        dispatch_cron,
        default_time_zone,
        stale_job_minutes,
        source_api_url,
        verifier_api_url,
        slack_api_url,
        instantly_api_url,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LEADSCOUT_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
