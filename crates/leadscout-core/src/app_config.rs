use std::net::SocketAddr;
use std::path::PathBuf;

use chrono_tz::Tz;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub area_codes_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Wall-clock budget for one verification stage.
    pub verify_budget_ms: u64,
    pub verify_batch_delay_ms: u64,
    /// Six-field cron expression (with seconds) for the dispatcher tick.
    pub dispatch_cron: String,
    pub default_time_zone: Tz,
    pub stale_job_minutes: i64,
    pub source_api_url: String,
    pub verifier_api_url: String,
    pub slack_api_url: String,
    pub instantly_api_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("area_codes_path", &self.area_codes_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("verify_budget_ms", &self.verify_budget_ms)
            .field("verify_batch_delay_ms", &self.verify_batch_delay_ms)
            .field("dispatch_cron", &self.dispatch_cron)
            .field("default_time_zone", &self.default_time_zone)
            .field("stale_job_minutes", &self.stale_job_minutes)
            .field("source_api_url", &self.source_api_url)
            .field("verifier_api_url", &self.verifier_api_url)
            .field("slack_api_url", &self.slack_api_url)
            .field("instantly_api_url", &self.instantly_api_url)
            .finish()
    }
}
