//! Domain types and configuration shared by every leadscout crate.

pub mod app_config;
pub mod config;
pub mod job;
pub mod record;
pub mod schedule;
pub mod settings;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use job::{
    JobSpec, JobStatus, JobTemplate, NotifyCredentials, OutputNaming, Pagination, PhoneMode,
    QueuedJob, SourceFilters, UploadCredentials,
};
pub use record::{EmailSlot, NormalizedRow, RawRecord, BUSINESS_COLUMNS, EMAIL_SLOTS};
pub use schedule::{
    parse_weekday, weekday_name, Fingerprint, NewSchedule, PhoneBucket, Schedule, SlotTime,
};
pub use settings::{Settings, REDACTED, SETTINGS_KEY};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("unknown phone filter: {0}")]
    InvalidPhoneFilter(String),
    #[error("phone filter specific_number requires a phone number")]
    MissingPhoneNumber,
    #[error("unknown weekday: {0}")]
    InvalidWeekday(String),
    #[error("invalid slot {hour:02}:{minute:02}")]
    InvalidSlot { hour: i64, minute: i64 },
    #[error("unknown job status: {0}")]
    InvalidJobStatus(String),
}
