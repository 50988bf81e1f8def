//! Seams between the pipeline and the systems it drives.
//!
//! Each trait is implemented by a real client in [`crate::adapters`] and by
//! an in-memory fake in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadscout_core::{
    JobTemplate, NewSchedule, NormalizedRow, NotifyCredentials, QueuedJob, RawRecord, Schedule,
    Settings, UploadCredentials,
};
use leadscout_db::{DbError, ScheduleListing};
use leadscout_scraper::{PlacesQuery, ScraperError};
use leadscout_sinks::{Lead, SinkError, UploadOutcome};
use leadscout_verifier::{EmailVerdict, VerifierError};

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// One page of raw records. An empty page is `Ok(vec![])`.
    async fn fetch_page(
        &self,
        api_key: &str,
        query: &PlacesQuery,
    ) -> Result<Vec<RawRecord>, ScraperError>;
}

#[async_trait]
pub trait EmailVerifier: Send + Sync {
    /// Verdicts for at most 25 addresses, in input order.
    async fn verify_batch(
        &self,
        api_key: &str,
        emails: &[String],
    ) -> Result<Vec<EmailVerdict>, VerifierError>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_message(&self, creds: &NotifyCredentials, text: &str) -> Result<(), SinkError>;

    async fn post_file(
        &self,
        creds: &NotifyCredentials,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), SinkError>;
}

#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn upload_leads(
        &self,
        creds: &UploadCredentials,
        leads: &[Lead],
    ) -> Result<UploadOutcome, SinkError>;
}

#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load_settings(&self) -> Result<Settings, DbError>;
}

/// A stored batch of rows awaiting re-verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: i64,
    pub rows: Vec<NormalizedRow>,
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn insert_snapshot(&self, rows: &[NormalizedRow]) -> Result<i64, DbError>;

    async fn oldest_unverified(&self) -> Result<Option<Snapshot>, DbError>;

    async fn mark_verified(&self, id: i64, rows: &[NormalizedRow]) -> Result<(), DbError>;
}

#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn list_schedules(&self) -> Result<ScheduleListing, DbError>;

    /// Inserts every schedule or none.
    async fn insert_schedules(&self, schedules: &[NewSchedule]) -> Result<Vec<Schedule>, DbError>;

    /// `false` when the schedule was already claimed for `slot_start`.
    async fn claim_schedule(&self, id: i64, slot_start: DateTime<Utc>) -> Result<bool, DbError>;

    async fn increment_skip_times(&self, id: i64) -> Result<(), DbError>;

    async fn set_paused(&self, id: i64, paused: bool) -> Result<(), DbError>;
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue_job(
        &self,
        template: &JobTemplate,
        record_limit: i32,
        skip_times: i32,
    ) -> Result<QueuedJob, DbError>;

    async fn claim_next_pending(&self) -> Result<Option<QueuedJob>, DbError>;

    async fn complete_job(&self, id: i64) -> Result<(), DbError>;

    async fn fail_job(&self, id: i64, error_message: &str) -> Result<(), DbError>;

    async fn delete_job(&self, id: i64) -> Result<(), DbError>;

    async fn fail_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError>;

    async fn reap_finished_jobs(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError>;
}
