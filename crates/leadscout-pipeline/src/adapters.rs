//! Port implementations over the HTTP clients and the Postgres store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadscout_core::{
    JobTemplate, NewSchedule, NormalizedRow, NotifyCredentials, QueuedJob, RawRecord, Schedule,
    Settings, UploadCredentials,
};
use leadscout_db::{DbError, ScheduleListing};
use leadscout_scraper::{PlacesClient, PlacesQuery, ScraperError};
use leadscout_sinks::{InstantlyClient, Lead, SinkError, SlackClient, UploadOutcome};
use leadscout_verifier::{EmailVerdict, EmailVerifierClient, VerifierError};
use sqlx::PgPool;

use crate::ports::{
    EmailVerifier, JobQueue, LeadSink, Notifier, RecordSource, ScheduleStore, SettingsStore,
    Snapshot, SnapshotStore,
};

#[async_trait]
impl RecordSource for PlacesClient {
    async fn fetch_page(
        &self,
        api_key: &str,
        query: &PlacesQuery,
    ) -> Result<Vec<RawRecord>, ScraperError> {
        PlacesClient::fetch_page(self, api_key, query).await
    }
}

#[async_trait]
impl EmailVerifier for EmailVerifierClient {
    async fn verify_batch(
        &self,
        api_key: &str,
        emails: &[String],
    ) -> Result<Vec<EmailVerdict>, VerifierError> {
        EmailVerifierClient::verify_batch(self, api_key, emails).await
    }
}

#[async_trait]
impl Notifier for SlackClient {
    async fn post_message(&self, creds: &NotifyCredentials, text: &str) -> Result<(), SinkError> {
        SlackClient::post_message(self, creds, text).await
    }

    async fn post_file(
        &self,
        creds: &NotifyCredentials,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), SinkError> {
        SlackClient::post_file(self, creds, bytes, filename).await
    }
}

#[async_trait]
impl LeadSink for InstantlyClient {
    async fn upload_leads(
        &self,
        creds: &UploadCredentials,
        leads: &[Lead],
    ) -> Result<UploadOutcome, SinkError> {
        InstantlyClient::upload_leads(self, creds, leads).await
    }
}

/// Every store port backed by one Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SettingsStore for PgStore {
    async fn load_settings(&self) -> Result<Settings, DbError> {
        leadscout_db::load_settings(&self.pool).await
    }
}

#[async_trait]
impl SnapshotStore for PgStore {
    async fn insert_snapshot(&self, rows: &[NormalizedRow]) -> Result<i64, DbError> {
        leadscout_db::insert_snapshot(&self.pool, rows).await
    }

    async fn oldest_unverified(&self) -> Result<Option<Snapshot>, DbError> {
        let Some(row) = leadscout_db::oldest_unverified_snapshot(&self.pool).await? else {
            return Ok(None);
        };
        Ok(Some(Snapshot {
            id: row.id,
            rows: row.decode_rows()?,
        }))
    }

    async fn mark_verified(&self, id: i64, rows: &[NormalizedRow]) -> Result<(), DbError> {
        leadscout_db::mark_snapshot_verified(&self.pool, id, rows).await
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn list_schedules(&self) -> Result<ScheduleListing, DbError> {
        leadscout_db::list_schedules(&self.pool).await
    }

    async fn insert_schedules(&self, schedules: &[NewSchedule]) -> Result<Vec<Schedule>, DbError> {
        leadscout_db::insert_schedules(&self.pool, schedules).await
    }

    async fn claim_schedule(&self, id: i64, slot_start: DateTime<Utc>) -> Result<bool, DbError> {
        leadscout_db::claim_schedule(&self.pool, id, slot_start).await
    }

    async fn increment_skip_times(&self, id: i64) -> Result<(), DbError> {
        leadscout_db::increment_skip_times(&self.pool, id).await
    }

    async fn set_paused(&self, id: i64, paused: bool) -> Result<(), DbError> {
        leadscout_db::set_paused(&self.pool, id, paused).await
    }
}

#[async_trait]
impl JobQueue for PgStore {
    async fn enqueue_job(
        &self,
        template: &JobTemplate,
        record_limit: i32,
        skip_times: i32,
    ) -> Result<QueuedJob, DbError> {
        leadscout_db::enqueue_job(&self.pool, template, record_limit, skip_times).await
    }

    async fn claim_next_pending(&self) -> Result<Option<QueuedJob>, DbError> {
        leadscout_db::claim_next_pending_job(&self.pool).await
    }

    async fn complete_job(&self, id: i64) -> Result<(), DbError> {
        leadscout_db::complete_job(&self.pool, id).await
    }

    async fn fail_job(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        leadscout_db::fail_job(&self.pool, id, error_message).await
    }

    async fn delete_job(&self, id: i64) -> Result<(), DbError> {
        leadscout_db::delete_job(&self.pool, id).await
    }

    async fn fail_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        leadscout_db::fail_stale_jobs(&self.pool, cutoff).await
    }

    async fn reap_finished_jobs(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        leadscout_db::reap_finished_jobs(&self.pool, cutoff).await
    }
}
