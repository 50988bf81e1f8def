//! In-memory fakes for every port.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc, Weekday};
use leadscout_core::{
    JobStatus, JobTemplate, NewSchedule, NormalizedRow, NotifyCredentials, QueuedJob, RawRecord,
    Schedule, Settings, SlotTime, UploadCredentials,
};
use leadscout_db::{DbError, ScheduleListing};
use leadscout_scraper::{AreaCodeTable, PlacesQuery, ScraperError};
use leadscout_sinks::{Lead, SinkError, UploadOutcome};
use leadscout_verifier::{EmailVerdict, VerifierError};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::ports::{
    EmailVerifier, JobQueue, LeadSink, Notifier, RecordSource, ScheduleStore, SettingsStore,
    Snapshot, SnapshotStore,
};
use crate::services::Services;

pub fn record(fields: &[(&str, &str)]) -> RawRecord {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string())))
        .collect();
    RawRecord(map)
}

pub fn full_settings() -> Settings {
    Settings {
        targetron_api_key: Some("src-key".to_string()),
        million_api_key: Some("mv-key".to_string()),
        slack_bot_token: Some("xoxb-1".to_string()),
        slack_channel_id: Some("C1".to_string()),
        instantly_api_key: Some("ik".to_string()),
        instantly_list_id: Some("list".to_string()),
        instantly_campaign_id: Some("camp".to_string()),
        ..Settings::default()
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSource {
    pages: Vec<Vec<RawRecord>>,
    fail_from: Option<usize>,
    calls: Mutex<Vec<PlacesQuery>>,
}

impl FakeSource {
    pub fn with_pages(pages: Vec<Vec<RawRecord>>) -> Self {
        Self {
            pages,
            ..Self::default()
        }
    }

    /// Calls with index `>= n` answer HTTP 500.
    pub fn failing_from(mut self, n: usize) -> Self {
        self.fail_from = Some(n);
        self
    }

    pub fn queries(&self) -> Vec<PlacesQuery> {
        self.calls.lock().unwrap().clone()
    }

    pub fn skips(&self) -> Vec<u64> {
        self.queries().iter().map(|q| q.skip).collect()
    }

    pub fn limits(&self) -> Vec<u32> {
        self.queries().iter().map(|q| q.limit).collect()
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_page(
        &self,
        _api_key: &str,
        query: &PlacesQuery,
    ) -> Result<Vec<RawRecord>, ScraperError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(query.clone());
            calls.len() - 1
        };
        if self.fail_from.is_some_and(|n| index >= n) {
            return Err(ScraperError::UnexpectedStatus {
                status: 500,
                url: "http://source.test/data/places".to_string(),
            });
        }
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeVerifier {
    accept_all: bool,
    accepted: HashSet<String>,
    failing_calls: HashSet<usize>,
    delay: Duration,
    calls: Mutex<Vec<(Instant, Vec<String>)>>,
}

impl FakeVerifier {
    pub fn accepting_all() -> Self {
        Self {
            accept_all: true,
            ..Self::default()
        }
    }

    pub fn accepting(emails: &[&str]) -> Self {
        Self {
            accepted: emails.iter().map(|e| (*e).to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn failing_call(mut self, n: usize) -> Self {
        self.failing_calls.insert(n);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(Instant, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailVerifier for FakeVerifier {
    async fn verify_batch(
        &self,
        _api_key: &str,
        emails: &[String],
    ) -> Result<Vec<EmailVerdict>, VerifierError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push((Instant::now(), emails.to_vec()));
            calls.len() - 1
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing_calls.contains(&index) {
            return Err(VerifierError::Api("insufficient credits".to_string()));
        }
        Ok(emails
            .iter()
            .map(|email| EmailVerdict {
                email: email.clone(),
                result: Some("ok".to_string()),
                quality: Some("good".to_string()),
                is_email_valid: self.accept_all || self.accepted.contains(email),
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Notifier and lead sink
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeNotifier {
    fail: bool,
    messages: Mutex<Vec<(String, String)>>,
    files: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(channel_id, text)` pairs in send order.
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        self.files.lock().unwrap().clone()
    }
}

fn slack_error() -> SinkError {
    SinkError::Api {
        method: "chat.postMessage".to_string(),
        error: "channel_not_found".to_string(),
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn post_message(&self, creds: &NotifyCredentials, text: &str) -> Result<(), SinkError> {
        if self.fail {
            return Err(slack_error());
        }
        self.messages
            .lock()
            .unwrap()
            .push((creds.channel_id.clone(), text.to_string()));
        Ok(())
    }

    async fn post_file(
        &self,
        _creds: &NotifyCredentials,
        bytes: Vec<u8>,
        filename: &str,
    ) -> Result<(), SinkError> {
        if self.fail {
            return Err(slack_error());
        }
        self.files.lock().unwrap().push((filename.to_string(), bytes));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLeadSink {
    unavailable: bool,
    uploaded: Mutex<Vec<Lead>>,
}

impl FakeLeadSink {
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn uploaded(&self) -> Vec<Lead> {
        self.uploaded.lock().unwrap().clone()
    }
}

#[async_trait]
impl LeadSink for FakeLeadSink {
    async fn upload_leads(
        &self,
        _creds: &UploadCredentials,
        leads: &[Lead],
    ) -> Result<UploadOutcome, SinkError> {
        if self.unavailable {
            return Err(SinkError::Unavailable {
                attempted: leads.len(),
            });
        }
        self.uploaded.lock().unwrap().extend(leads.iter().cloned());
        Ok(UploadOutcome {
            succeeded: leads.iter().map(|l| l.email.clone()).collect(),
            failed: Vec::new(),
        })
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct StoreState {
    pub settings: Settings,
    pub snapshots: Vec<(i64, Vec<NormalizedRow>, bool)>,
    pub schedules: Vec<Schedule>,
    /// Ids of stored schedule rows that fail to decode.
    pub corrupt_schedules: Vec<i64>,
    pub fail_claims: bool,
    pub fail_settings: bool,
    pub jobs: Vec<QueuedJob>,
    next_id: i64,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeStore {
    pub state: Mutex<StoreState>,
    fail_snapshots: bool,
    fail_inserts: bool,
}

impl FakeStore {
    pub fn with_settings(settings: Settings) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().settings = settings;
        store
    }

    pub fn failing_snapshots(mut self) -> Self {
        self.fail_snapshots = true;
        self
    }

    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn add_schedule(&self, schedule: NewSchedule) -> Schedule {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        let stored = materialize(id, schedule);
        state.schedules.push(stored.clone());
        stored
    }

    pub fn add_corrupt_schedule(&self) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.corrupt_schedules.push(id);
        id
    }

    pub fn schedules(&self) -> Vec<Schedule> {
        self.state.lock().unwrap().schedules.clone()
    }

    pub fn jobs(&self) -> Vec<QueuedJob> {
        self.state.lock().unwrap().jobs.clone()
    }

    pub fn snapshots(&self) -> Vec<(i64, Vec<NormalizedRow>, bool)> {
        self.state.lock().unwrap().snapshots.clone()
    }

    pub fn push_job(&self, status: JobStatus, template: JobTemplate, updated_at: DateTime<Utc>) -> i64 {
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.jobs.push(QueuedJob {
            id,
            public_id: Uuid::new_v4(),
            status,
            template,
            record_limit: 10,
            skip_times: 1,
            error_message: None,
            created_at: updated_at,
            updated_at,
        });
        id
    }
}

fn materialize(id: i64, schedule: NewSchedule) -> Schedule {
    Schedule {
        id,
        public_id: Uuid::new_v4(),
        recurring_days: schedule.recurring_days,
        slot: schedule.slot,
        time_zone: schedule.time_zone,
        one_time: schedule.one_time,
        paused: false,
        skip_times: schedule.skip_times,
        record_limit: schedule.record_limit,
        job: schedule.job,
        last_fired_at: None,
        created_at: Utc::now(),
    }
}

pub fn new_schedule(day: Weekday, hour: u8, minute: u8, job: JobTemplate) -> NewSchedule {
    NewSchedule {
        recurring_days: vec![day],
        slot: SlotTime { hour, minute },
        time_zone: "Europe/London".to_string(),
        one_time: false,
        skip_times: 1,
        record_limit: 100,
        job,
    }
}

fn store_down() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl SettingsStore for FakeStore {
    async fn load_settings(&self) -> Result<Settings, DbError> {
        let state = self.state.lock().unwrap();
        if state.fail_settings {
            return Err(store_down());
        }
        Ok(state.settings.clone())
    }
}

#[async_trait]
impl SnapshotStore for FakeStore {
    async fn insert_snapshot(&self, rows: &[NormalizedRow]) -> Result<i64, DbError> {
        if self.fail_snapshots {
            return Err(store_down());
        }
        let mut state = self.state.lock().unwrap();
        let id = state.next_id();
        state.snapshots.push((id, rows.to_vec(), false));
        Ok(id)
    }

    async fn oldest_unverified(&self) -> Result<Option<Snapshot>, DbError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .snapshots
            .iter()
            .find(|(_, _, verified)| !verified)
            .map(|(id, rows, _)| Snapshot {
                id: *id,
                rows: rows.clone(),
            }))
    }

    async fn mark_verified(&self, id: i64, rows: &[NormalizedRow]) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let entry = state
            .snapshots
            .iter_mut()
            .find(|(sid, _, verified)| *sid == id && !verified)
            .ok_or(DbError::NotFound)?;
        entry.1 = rows.to_vec();
        entry.2 = true;
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for FakeStore {
    async fn list_schedules(&self) -> Result<ScheduleListing, DbError> {
        let state = self.state.lock().unwrap();
        let undecodable = state
            .corrupt_schedules
            .iter()
            .map(|id| {
                let err = DbError::Decode {
                    context: "schedule job",
                    reason: "not a job template".to_string(),
                };
                (*id, err)
            })
            .collect();
        Ok(ScheduleListing {
            schedules: state.schedules.clone(),
            undecodable,
        })
    }

    async fn insert_schedules(&self, schedules: &[NewSchedule]) -> Result<Vec<Schedule>, DbError> {
        if self.fail_inserts {
            return Err(store_down());
        }
        Ok(schedules
            .iter()
            .map(|s| self.add_schedule(s.clone()))
            .collect())
    }

    async fn claim_schedule(&self, id: i64, slot_start: DateTime<Utc>) -> Result<bool, DbError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_claims {
            return Err(store_down());
        }
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DbError::NotFound)?;
        if schedule.last_fired_at.is_some_and(|at| at >= slot_start) {
            return Ok(false);
        }
        schedule.last_fired_at = Some(slot_start);
        Ok(true)
    }

    async fn increment_skip_times(&self, id: i64) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DbError::NotFound)?;
        schedule.skip_times += 1;
        Ok(())
    }

    async fn set_paused(&self, id: i64, paused: bool) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let schedule = state
            .schedules
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(DbError::NotFound)?;
        schedule.paused = paused;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for FakeStore {
    async fn enqueue_job(
        &self,
        template: &JobTemplate,
        record_limit: i32,
        skip_times: i32,
    ) -> Result<QueuedJob, DbError> {
        let id = self.push_job(JobStatus::Pending, template.clone(), Utc::now());
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or(DbError::NotFound)?;
        job.record_limit = record_limit;
        job.skip_times = skip_times;
        Ok(job.clone())
    }

    async fn claim_next_pending(&self) -> Result<Option<QueuedJob>, DbError> {
        let mut state = self.state.lock().unwrap();
        let Some(job) = state
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Pending)
            .min_by_key(|j| (j.created_at, j.id))
        else {
            return Ok(None);
        };
        job.status = JobStatus::Running;
        job.updated_at = Utc::now();
        Ok(Some(job.clone()))
    }

    async fn complete_job(&self, id: i64) -> Result<(), DbError> {
        self.transition(id, JobStatus::Completed, None)
    }

    async fn fail_job(&self, id: i64, error_message: &str) -> Result<(), DbError> {
        self.transition(id, JobStatus::Failed, Some(error_message))
    }

    async fn delete_job(&self, id: i64) -> Result<(), DbError> {
        self.state.lock().unwrap().jobs.retain(|j| j.id != id);
        Ok(())
    }

    async fn fail_stale_jobs(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        let mut failed = 0;
        for job in state
            .jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::Running && j.updated_at < cutoff)
        {
            job.status = JobStatus::Failed;
            job.error_message = Some("job timed out".to_string());
            failed += 1;
        }
        Ok(failed)
    }

    async fn reap_finished_jobs(&self, cutoff: DateTime<Utc>) -> Result<u64, DbError> {
        let mut state = self.state.lock().unwrap();
        let before = state.jobs.len();
        state.jobs.retain(|j| {
            !(matches!(j.status, JobStatus::Completed | JobStatus::Failed) && j.updated_at < cutoff)
        });
        Ok(u64::try_from(before - state.jobs.len()).unwrap())
    }
}

impl FakeStore {
    fn transition(&self, id: i64, to: JobStatus, message: Option<&str>) -> Result<(), DbError> {
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == id && j.status == JobStatus::Running)
            .ok_or(DbError::InvalidJobTransition {
                id,
                expected_status: "running",
            })?;
        job.status = to;
        job.error_message = message.map(str::to_string);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub verifier: Arc<FakeVerifier>,
    pub notifier: Arc<FakeNotifier>,
    pub leads: Arc<FakeLeadSink>,
    pub store: Arc<FakeStore>,
    pub area_codes: Arc<AreaCodeTable>,
}

impl Harness {
    pub fn new(source: FakeSource) -> Self {
        Self {
            source: Arc::new(source),
            verifier: Arc::new(FakeVerifier::accepting_all()),
            notifier: Arc::new(FakeNotifier::default()),
            leads: Arc::new(FakeLeadSink::default()),
            store: Arc::new(FakeStore::with_settings(full_settings())),
            area_codes: Arc::new(AreaCodeTable::default()),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            source: self.source.clone(),
            verifier: self.verifier.clone(),
            notifier: self.notifier.clone(),
            leads: self.leads.clone(),
            snapshots: self.store.clone(),
            settings: self.store.clone(),
            schedules: self.store.clone(),
            queue: self.store.clone(),
            area_codes: self.area_codes.clone(),
        }
    }
}
