//! Scrape pipeline orchestration, schedule dispatch and the one-time job
//! queue, written against the ports in [`ports`].

pub mod adapters;
pub mod dispatcher;
pub mod fetch;
pub mod messages;
pub mod orchestrator;
pub mod ports;
pub mod queue;
pub mod resolve;
pub mod reverify;
pub mod schedules;
pub mod services;
pub mod slots;
pub mod verify;

#[cfg(test)]
mod test_support;

use leadscout_db::DbError;
use leadscout_scraper::ScraperError;
use thiserror::Error;

pub use adapters::PgStore;
pub use dispatcher::{is_due, Dispatcher, TickReport};
pub use fetch::fetch_pages;
pub use orchestrator::{
    leads_from_rows, Orchestrator, RunOutcome, RunReport, RunTally, Stage, StageWarning,
};
pub use queue::{JobOutcome, QueuePass, QueueRunner};
pub use resolve::{queued_job_pagination, resolve_job, schedule_pagination};
pub use reverify::{reverify_next_snapshot, ReverifyReport};
pub use schedules::{create_schedules, ScheduleRequest, ScheduleTiming, BATCH_SIZE};
pub use services::{Services, SetupError};
pub use slots::{find_free_slot, SlotError};
pub use verify::{verify_emails, VerificationReport, VerifyPolicy};

/// Errors that end a single pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetching records failed: {0}")]
    Fetch(#[from] ScraperError),
    #[error("no source API key is configured")]
    MissingSourceKey,
}

/// Errors from dispatch-level operations: ticks, schedule creation, the job
/// queue and re-verification.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Store(#[from] DbError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("no verifier API key is configured")]
    MissingVerifierKey,
}
