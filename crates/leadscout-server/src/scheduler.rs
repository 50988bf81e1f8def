//! Background job scheduler.
//!
//! Registers the dispatch tick, snapshot re-verification and queue cleanup on
//! a [`JobScheduler`] at server startup.

use chrono::Utc;
use leadscout_core::AppConfig;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::api::AppState;

/// Every five minutes.
const REVERIFY_CRON: &str = "0 */5 * * * *";
/// Daily at 03:30 UTC.
const REAP_CRON: &str = "0 30 3 * * *";
const FINISHED_JOB_RETENTION_DAYS: i64 = 7;

/// Builds and starts the background job scheduler.
///
/// Returns the running [`JobScheduler`] handle, which must be kept alive for
/// the lifetime of the process. Dropping it shuts down all jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] if the scheduler cannot be initialised, a
/// cron expression is invalid, or the scheduler fails to start.
pub async fn build_scheduler(
    state: AppState,
    config: &AppConfig,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_dispatch_job(&scheduler, state.clone(), &config.dispatch_cron).await?;
    register_reverify_job(&scheduler, state.clone()).await?;
    register_reap_job(&scheduler, state).await?;

    scheduler.start().await?;
    tracing::info!(cron = %config.dispatch_cron, "scheduler started");
    Ok(scheduler)
}

/// Fires due schedules, then processes one queued job.
async fn register_dispatch_job(
    scheduler: &JobScheduler,
    state: AppState,
    cron: &str,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(cron, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            let now = Utc::now();
            match state.dispatcher.run_tick(now).await {
                Ok(report) if report.due > 0 => tracing::info!(
                    due = report.due,
                    completed = report.completed,
                    no_data = report.no_data,
                    failed = report.failed,
                    skipped_claimed = report.skipped_claimed,
                    "scheduler: dispatch tick finished"
                ),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "scheduler: dispatch tick failed"),
            }
            if let Err(e) = state.queue.process_next_job(now).await {
                tracing::error!(error = %e, "scheduler: queue pass failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_reverify_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(REVERIFY_CRON, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            match leadscout_pipeline::reverify_next_snapshot(&state.services, state.verify_policy)
                .await
            {
                Ok(Some(report)) => tracing::info!(
                    snapshot_id = report.snapshot_id,
                    valid = report.valid,
                    "scheduler: snapshot re-verified"
                ),
                Ok(None) => {}
                Err(leadscout_pipeline::DispatchError::MissingVerifierKey) => {
                    tracing::debug!("scheduler: no verifier key; re-verification skipped");
                }
                Err(e) => tracing::error!(error = %e, "scheduler: re-verification failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

async fn register_reap_job(
    scheduler: &JobScheduler,
    state: AppState,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async(REAP_CRON, move |_uuid, _lock| {
        let state = state.clone();
        Box::pin(async move {
            let retention = chrono::Duration::days(FINISHED_JOB_RETENTION_DAYS);
            if let Err(e) = state.queue.reap_finished(Utc::now(), retention).await {
                tracing::error!(error = %e, "scheduler: reaping finished jobs failed");
            }
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}
