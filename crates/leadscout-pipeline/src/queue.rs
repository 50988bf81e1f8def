//! One-time jobs: enqueue, process the oldest pending job, reap old ones.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use leadscout_core::{JobTemplate, QueuedJob};

use crate::messages;
use crate::orchestrator::{Orchestrator, RunOutcome, RunReport};
use crate::resolve::{queued_job_pagination, resolve_job};
use crate::DispatchError;

/// How one processed job ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed { job_id: i64, rows: usize },
    /// The job found nothing and was removed from the queue.
    NoData { job_id: i64 },
    Failed { job_id: i64, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuePass {
    /// Running jobs older than the stale window that were failed first.
    pub stale_failed: u64,
    /// `None` when no job was pending.
    pub outcome: Option<JobOutcome>,
}

#[derive(Clone)]
pub struct QueueRunner {
    orchestrator: Orchestrator,
    stale_after: Duration,
}

impl QueueRunner {
    #[must_use]
    pub fn new(orchestrator: Orchestrator, stale_after: Duration) -> Self {
        Self {
            orchestrator,
            stale_after,
        }
    }

    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the insert fails.
    pub async fn enqueue(
        &self,
        template: &JobTemplate,
        record_limit: i32,
        skip_times: i32,
    ) -> Result<QueuedJob, DispatchError> {
        if record_limit <= 0 || skip_times <= 0 {
            return Err(DispatchError::InvalidRequest(
                "record_limit and skip_times must be positive".to_string(),
            ));
        }
        let job = self
            .orchestrator
            .services()
            .queue
            .enqueue_job(template, record_limit, skip_times)
            .await?;
        tracing::info!(job_id = job.id, public_id = %job.public_id, "job queued");
        Ok(job)
    }

    /// Fails stale running jobs, then claims and runs the oldest pending job.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] when the queue cannot be read or a
    /// status transition cannot be written. Run failures are reported in the
    /// returned [`JobOutcome`] instead.
    pub async fn process_next_job(&self, now: DateTime<Utc>) -> Result<QueuePass, DispatchError> {
        let services = self.orchestrator.services();
        let stale_failed = services.queue.fail_stale_jobs(now - self.stale_after).await?;
        if stale_failed > 0 {
            tracing::warn!(count = stale_failed, "failed stale running jobs");
        }

        // Loaded before the claim so a store error leaves the job pending.
        let settings = services.settings.load_settings().await?;
        let Some(job) = services.queue.claim_next_pending().await? else {
            return Ok(QueuePass {
                stale_failed,
                outcome: None,
            });
        };
        let notify = job
            .template
            .notify
            .clone()
            .or_else(|| settings.notify_credentials());
        let description = job.template.filters.describe();

        let result = match resolve_job(
            &job.template,
            &settings,
            queued_job_pagination(job.record_limit, job.skip_times),
            None,
        ) {
            Ok(spec) => self.orchestrator.run(&spec).await,
            Err(err) => Err(err),
        };

        let outcome = match result {
            Ok(RunOutcome::Completed(RunReport { tally, .. })) => {
                services.queue.complete_job(job.id).await?;
                JobOutcome::Completed {
                    job_id: job.id,
                    rows: tally.rows,
                }
            }
            Ok(RunOutcome::NoData) => {
                services.queue.delete_job(job.id).await?;
                if let Some(creds) = &notify {
                    if let Err(err) = services
                        .notifier
                        .post_message(creds, &messages::no_data(&description, None))
                        .await
                    {
                        tracing::warn!(error = %err, "notification failed");
                    }
                }
                JobOutcome::NoData { job_id: job.id }
            }
            Err(err) => {
                let error = err.to_string();
                tracing::error!(job_id = job.id, %error, "job failed");
                services.queue.fail_job(job.id, &error).await?;
                if let Some(creds) = &notify {
                    if let Err(notify_err) = services
                        .notifier
                        .post_message(creds, &messages::run_failed(&description, &error))
                        .await
                    {
                        tracing::warn!(error = %notify_err, "notification failed");
                    }
                }
                JobOutcome::Failed {
                    job_id: job.id,
                    error,
                }
            }
        };

        tracing::info!(job_id = job.id, ?outcome, "job processed");
        Ok(QueuePass {
            stale_failed,
            outcome: Some(outcome),
        })
    }

    /// Deletes finished jobs last updated more than `retention` before `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] if the delete fails.
    pub async fn reap_finished(
        &self,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> Result<u64, DispatchError> {
        let reaped = self
            .orchestrator
            .services()
            .queue
            .reap_finished_jobs(now - retention)
            .await?;
        tracing::info!(count = reaped, "reaped finished jobs");
        Ok(reaped)
    }
}

#[cfg(test)]
mod tests {
    use leadscout_core::{JobStatus, Settings, SourceFilters};

    use super::*;
    use crate::test_support::{record, FakeSource, FakeStore, Harness};
    use crate::verify::VerifyPolicy;
    use std::sync::Arc;

    fn runner(harness: &Harness) -> QueueRunner {
        QueueRunner::new(
            Orchestrator::new(harness.services(), VerifyPolicy::default()),
            Duration::minutes(30),
        )
    }

    fn template() -> JobTemplate {
        JobTemplate {
            filters: SourceFilters {
                city: "Leeds".to_string(),
                ..SourceFilters::default()
            },
            ..JobTemplate::default()
        }
    }

    #[tokio::test]
    async fn pending_job_runs_to_completed() {
        let harness = Harness::new(FakeSource::with_pages(vec![
            vec![record(&[("display_name", "A")])],
            vec![record(&[("display_name", "B")])],
        ]));
        let runner = runner(&harness);
        let job = runner.enqueue(&template(), 25, 2).await.unwrap();

        let pass = runner.process_next_job(Utc::now()).await.unwrap();

        assert_eq!(
            pass.outcome,
            Some(JobOutcome::Completed {
                job_id: job.id,
                rows: 2
            })
        );
        assert_eq!(harness.source.skips(), vec![0, 25]);
        assert_eq!(harness.store.jobs()[0].status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn no_data_job_is_deleted_and_announced() {
        let harness = Harness::new(FakeSource::with_pages(vec![vec![]]));
        let runner = runner(&harness);
        runner.enqueue(&template(), 10, 1).await.unwrap();

        let pass = runner.process_next_job(Utc::now()).await.unwrap();

        assert!(matches!(pass.outcome, Some(JobOutcome::NoData { .. })));
        assert!(harness.store.jobs().is_empty());
        assert_eq!(harness.notifier.messages().len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_marks_job_failed() {
        let harness = Harness::new(FakeSource::default().failing_from(0));
        let runner = runner(&harness);
        runner.enqueue(&template(), 10, 1).await.unwrap();

        let pass = runner.process_next_job(Utc::now()).await.unwrap();

        assert!(matches!(pass.outcome, Some(JobOutcome::Failed { .. })));
        let jobs = harness.store.jobs();
        assert_eq!(jobs[0].status, JobStatus::Failed);
        assert!(jobs[0].error_message.as_deref().unwrap().contains("500"));
        assert!(harness.notifier.messages()[0].1.starts_with("❌"));
    }

    #[tokio::test]
    async fn missing_source_key_fails_without_fetching() {
        let harness = Harness {
            store: Arc::new(FakeStore::with_settings(Settings::default())),
            ..Harness::new(FakeSource::default())
        };
        let runner = runner(&harness);
        runner.enqueue(&template(), 10, 1).await.unwrap();

        let pass = runner.process_next_job(Utc::now()).await.unwrap();

        assert!(matches!(pass.outcome, Some(JobOutcome::Failed { .. })));
        assert!(harness.source.queries().is_empty());
        assert!(harness.notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn stale_running_jobs_fail_and_empty_queue_is_none() {
        let harness = Harness::new(FakeSource::default());
        let now = Utc::now();
        harness
            .store
            .push_job(JobStatus::Running, template(), now - Duration::minutes(45));
        harness
            .store
            .push_job(JobStatus::Running, template(), now - Duration::minutes(5));

        let pass = runner(&harness).process_next_job(now).await.unwrap();

        assert_eq!(pass.stale_failed, 1);
        assert_eq!(pass.outcome, None);
        let statuses: Vec<JobStatus> = harness.store.jobs().iter().map(|j| j.status).collect();
        assert_eq!(statuses, vec![JobStatus::Failed, JobStatus::Running]);
    }

    #[tokio::test]
    async fn reap_removes_only_old_finished_jobs() {
        let harness = Harness::new(FakeSource::default());
        let now = Utc::now();
        let old = now - Duration::days(10);
        harness.store.push_job(JobStatus::Completed, template(), old);
        harness.store.push_job(JobStatus::Failed, template(), old);
        harness.store.push_job(JobStatus::Pending, template(), old);
        harness.store.push_job(JobStatus::Completed, template(), now);

        let reaped = runner(&harness)
            .reap_finished(now, Duration::days(7))
            .await
            .unwrap();

        assert_eq!(reaped, 2);
        assert_eq!(harness.store.jobs().len(), 2);
    }

    #[tokio::test]
    async fn enqueue_rejects_non_positive_limits() {
        let harness = Harness::new(FakeSource::default());
        let result = runner(&harness).enqueue(&template(), 0, 1).await;
        assert!(matches!(result, Err(DispatchError::InvalidRequest(_))));
        assert!(harness.store.jobs().is_empty());
    }

    #[tokio::test]
    async fn settings_failure_leaves_job_pending() {
        let harness = Harness::new(FakeSource::default());
        let runner = runner(&harness);
        runner.enqueue(&template(), 10, 1).await.unwrap();
        harness.store.state.lock().unwrap().fail_settings = true;

        let result = runner.process_next_job(Utc::now()).await;

        assert!(matches!(result, Err(DispatchError::Store(_))));
        assert_eq!(harness.store.jobs()[0].status, JobStatus::Pending);
        assert!(harness.source.queries().is_empty());
    }
}
