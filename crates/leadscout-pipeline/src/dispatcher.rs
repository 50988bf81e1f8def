//! Per-minute evaluation of stored schedules.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::Instrument;

use leadscout_core::{NotifyCredentials, Schedule, Settings};

use crate::messages;
use crate::orchestrator::{Orchestrator, RunOutcome};
use crate::resolve::{resolve_job, schedule_pagination};
use crate::DispatchError;

/// `true` when `now`, seen in the schedule's zone, falls on one of its
/// weekdays at exactly its hour and minute. A schedule with an unknown zone
/// is never due.
#[must_use]
pub fn is_due(schedule: &Schedule, now: DateTime<Utc>, default_zone: Tz) -> bool {
    let zone = match schedule.zone(default_zone) {
        Ok(zone) => zone,
        Err(id) => {
            tracing::warn!(schedule_id = schedule.id, time_zone = %id, "unknown time zone, skipping");
            return false;
        }
    };
    let local = now.with_timezone(&zone);
    schedule.runs_on(local.weekday())
        && u32::from(schedule.slot.hour) == local.hour()
        && u32::from(schedule.slot.minute) == local.minute()
}

/// Start of the UTC minute containing `now`.
#[must_use]
pub fn minute_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

/// The schedule's own credentials, else the shared ones.
fn notify_for(schedule: &Schedule, settings: &Settings) -> Option<NotifyCredentials> {
    schedule
        .job
        .notify
        .clone()
        .or_else(|| settings.notify_credentials())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Non-paused schedules checked.
    pub evaluated: usize,
    pub due: usize,
    pub completed: usize,
    pub no_data: usize,
    pub failed: usize,
    /// Due schedules another tick already claimed for this minute.
    pub skipped_claimed: usize,
    /// Stored rows skipped because they could not be decoded.
    pub undecodable: usize,
}

enum Fired {
    Completed,
    NoData,
    Failed,
}

#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Orchestrator,
    default_zone: Tz,
}

impl Dispatcher {
    #[must_use]
    pub fn new(orchestrator: Orchestrator, default_zone: Tz) -> Self {
        Self {
            orchestrator,
            default_zone,
        }
    }

    /// Fires every schedule due at `now`, one after another.
    ///
    /// A schedule is claimed for the current minute before it runs, so a
    /// second tick in the same minute skips it. Failures of one schedule are
    /// reported and do not stop the others.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Store`] only if settings or the schedule list
    /// cannot be loaded. A stored row that does not decode is logged, counted
    /// and skipped.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<TickReport, DispatchError> {
        let services = self.orchestrator.services();
        let settings = services.settings.load_settings().await?;
        let listing = services.schedules.list_schedules().await?;
        let slot_start = minute_start(now);
        let mut report = TickReport {
            undecodable: listing.undecodable.len(),
            ..TickReport::default()
        };
        for (id, err) in &listing.undecodable {
            tracing::error!(schedule_id = id, error = %err, "stored schedule is unreadable, skipping");
        }

        for schedule in listing.schedules.iter().filter(|s| !s.paused) {
            report.evaluated += 1;
            if !is_due(schedule, now, self.default_zone) {
                continue;
            }
            report.due += 1;

            match services.schedules.claim_schedule(schedule.id, slot_start).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(schedule_id = schedule.id, "already claimed for this minute");
                    report.skipped_claimed += 1;
                    continue;
                }
                Err(err) => {
                    tracing::error!(schedule_id = schedule.id, error = %err, "claim failed");
                    let text = messages::run_failed(&schedule.job.filters.describe(), &err.to_string());
                    self.announce(notify_for(schedule, &settings).as_ref(), &text)
                        .await;
                    report.failed += 1;
                    continue;
                }
            }

            let span = tracing::info_span!("schedule", id = schedule.id, skip_times = schedule.skip_times);
            match self.fire(schedule, &settings, now).instrument(span).await {
                Fired::Completed => report.completed += 1,
                Fired::NoData => report.no_data += 1,
                Fired::Failed => report.failed += 1,
            }
        }

        tracing::info!(
            evaluated = report.evaluated,
            due = report.due,
            completed = report.completed,
            no_data = report.no_data,
            failed = report.failed,
            undecodable = report.undecodable,
            "tick complete"
        );
        Ok(report)
    }

    async fn fire(&self, schedule: &Schedule, settings: &Settings, now: DateTime<Utc>) -> Fired {
        let services = self.orchestrator.services();
        let notify = notify_for(schedule, settings);
        let zone = schedule.zone(self.default_zone).unwrap_or(self.default_zone);
        let today = now.with_timezone(&zone).date_naive();
        let description = schedule.job.filters.describe();

        let result = match resolve_job(
            &schedule.job,
            settings,
            schedule_pagination(schedule.record_limit, schedule.skip_times),
            Some(today),
        ) {
            Ok(spec) => self.orchestrator.run(&spec).await,
            Err(err) => Err(err),
        };

        let fired = match result {
            Ok(RunOutcome::Completed(_)) => {
                if !schedule.one_time {
                    if let Err(err) = services.schedules.increment_skip_times(schedule.id).await {
                        tracing::error!(error = %err, "could not advance skip_times");
                    }
                }
                Fired::Completed
            }
            Ok(RunOutcome::NoData) => {
                self.announce(notify.as_ref(), &messages::no_data(&description, Some(schedule.slot)))
                    .await;
                Fired::NoData
            }
            Err(err) => {
                tracing::error!(error = %err, "schedule run failed");
                self.announce(notify.as_ref(), &messages::run_failed(&description, &err.to_string()))
                    .await;
                Fired::Failed
            }
        };

        if schedule.one_time {
            if let Err(err) = services.schedules.set_paused(schedule.id, true).await {
                tracing::error!(error = %err, "could not pause one-time schedule");
            }
        }
        fired
    }

    async fn announce(&self, creds: Option<&NotifyCredentials>, text: &str) {
        let Some(creds) = creds else {
            tracing::info!(%text, "no notify credentials; message not sent");
            return;
        };
        if let Err(err) = self.orchestrator.services().notifier.post_message(creds, text).await {
            tracing::warn!(error = %err, "notification failed");
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
