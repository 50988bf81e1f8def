//! Creating schedules from a user request.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use leadscout_core::{Fingerprint, JobTemplate, NewSchedule, Schedule, SlotTime};

use crate::ports::ScheduleStore;
use crate::slots::find_free_slot;
use crate::DispatchError;

/// Records fetched by one sub-schedule.
pub const BATCH_SIZE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleTiming {
    /// One-time run in the next minute.
    Immediate,
    Recurring { days: Vec<Weekday>, slot: SlotTime },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub job: JobTemplate,
    pub total_records: u32,
    /// IANA zone; empty means the configured default.
    pub time_zone: String,
    pub timing: ScheduleTiming,
}

/// `ceil(total / BATCH_SIZE)`.
#[must_use]
pub fn batch_count(total_records: u32) -> u32 {
    total_records.div_ceil(BATCH_SIZE)
}

fn request_zone(time_zone: &str, default_zone: Tz) -> Result<Tz, DispatchError> {
    let id = time_zone.trim();
    if id.is_empty() {
        return Ok(default_zone);
    }
    id.parse::<Tz>()
        .map_err(|_| DispatchError::InvalidRequest(format!("unknown time zone `{id}`")))
}

fn sub_schedules(request: &ScheduleRequest, day: Weekday, slot: SlotTime, one_time: bool) -> Vec<NewSchedule> {
    (1..=batch_count(request.total_records))
        .map(|n| NewSchedule {
            recurring_days: vec![day],
            slot,
            time_zone: request.time_zone.trim().to_string(),
            one_time,
            skip_times: i32::try_from(n).unwrap_or(i32::MAX),
            record_limit: i32::try_from(BATCH_SIZE).unwrap_or(i32::MAX),
            job: request.job.clone(),
        })
        .collect()
}

/// Plans and stores the schedules for `request`.
///
/// A request for `total_records` is split into `ceil(total / 100)`
/// sub-schedules with `skip_times` 1..=n, all sharing one slot per weekday.
/// Immediate requests fire once, one minute after `now` in the request zone.
/// Recurring requests get a conflict-free slot per weekday; every slot is
/// allocated before anything is written, so a conflict leaves the store
/// untouched.
///
/// # Errors
///
/// - [`DispatchError::InvalidRequest`] for zero records, no weekdays or an
///   unknown zone.
/// - [`DispatchError::Slot`] when a weekday has no free slot.
/// - [`DispatchError::Store`] when listing or inserting fails.
pub async fn create_schedules(
    store: &dyn ScheduleStore,
    request: &ScheduleRequest,
    now: DateTime<Utc>,
    default_zone: Tz,
) -> Result<Vec<Schedule>, DispatchError> {
    if request.total_records == 0 {
        return Err(DispatchError::InvalidRequest(
            "total_records must be positive".to_string(),
        ));
    }
    let zone = request_zone(&request.time_zone, default_zone)?;

    let planned = match &request.timing {
        ScheduleTiming::Immediate => {
            let at = (now + Duration::minutes(1)).with_timezone(&zone);
            let slot = SlotTime::new(i64::from(at.hour()), i64::from(at.minute()))
                .map_err(|e| DispatchError::InvalidRequest(e.to_string()))?;
            sub_schedules(request, at.weekday(), slot, true)
        }
        ScheduleTiming::Recurring { days, slot } => {
            if days.is_empty() {
                return Err(DispatchError::InvalidRequest(
                    "at least one weekday is required".to_string(),
                ));
            }
            let existing = store.list_schedules().await?.schedules;
            let fingerprint = Fingerprint::of(&request.job);
            let mut unique_days: Vec<Weekday> = Vec::with_capacity(days.len());
            for day in days {
                if !unique_days.contains(day) {
                    unique_days.push(*day);
                }
            }

            let mut planned = Vec::new();
            for day in unique_days {
                let free = find_free_slot(&existing, day, *slot, &fingerprint)?;
                if free != *slot {
                    tracing::info!(day = %day, requested = %slot, assigned = %free, "slot taken, moved");
                }
                planned.extend(sub_schedules(request, day, free, false));
            }
            planned
        }
    };

    let stored = store.insert_schedules(&planned).await?;
    tracing::info!(count = stored.len(), "schedules created");
    Ok(stored)
}
