//! Database operations for `recurring_scrapes`.

use chrono::{DateTime, Utc};
use leadscout_core::{parse_weekday, weekday_name, JobTemplate, NewSchedule, Schedule, SlotTime};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const SCHEDULE_COLUMNS: &str = "id, public_id, recurring_days, hour, minute, time_zone, \
     one_time, paused, skip_times, record_limit, job, last_fired_at, created_at";

/// A row from the `recurring_scrapes` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ScheduleRow {
    pub id: i64,
    pub public_id: Uuid,
    pub recurring_days: Vec<String>,
    pub hour: i16,
    pub minute: i16,
    pub time_zone: String,
    pub one_time: bool,
    pub paused: bool,
    pub skip_times: i32,
    pub record_limit: i32,
    /// Serialized [`JobTemplate`].
    pub job: serde_json::Value,
    pub last_fired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ScheduleRow> for Schedule {
    type Error = DbError;

    fn try_from(row: ScheduleRow) -> Result<Self, Self::Error> {
        let recurring_days = row
            .recurring_days
            .iter()
            .map(|name| parse_weekday(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::Decode {
                context: "schedule weekday",
                reason: e.to_string(),
            })?;
        let slot = SlotTime::new(i64::from(row.hour), i64::from(row.minute)).map_err(|e| {
            DbError::Decode {
                context: "schedule slot",
                reason: e.to_string(),
            }
        })?;
        let job: JobTemplate = serde_json::from_value(row.job).map_err(|source| DbError::Json {
            context: "schedule job",
            source,
        })?;

        Ok(Schedule {
            id: row.id,
            public_id: row.public_id,
            recurring_days,
            slot,
            time_zone: row.time_zone,
            one_time: row.one_time,
            paused: row.paused,
            skip_times: row.skip_times,
            record_limit: row.record_limit,
            job,
            last_fired_at: row.last_fired_at,
            created_at: row.created_at,
        })
    }
}

/// Schedules read in one pass. Rows that could not be decoded are left out of
/// `schedules` and reported by id in `undecodable`.
#[derive(Debug, Default)]
pub struct ScheduleListing {
    pub schedules: Vec<Schedule>,
    pub undecodable: Vec<(i64, DbError)>,
}

/// Decodes each row on its own, so one corrupt row does not hide the rest.
#[must_use]
pub fn decode_schedule_rows(rows: Vec<ScheduleRow>) -> ScheduleListing {
    let mut listing = ScheduleListing::default();
    for row in rows {
        let id = row.id;
        match Schedule::try_from(row) {
            Ok(schedule) => listing.schedules.push(schedule),
            Err(err) => listing.undecodable.push((id, err)),
        }
    }
    listing
}

/// Returns every schedule, paused or not, ordered by slot then `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails. Rows holding an unknown
/// weekday, an out-of-range slot or an invalid job are listed in
/// [`ScheduleListing::undecodable`] instead.
pub async fn list_schedules(pool: &PgPool) -> Result<ScheduleListing, DbError> {
    let rows = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM recurring_scrapes ORDER BY hour, minute, id"
    ))
    .fetch_all(pool)
    .await?;

    Ok(decode_schedule_rows(rows))
}

/// Fetches a single schedule by its `public_id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_schedule(pool: &PgPool, public_id: Uuid) -> Result<Schedule, DbError> {
    let row = sqlx::query_as::<_, ScheduleRow>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM recurring_scrapes WHERE public_id = $1"
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Schedule::try_from(row)
}

/// Inserts all schedules in one transaction. Either every row is written or
/// none is.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails (the transaction is rolled
/// back), or [`DbError::Json`] if a job template cannot be serialized.
pub async fn insert_schedules(
    pool: &PgPool,
    schedules: &[NewSchedule],
) -> Result<Vec<Schedule>, DbError> {
    let mut tx = pool.begin().await?;
    let mut inserted = Vec::with_capacity(schedules.len());

    for schedule in schedules {
        let days: Vec<String> = schedule
            .recurring_days
            .iter()
            .map(|d| weekday_name(*d).to_string())
            .collect();
        let job = serde_json::to_value(&schedule.job).map_err(|source| DbError::Json {
            context: "schedule job",
            source,
        })?;

        let row = sqlx::query_as::<_, ScheduleRow>(&format!(
            "INSERT INTO recurring_scrapes \
                 (public_id, recurring_days, hour, minute, time_zone, one_time, \
                  skip_times, record_limit, job) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {SCHEDULE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&days)
        .bind(i16::from(schedule.slot.hour))
        .bind(i16::from(schedule.slot.minute))
        .bind(&schedule.time_zone)
        .bind(schedule.one_time)
        .bind(schedule.skip_times)
        .bind(schedule.record_limit)
        .bind(job)
        .fetch_one(&mut *tx)
        .await?;

        inserted.push(Schedule::try_from(row)?);
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Claims a schedule for the minute starting at `slot_start`.
///
/// Returns `false` when the schedule was already claimed for this minute (or a
/// later one), so concurrent ticks fire each schedule at most once per slot.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn claim_schedule(
    pool: &PgPool,
    id: i64,
    slot_start: DateTime<Utc>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE recurring_scrapes \
         SET last_fired_at = $2 \
         WHERE id = $1 AND (last_fired_at IS NULL OR last_fired_at < $2)",
    )
    .bind(id)
    .bind(slot_start)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Advances the pagination multiplier by one.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the schedule no longer exists, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn increment_skip_times(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result =
        sqlx::query("UPDATE recurring_scrapes SET skip_times = skip_times + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Pauses or resumes a schedule.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn set_paused(pool: &PgPool, id: i64, paused: bool) -> Result<(), DbError> {
    let result = sqlx::query("UPDATE recurring_scrapes SET paused = $2 WHERE id = $1")
        .bind(id)
        .bind(paused)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the delete fails.
pub async fn delete_schedule(pool: &PgPool, public_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM recurring_scrapes WHERE public_id = $1")
        .bind(public_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
