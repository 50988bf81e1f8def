//! Schedule handlers: list, create, pause/resume, delete.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use leadscout_core::{parse_weekday, weekday_name, JobTemplate, Schedule, SlotTime, REDACTED};
use leadscout_pipeline::{ScheduleRequest, ScheduleTiming};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, map_dispatch_error, ApiError, ApiResponse, AppState};

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(super) struct CreateScheduleRequest {
    pub job: JobTemplate,
    pub total_records: u32,
    #[serde(default)]
    pub time_zone: String,
    /// Fire once in the next minute instead of recurring.
    #[serde(default)]
    pub run_now: bool,
    #[serde(default)]
    pub days: Vec<String>,
    pub hour: Option<i64>,
    pub minute: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SetPausedRequest {
    pub paused: bool,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ScheduleItem {
    schedule_id: Uuid,
    recurring_days: Vec<&'static str>,
    time: String,
    time_zone: String,
    one_time: bool,
    paused: bool,
    skip_times: i32,
    record_limit: i32,
    job: JobTemplate,
    last_fired_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<Schedule> for ScheduleItem {
    fn from(schedule: Schedule) -> Self {
        Self {
            schedule_id: schedule.public_id,
            recurring_days: schedule
                .recurring_days
                .iter()
                .map(|day| weekday_name(*day))
                .collect(),
            time: schedule.slot.to_string(),
            time_zone: schedule.time_zone,
            one_time: schedule.one_time,
            paused: schedule.paused,
            skip_times: schedule.skip_times,
            record_limit: schedule.record_limit,
            job: redact_job(schedule.job),
            last_fired_at: schedule.last_fired_at,
            created_at: schedule.created_at,
        }
    }
}

/// Masks per-job secrets before a template leaves the server.
pub(super) fn redact_job(mut job: JobTemplate) -> JobTemplate {
    if let Some(notify) = job.notify.as_mut() {
        notify.bot_token = REDACTED.to_string();
    }
    if let Some(upload) = job.upload.as_mut() {
        upload.api_key = REDACTED.to_string();
    }
    job
}

fn validation(req_id: &str, message: impl Into<String>) -> ApiError {
    ApiError::new(req_id, "validation_error", message)
}

fn to_schedule_request(
    req_id: &str,
    body: CreateScheduleRequest,
) -> Result<ScheduleRequest, ApiError> {
    let timing = if body.run_now {
        ScheduleTiming::Immediate
    } else {
        let days = body
            .days
            .iter()
            .map(|name| parse_weekday(name))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| validation(req_id, e.to_string()))?;
        let (Some(hour), Some(minute)) = (body.hour, body.minute) else {
            return Err(validation(
                req_id,
                "hour and minute are required for recurring schedules",
            ));
        };
        let slot = SlotTime::new(hour, minute).map_err(|e| validation(req_id, e.to_string()))?;
        ScheduleTiming::Recurring { days, slot }
    };

    Ok(ScheduleRequest {
        job: body.job,
        total_records: body.total_records,
        time_zone: body.time_zone,
        timing,
    })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/schedules
pub(super) async fn list_schedules(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ScheduleItem>>>, ApiError> {
    let listing = leadscout_db::list_schedules(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    for (id, err) in &listing.undecodable {
        tracing::warn!(schedule_id = id, error = %err, "stored schedule is unreadable, omitted");
    }
    let data = listing.schedules.into_iter().map(ScheduleItem::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// POST /api/v1/schedules: split a request into sub-schedules and store them.
///
/// A weekday with no free slot answers 409 and stores nothing.
pub(super) async fn create_schedules(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateScheduleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<ScheduleItem>>>), ApiError> {
    let request = to_schedule_request(&req_id.0, body)?;

    let created = leadscout_pipeline::create_schedules(
        state.services.schedules.as_ref(),
        &request,
        Utc::now(),
        state.default_zone,
    )
    .await
    .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;

    let data = created.into_iter().map(ScheduleItem::from).collect();
    Ok((StatusCode::CREATED, Json(ApiResponse::new(req_id.0, data))))
}

/// PATCH /api/v1/schedules/:schedule_id/paused
pub(super) async fn set_paused(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(schedule_id): Path<Uuid>,
    Json(body): Json<SetPausedRequest>,
) -> Result<Json<ApiResponse<ScheduleItem>>, ApiError> {
    let rid = &req_id.0;
    let mut schedule = leadscout_db::get_schedule(&state.pool, schedule_id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;

    leadscout_db::set_paused(&state.pool, schedule.id, body.paused)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    schedule.paused = body.paused;

    Ok(Json(ApiResponse::new(req_id.0, ScheduleItem::from(schedule))))
}

/// DELETE /api/v1/schedules/:schedule_id
pub(super) async fn delete_schedule(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(schedule_id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    leadscout_db::delete_schedule(&state.pool, schedule_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        serde_json::json!({ "deleted": true }),
    )))
}
