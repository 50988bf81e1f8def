use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use leadscout_core::{JobStatus, JobTemplate, QueuedJob};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{
    map_db_error, map_dispatch_error, schedules::redact_job, ApiError, ApiResponse, AppState,
};

fn default_skip_times() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub(super) struct EnqueueJobRequest {
    pub job: JobTemplate,
    pub record_limit: i32,
    /// Number of pages to fetch, starting from the first.
    #[serde(default = "default_skip_times")]
    pub skip_times: i32,
}

#[derive(Debug, Serialize)]
pub(super) struct JobItem {
    job_id: Uuid,
    status: JobStatus,
    record_limit: i32,
    skip_times: i32,
    error_message: Option<String>,
    job: JobTemplate,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<QueuedJob> for JobItem {
    fn from(job: QueuedJob) -> Self {
        Self {
            job_id: job.public_id,
            status: job.status,
            record_limit: job.record_limit,
            skip_times: job.skip_times,
            error_message: job.error_message,
            job: redact_job(job.template),
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

/// POST /api/v1/jobs: queue a one-time scrape.
pub(super) async fn enqueue_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<EnqueueJobRequest>,
) -> Result<(StatusCode, Json<ApiResponse<JobItem>>), ApiError> {
    let job = state
        .queue
        .enqueue(&body.job, body.record_limit, body.skip_times)
        .await
        .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(req_id.0, JobItem::from(job))),
    ))
}

/// GET /api/v1/jobs/:job_id
pub(super) async fn get_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobItem>>, ApiError> {
    let job = leadscout_db::get_job(&state.pool, job_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(req_id.0, JobItem::from(job))))
}
