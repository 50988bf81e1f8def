use axum::{extract::State, Extension, Json};
use chrono::Utc;
use leadscout_pipeline::{QueuePass, TickReport};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_dispatch_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct DispatchTickResponse {
    tick: TickReport,
    queue: QueuePass,
}

/// POST /api/v1/dispatch/tick: fire due schedules and process one queued job.
///
/// Lets an external cron drive dispatch when the in-process scheduler is not
/// wanted.
pub(super) async fn run_tick(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<DispatchTickResponse>>, ApiError> {
    let now = Utc::now();
    let tick = state
        .dispatcher
        .run_tick(now)
        .await
        .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;
    let queue = state
        .queue
        .process_next_job(now)
        .await
        .map_err(|e| map_dispatch_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        DispatchTickResponse { tick, queue },
    )))
}
