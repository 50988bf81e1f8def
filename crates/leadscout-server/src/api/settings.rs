use axum::{extract::State, Extension, Json};
use leadscout_core::{Settings, REDACTED};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

/// Keeps the stored secret wherever the incoming value is the redaction
/// marker, so a client can write back what it read.
fn merge_masked(stored: &Settings, mut incoming: Settings) -> Settings {
    fn keep(field: &mut Option<String>, stored: Option<&String>) {
        if field.as_deref() == Some(REDACTED) {
            *field = stored.cloned();
        }
    }
    keep(&mut incoming.targetron_api_key, stored.targetron_api_key.as_ref());
    keep(&mut incoming.million_api_key, stored.million_api_key.as_ref());
    keep(&mut incoming.slack_bot_token, stored.slack_bot_token.as_ref());
    keep(&mut incoming.instantly_api_key, stored.instantly_api_key.as_ref());
    incoming
}

/// GET /api/v1/settings: secrets are masked.
pub(super) async fn get_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Settings>>, ApiError> {
    let settings = leadscout_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    Ok(Json(ApiResponse::new(req_id.0, settings.redacted())))
}

/// PUT /api/v1/settings: replace the shared settings blob.
pub(super) async fn put_settings(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<Settings>,
) -> Result<Json<ApiResponse<Settings>>, ApiError> {
    let rid = &req_id.0;
    let stored = leadscout_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let merged = merge_masked(&stored, body);

    leadscout_db::save_settings(&state.pool, &merged)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    tracing::info!("settings updated");

    Ok(Json(ApiResponse::new(req_id.0, merged.redacted())))
}
