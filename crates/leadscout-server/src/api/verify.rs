use axum::{extract::State, Extension, Json};
use leadscout_verifier::{EmailVerdict, VerifierError};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct VerifyEmailRequest {
    pub email: String,
}

fn map_verifier_error(request_id: String, error: &VerifierError) -> ApiError {
    tracing::warn!(error = %error, "single email verification failed");
    match error {
        VerifierError::Unauthorized(_) => ApiError::new(
            request_id,
            "validation_error",
            "the configured verifier API key was rejected",
        ),
        _ => ApiError::new(request_id, "upstream_error", "email verification failed"),
    }
}

/// POST /api/v1/verify-email: verify one address with the stored key.
pub(super) async fn verify_email(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<Json<ApiResponse<EmailVerdict>>, ApiError> {
    let rid = &req_id.0;
    let email = body.email.trim();
    if !email.contains('@') {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "email must contain '@'",
        ));
    }

    let settings = leadscout_db::load_settings(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let Some(api_key) = settings.verifier_api_key() else {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "no verifier API key is configured",
        ));
    };

    let verdict = state
        .verifier
        .verify_email(&api_key, email)
        .await
        .map_err(|e| map_verifier_error(rid.clone(), &e))?;

    Ok(Json(ApiResponse::new(req_id.0, verdict)))
}
