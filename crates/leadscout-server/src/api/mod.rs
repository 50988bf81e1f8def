mod dispatch;
mod jobs;
mod schedules;
mod settings;
mod verify;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use leadscout_core::AppConfig;
use leadscout_pipeline::{
    DispatchError, Dispatcher, Orchestrator, QueueRunner, Services, VerifyPolicy,
};
use leadscout_verifier::{EmailVerifierClient, VerifierError};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{request_id, RequestId};

/// Everything the handlers and the background scheduler share.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub services: Services,
    pub dispatcher: Dispatcher,
    pub queue: QueueRunner,
    pub verifier: Arc<EmailVerifierClient>,
    pub verify_policy: VerifyPolicy,
    pub default_zone: Tz,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`VerifierError`] if the single-address verifier client cannot
    /// be built.
    pub fn new(pool: PgPool, services: Services, config: &AppConfig) -> Result<Self, VerifierError> {
        let verify_policy = VerifyPolicy::from_app_config(config);
        let orchestrator = Orchestrator::new(services.clone(), verify_policy);
        let verifier = EmailVerifierClient::new(
            &config.verifier_api_url,
            config.http_timeout_secs,
            &config.user_agent,
        )?;
        Ok(Self {
            pool,
            services,
            dispatcher: Dispatcher::new(orchestrator.clone(), config.default_time_zone),
            queue: QueueRunner::new(
                orchestrator,
                chrono::Duration::minutes(config.stale_job_minutes),
            ),
            verifier: Arc::new(verifier),
            verify_policy,
            default_zone: config.default_time_zone,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &leadscout_db::DbError) -> ApiError {
    if matches!(error, leadscout_db::DbError::NotFound) {
        return ApiError::new(request_id, "not_found", "resource not found");
    }
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_dispatch_error(request_id: String, error: &DispatchError) -> ApiError {
    match error {
        DispatchError::Store(db) => map_db_error(request_id, db),
        DispatchError::Slot(slot) => ApiError::new(request_id, "conflict", slot.to_string()),
        DispatchError::InvalidRequest(reason) => {
            ApiError::new(request_id, "validation_error", reason.clone())
        }
        DispatchError::MissingVerifierKey => {
            ApiError::new(request_id, "validation_error", error.to_string())
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/dispatch/tick", post(dispatch::run_tick))
        .route(
            "/api/v1/schedules",
            get(schedules::list_schedules).post(schedules::create_schedules),
        )
        .route(
            "/api/v1/schedules/{schedule_id}",
            delete(schedules::delete_schedule),
        )
        .route(
            "/api/v1/schedules/{schedule_id}/paused",
            patch(schedules::set_paused),
        )
        .route("/api/v1/jobs", post(jobs::enqueue_job))
        .route("/api/v1/jobs/{job_id}", get(jobs::get_job))
        .route(
            "/api/v1/settings",
            get(settings::get_settings).put(settings::put_settings),
        )
        .route("/api/v1/verify-email", post(verify::verify_email))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .merge(api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match leadscout_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
