//! Admin API handlers.
//!
//! These endpoints are called by the administrative control surface and
//! require the `Tiprush-Admin-Authorization` header with the static admin
//! secret.
//!
//! # Endpoints
//!
//! - `POST   /session/start`      – reinitialize and run the session
//! - `POST   /session/stop`       – stop the session
//! - `POST   /session/pause`      – pause effect processing
//! - `POST   /session/resume`     – resume effect processing
//! - `POST   /session/reset`      – reset session, cooldowns and queue
//! - `GET    /stats`              – session + queue + limiter snapshot
//! - `DELETE /queue/{event_id}`   – cancel a queued donation event

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};

use crate::state::AppState;

mod cancel_queued;
mod session;
mod stats;

/// Build the Admin API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session/start", post(session::start))
        .route("/session/stop", post(session::stop))
        .route("/session/pause", post(session::pause))
        .route("/session/resume", post(session::resume))
        .route("/session/reset", post(session::reset))
        .route("/stats", get(stats::stats))
        .route(
            "/queue/{event_id}",
            delete(cancel_queued::cancel_queued),
        )
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in Admin API handlers.
#[derive(Debug)]
pub(crate) enum AdminApiError {
    NotFound,
    PipelineUnavailable,
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AdminApiError::NotFound => {
                (StatusCode::NOT_FOUND, "resource not found").into_response()
            }
            AdminApiError::PipelineUnavailable => {
                tracing::error!("Admin API: pipeline unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response()
            }
        }
    }
}
