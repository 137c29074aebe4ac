//! Session control handlers.
//!
//! Each route maps 1:1 onto a state machine operation; the reply carries
//! the resulting snapshot.

use axum::{Json, extract::State, response::IntoResponse};

use tiprush_core::events::ControlAction;
use tiprush_sdk::objects::ControlResponse;

use super::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

async fn run_control(
    state: State<AppState>,
    action: ControlAction,
) -> Result<impl IntoResponse, AdminApiError> {
    let session = state
        .pipeline
        .control(action)
        .await
        .map_err(|_| AdminApiError::PipelineUnavailable)?;
    Ok(Json(ControlResponse { session }))
}

/// `POST /session/start` — reinitialize to defaults and run.
pub async fn start(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    run_control(state, ControlAction::Start).await
}

/// `POST /session/stop` — stop the session. Queued events hold.
pub async fn stop(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    run_control(state, ControlAction::Stop).await
}

/// `POST /session/pause` — pause effect processing.
pub async fn pause(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    run_control(state, ControlAction::Pause).await
}

/// `POST /session/resume` — resume effect processing.
pub async fn resume(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    run_control(state, ControlAction::Resume).await
}

/// `POST /session/reset` — reset the session record, clear every
/// cooldown, and drop all queued events.
pub async fn reset(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    run_control(state, ControlAction::Reset).await
}
