//! Administrative cancellation of a queued donation event.

use axum::{extract::Path, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use super::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `DELETE /queue/{event_id}` — remove an admitted event before it is
/// processed. 204 when removed, 404 when the id is not queued (already
/// processed, canceled, or never admitted).
pub async fn cancel_queued(
    state: State<AppState>,
    _auth: AdminAuth,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AdminApiError> {
    let removed = state
        .pipeline
        .cancel_queued(event_id)
        .await
        .map_err(|_| AdminApiError::PipelineUnavailable)?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AdminApiError::NotFound)
    }
}
