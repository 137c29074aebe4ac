//! Read-only stats handler.

use axum::{Json, extract::State, response::IntoResponse};

use tiprush_sdk::objects::StatsResponse;

use super::AdminApiError;
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

/// `GET /stats` — session snapshot, queue length, limiter status and
/// subscriber count.
pub async fn stats(
    state: State<AppState>,
    _auth: AdminAuth,
) -> Result<impl IntoResponse, AdminApiError> {
    let pipeline_stats = state
        .pipeline
        .stats()
        .await
        .map_err(|_| AdminApiError::PipelineUnavailable)?;
    let subscribers = state.hub.subscriber_count().await;

    Ok(Json(StatsResponse {
        session: pipeline_stats.session,
        queue_length: pipeline_stats.queue_length,
        cooldowns: pipeline_stats.cooldowns,
        rate: pipeline_stats.rate,
        subscribers,
    }))
}
