//! Donation ingestion endpoint.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use tiprush_core::events::SubmitOutcome;
use tiprush_sdk::objects::{DonationAccepted, DonationRejected, DonationRequest};

use crate::state::AppState;

/// Body returned for a malformed donation payload.
#[derive(Serialize)]
struct ValidationErrorBody {
    accepted: bool,
    error: String,
}

/// `POST /donations` — submit a viewer donation to the admission gate.
///
/// Replies `202` with a receipt when the donation is queued, `429` with
/// the rejection reason and a retry hint when the gate turns it away, and
/// `400` when the payload itself is malformed. The rejection reason is
/// always reported back so a human-facing message can be shown at the
/// donation's origin.
pub async fn submit_donation(
    state: State<AppState>,
    Json(request): Json<DonationRequest>,
) -> Response {
    match state.pipeline.submit_donation(request).await {
        Ok(SubmitOutcome::Accepted { event_id }) => {
            (StatusCode::ACCEPTED, Json(DonationAccepted::new(event_id))).into_response()
        }
        Ok(SubmitOutcome::Rejected(rejection)) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(DonationRejected::new(
                rejection.reason,
                rejection.retry_after.as_millis() as u64,
            )),
        )
            .into_response(),
        Ok(SubmitOutcome::Invalid(e)) => (
            StatusCode::BAD_REQUEST,
            Json(ValidationErrorBody {
                accepted: false,
                error: e.to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "donation submission failed");
            (StatusCode::SERVICE_UNAVAILABLE, "server shutting down").into_response()
        }
    }
}
