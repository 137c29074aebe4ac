//! Custom Axum extractors for request authentication.
//!
//! Provides `AdminAuth`, which verifies the `Tiprush-Admin-Authorization`
//! header against the configured static admin secret by exact match.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::state::AppState;

/// Header carrying the static admin credential.
pub const ADMIN_AUTH_HEADER: &str = "Tiprush-Admin-Authorization";

/// An Axum extractor that authenticates admin requests.
pub struct AdminAuth;

/// Errors returned by the [`AdminAuth`] extractor.
#[derive(Debug)]
pub enum AdminAuthError {
    MissingHeader,
    InvalidHeader,
    BadCredential,
}

impl IntoResponse for AdminAuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AdminAuthError::MissingHeader => (
                StatusCode::UNAUTHORIZED,
                "missing Tiprush-Admin-Authorization header",
            ),
            AdminAuthError::InvalidHeader => {
                (StatusCode::BAD_REQUEST, "invalid authorization header")
            }
            AdminAuthError::BadCredential => (StatusCode::UNAUTHORIZED, "bad admin credential"),
        };
        (status, message).into_response()
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AdminAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(ADMIN_AUTH_HEADER)
            .ok_or(AdminAuthError::MissingHeader)?
            .to_str()
            .map_err(|_| AdminAuthError::InvalidHeader)?;

        if header != state.admin_secret.as_ref() {
            return Err(AdminAuthError::BadCredential);
        }

        Ok(AdminAuth)
    }
}
