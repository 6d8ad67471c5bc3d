//! Error response handling for authentication middleware.
//!
//! Access denials never reveal whether the token or the role was at fault:
//! both render as `403 {"message": "Forbidden"}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use crate::error::AuthError;

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = error_details(&self);

        if status.is_server_error() {
            tracing::warn!(error = %self, category = %self.category(), "Auth request failed");
        } else {
            tracing::debug!(error = %self, category = %self.category(), "Auth request rejected");
        }

        (status, Json(message_json(&message))).into_response()
    }
}

/// Maps an error to its HTTP status and client-facing message.
fn error_details(error: &AuthError) -> (StatusCode, String) {
    match error {
        AuthError::Unauthenticated | AuthError::Forbidden => {
            (StatusCode::FORBIDDEN, "Forbidden".to_string())
        }
        AuthError::Locked => (
            StatusCode::TOO_MANY_REQUESTS,
            "Too many failed login attempts, try again later".to_string(),
        ),
        AuthError::InvalidCredentials => (
            StatusCode::UNAUTHORIZED,
            "Wrong email address or password".to_string(),
        ),
        AuthError::EmailTaken => (
            StatusCode::CONFLICT,
            "Email registered already".to_string(),
        ),
        AuthError::InvalidRequest { message } => (StatusCode::BAD_REQUEST, message.clone()),
        AuthError::StoreUnavailable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Service temporarily unavailable".to_string(),
        ),
        AuthError::Internal { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        ),
    }
}

/// Builds the `{"message": ...}` body used by every error response.
#[must_use]
pub fn message_json(message: &str) -> Value {
    json!({ "message": message })
}
