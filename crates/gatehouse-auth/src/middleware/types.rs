//! Authorization context passed from the gate to handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;

use crate::error::AuthError;
use crate::token::TokenSubject;

/// Identity of the caller of a protected route.
///
/// Inserted into request extensions by
/// [`authorization_gate`](super::authorization_gate) and extractable in
/// handlers. Extraction fails with `Unauthenticated` on routes the gate
/// did not run for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationContext {
    pub subject_id: String,
    pub role: String,
}

impl AuthorizationContext {
    #[must_use]
    pub fn new(subject_id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            subject_id: subject_id.into(),
            role: role.into(),
        }
    }
}

impl From<TokenSubject> for AuthorizationContext {
    fn from(subject: TokenSubject) -> Self {
        Self {
            subject_id: subject.subject_id,
            role: subject.role,
        }
    }
}

impl<S> FromRequestParts<S> for AuthorizationContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthorizationContext>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}
