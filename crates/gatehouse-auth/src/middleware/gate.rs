//! Bearer token gate applied to every route.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::types::AuthorizationContext;
use crate::error::AuthError;
use crate::token::TokenService;

/// Shared state for [`authorization_gate`].
#[derive(Clone)]
pub struct GateState {
    pub tokens: Arc<TokenService>,
    pub public_paths: Arc<[String]>,
}

impl GateState {
    pub fn new(tokens: Arc<TokenService>, public_paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens,
            public_paths: public_paths.into_iter().collect(),
        }
    }
}

/// Returns `true` if `path` equals a public path or lies below one.
#[must_use]
pub fn is_public_path(public_paths: &[String], path: &str) -> bool {
    public_paths.iter().any(|public| {
        let public = public.trim_end_matches('/');
        path == public
            || path
                .strip_prefix(public)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Validates the bearer token on non-public routes.
///
/// On success the [`AuthorizationContext`] is inserted into request
/// extensions. Missing, malformed, and invalid tokens all yield 403.
pub async fn authorization_gate(
    State(state): State<GateState>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if is_public_path(&state.public_paths, path) {
        return next.run(request).await;
    }

    let Some(token) = bearer_token(&request) else {
        tracing::debug!(path = %path, "Missing or malformed Authorization header");
        return AuthError::Unauthenticated.into_response();
    };

    match state.tokens.verify(token) {
        Ok(subject) => {
            let context = AuthorizationContext::from(subject);
            tracing::debug!(
                subject_id = %context.subject_id,
                role = %context.role,
                "Request authenticated"
            );
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> Vec<String> {
        vec!["/ping".to_string(), "/users/login".to_string()]
    }

    #[test]
    fn test_public_path_matching() {
        let paths = paths();
        assert!(is_public_path(&paths, "/ping"));
        assert!(is_public_path(&paths, "/users/login"));
        assert!(is_public_path(&paths, "/users/login/"));
        assert!(is_public_path(&paths, "/users/login/sso"));

        assert!(!is_public_path(&paths, "/users/loginx"));
        assert!(!is_public_path(&paths, "/users/me"));
        assert!(!is_public_path(&paths, "/admin/users/login"));
        assert!(!is_public_path(&paths, "/"));
    }

    #[test]
    fn test_root_public_path_covers_everything() {
        let paths = vec!["/".to_string()];
        assert!(is_public_path(&paths, "/anything"));
    }
}
