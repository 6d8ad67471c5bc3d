//! Per-route role allow-lists.

use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::types::AuthorizationContext;
use crate::error::AuthError;

/// Role that passes every allow-list.
pub const SUPERADMIN_ROLE: &str = "superadmin";

/// Immutable set of roles allowed on a route.
#[derive(Debug, Clone)]
pub struct RoleAllowList {
    roles: Arc<HashSet<String>>,
}

impl RoleAllowList {
    pub fn new<I, R>(roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            roles: Arc::new(roles.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns `true` if `role` may access the route.
    #[must_use]
    pub fn permits(&self, role: &str) -> bool {
        role == SUPERADMIN_ROLE || self.roles.contains(role)
    }
}

/// Rejects requests whose role is not in the route's allow-list.
///
/// Must run after [`authorization_gate`](super::authorization_gate); a
/// request without an [`AuthorizationContext`] is rejected.
pub async fn require_roles(
    State(allowed): State<RoleAllowList>,
    request: Request,
    next: Next,
) -> Response {
    let Some(context) = request.extensions().get::<AuthorizationContext>() else {
        return AuthError::Unauthenticated.into_response();
    };

    if allowed.permits(&context.role) {
        next.run(request).await
    } else {
        tracing::debug!(
            subject_id = %context.subject_id,
            role = %context.role,
            path = %request.uri().path(),
            "Role not permitted"
        );
        AuthError::Forbidden.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permits() {
        let list = RoleAllowList::new(["user", "admin"]);
        assert!(list.permits("user"));
        assert!(list.permits("admin"));
        assert!(!list.permits("guest"));
        assert!(!list.permits("User"));
        assert!(!list.permits(""));
    }

    #[test]
    fn test_superadmin_bypasses() {
        assert!(RoleAllowList::new(["admin"]).permits(SUPERADMIN_ROLE));
        assert!(RoleAllowList::new(Vec::<String>::new()).permits(SUPERADMIN_ROLE));
    }

    #[test]
    fn test_empty_list_denies() {
        assert!(!RoleAllowList::new(Vec::<String>::new()).permits("admin"));
    }
}
