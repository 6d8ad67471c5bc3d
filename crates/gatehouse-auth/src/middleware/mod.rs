//! HTTP middleware for authentication and authorization.
//!
//! This module provides Axum middleware for:
//!
//! - Bearer token validation on every non-public route
//! - Per-route role allow-lists
//! - Authorization context injection
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use gatehouse_auth::middleware::{
//!     AuthorizationContext, GateState, RoleAllowList, authorization_gate, require_roles,
//! };
//!
//! async fn me(ctx: AuthorizationContext) -> String {
//!     format!("Hello, {}!", ctx.subject_id)
//! }
//!
//! let app = Router::new()
//!     .route("/users/me", get(me))
//!     .route_layer(middleware::from_fn_with_state(
//!         RoleAllowList::new(["user", "admin"]),
//!         require_roles,
//!     ))
//!     .layer(middleware::from_fn_with_state(gate_state, authorization_gate));
//! ```

pub mod error;
pub mod gate;
pub mod roles;
pub mod types;

pub use error::message_json;
pub use gate::{GateState, authorization_gate, is_public_path};
pub use roles::{RoleAllowList, SUPERADMIN_ROLE, require_roles};
pub use types::AuthorizationContext;
