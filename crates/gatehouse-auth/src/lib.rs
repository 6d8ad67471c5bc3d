//! # gatehouse-auth
//!
//! Login throttling, session tokens and role-based authorization.
//!
//! This crate provides:
//! - Per-principal failed-login counting with time-boxed lockout
//! - HS256 session token issuing and verification
//! - Axum middleware gating routes on a bearer token and a role allow-list
//! - A login/registration flow over a pluggable user directory
//!
//! ## Modules
//!
//! - [`config`] - Authentication configuration
//! - [`lockout`] - Failed-login counters backed by a cache store
//! - [`token`] - Session token generation and validation
//! - [`middleware`] - HTTP middleware for authentication/authorization
//! - [`users`] - User directory and password hashing
//! - [`login`] - Credential verification and registration

pub mod config;
pub mod error;
pub mod lockout;
pub mod login;
pub mod middleware;
pub mod token;
pub mod users;

pub use config::{AuthConfig, ConfigError, LockoutConfig, SigningSecret};
pub use error::{AuthError, ErrorCategory};
pub use lockout::{LockoutPolicy, LoginAttemptGuard};
pub use login::LoginService;
pub use middleware::{
    AuthorizationContext, GateState, RoleAllowList, SUPERADMIN_ROLE, authorization_gate,
    require_roles,
};
pub use token::{SessionClaims, TokenService, TokenSubject};
pub use users::{InMemoryUserDirectory, NewUser, UserDirectory, UserRecord};
