//! Session token issuing and verification.
//!
//! Tokens are HS256 JWTs signed with the shared [`SigningSecret`]. Any
//! verification failure collapses to [`AuthError::Unauthenticated`] so
//! callers cannot tell a forged token from an expired one.
//!
//! [`SigningSecret`]: crate::config::SigningSecret
//! [`AuthError::Unauthenticated`]: crate::error::AuthError::Unauthenticated

pub mod jwt;

pub use jwt::{SessionClaims, TokenService, TokenSubject};
