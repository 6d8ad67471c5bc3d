//! Authentication and authorization error types.
//!
//! Every failure in the login and request-authorization paths is one of
//! these variants; none of them is fatal to the process.

use std::fmt;

use gatehouse_cache::CacheError;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The cache store backing the lockout counters is unreachable or timed out.
    #[error("Store unavailable: {message}")]
    StoreUnavailable {
        /// Description of the store failure.
        message: String,
    },

    /// The principal has too many recent failed login attempts.
    #[error("Too many failed login attempts")]
    Locked,

    /// The session token is missing, malformed, forged, or expired.
    ///
    /// Deliberately carries no detail about which check failed.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// The token is valid but its role is not allowed on this route.
    #[error("Forbidden")]
    Forbidden,

    /// Unknown email address or wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Registration attempted with an email that already exists.
    #[error("Email already registered")]
    EmailTaken,

    /// The request body is malformed or incomplete.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// An unexpected internal error occurred (hashing, token encoding).
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `StoreUnavailable` error.
    #[must_use]
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if the caller should be denied access to a protected route.
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Forbidden)
    }

    /// Returns `true` if this is a server-side error.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Internal { .. })
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Locked | Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::Unauthenticated => ErrorCategory::Token,
            Self::Forbidden => ErrorCategory::Authorization,
            Self::EmailTaken | Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::StoreUnavailable { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

impl From<CacheError> for AuthError {
    fn from(err: CacheError) -> Self {
        Self::store_unavailable(err.to_string())
    }
}

/// Categories of authentication/authorization errors for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Credential checks and lockouts.
    Authentication,
    /// Role checks.
    Authorization,
    /// Session token validation.
    Token,
    /// Request validation errors.
    Validation,
    /// Cache store failures.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Authorization => write!(f, "authorization"),
            Self::Token => write!(f, "token"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
