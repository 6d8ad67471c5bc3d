//! Cache store error types.

/// Errors returned by cache store operations.
///
/// `Unavailable` and `Timeout` both mean the backing store could not answer;
/// callers decide whether to fail open or surface the error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend could not be reached or rejected the command.
    #[error("Cache store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
    },

    /// The backend did not answer within the configured timeout.
    #[error("Cache store timed out during {operation}")]
    Timeout {
        /// The operation that timed out.
        operation: &'static str,
    },

    /// A stored value could not be encoded or decoded.
    #[error("Cache value serialization failed: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },
}

impl CacheError {
    /// Creates a new `Unavailable` error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns `true` if the store itself could not be reached in time.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::unavailable(err.to_string())
    }
}

impl From<deadpool_redis::PoolError> for CacheError {
    fn from(err: deadpool_redis::PoolError) -> Self {
        Self::unavailable(format!("connection pool: {err}"))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
