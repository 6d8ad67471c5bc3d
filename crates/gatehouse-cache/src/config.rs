//! Cache backend selection.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::memory::DEFAULT_CAPACITY;

/// Which cache store implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Single-instance: in-process ARC store
    #[default]
    Memory,
    /// Multi-instance: shared Redis server
    Redis,
}

/// Cache configuration
///
/// ```toml
/// [cache]
/// backend = "redis"
/// capacity = 10000
///
/// [cache.redis]
/// url = "redis://localhost:6379"
/// pool_size = 10
/// timeout_ms = 500
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Maximum resident entries for the memory backend
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub redis: RedisConfig,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            capacity: default_capacity(),
            redis: RedisConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("cache.capacity must be > 0".into());
        }
        if self.backend == CacheBackendKind::Redis {
            if self.redis.url.is_empty() {
                return Err("cache.redis.url must be set when cache.backend = \"redis\"".into());
            }
            if self.redis.pool_size == 0 {
                return Err("cache.redis.pool_size must be > 0".into());
            }
            if self.redis.timeout_ms == 0 {
                return Err("cache.redis.timeout_ms must be > 0".into());
            }
        }
        Ok(())
    }
}

/// Redis connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://:password@localhost:6379/0")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Per-operation timeout in milliseconds (pool checkout + command)
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    500
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_select_memory() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.backend, CacheBackendKind::Memory);
        assert_eq!(cfg.capacity, DEFAULT_CAPACITY);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_backend_kind_deserializes_lowercase() {
        let cfg: CacheConfig = serde_json::from_str(r#"{"backend":"redis"}"#).unwrap();
        assert_eq!(cfg.backend, CacheBackendKind::Redis);
        assert_eq!(cfg.redis.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cfg = CacheConfig {
            capacity: 0,
            ..CacheConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = CacheConfig {
            backend: CacheBackendKind::Redis,
            redis: RedisConfig {
                timeout_ms: 0,
                ..RedisConfig::default()
            },
            ..CacheConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
