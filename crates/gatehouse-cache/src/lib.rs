//! # gatehouse-cache
//!
//! Key/value cache with per-key TTL behind one [`CacheStore`] trait.
//!
//! ## Backends
//!
//! - [`MemoryStore`]: bounded in-process store with adaptive replacement
//!   (ARC) eviction. Per instance only.
//! - [`RedisStore`]: shared store over a `deadpool-redis` pool, every call
//!   bounded by a timeout.
//!
//! Both honour the same contract: an entry read after its TTL has elapsed
//! is absent, whether or not it has been physically evicted.
//!
//! ```text
//! caller → Arc<dyn CacheStore> → MemoryStore (ARC directory)
//!                              ↘ RedisStore  (GET / PSETEX / DEL / MULTI INCR PEXPIRE)
//! ```

pub mod arc;
pub mod config;
pub mod error;
pub mod memory;
pub mod remote;
pub mod store;

use std::sync::Arc;

pub use config::{CacheBackendKind, CacheConfig, RedisConfig};
pub use error::{CacheError, CacheResult};
pub use memory::{MemoryStats, MemoryStore};
pub use remote::RedisStore;
pub use store::{CacheStore, CacheStoreExt};

/// Create a cache store based on configuration.
///
/// ## Cache Modes
///
/// - **memory**: in-process ARC store with `capacity` entries
/// - **redis**: pooled Redis client
///
/// An unreachable Redis server at startup is logged but not fatal: the
/// store is still returned and individual operations report
/// [`CacheError::Unavailable`] until the server comes back.
pub async fn create_cache_store(config: &CacheConfig) -> CacheResult<Arc<dyn CacheStore>> {
    match config.backend {
        CacheBackendKind::Memory => {
            tracing::info!(capacity = config.capacity, "Using in-process cache store");
            Ok(Arc::new(MemoryStore::new(config.capacity)))
        }
        CacheBackendKind::Redis => {
            tracing::info!(url = %redacted_url(&config.redis.url), "Connecting to Redis");
            let store = RedisStore::connect(
                &config.redis.url,
                config.redis.pool_size,
                config.redis.timeout(),
            )?;

            match store.ping().await {
                Ok(()) => tracing::info!("Connected to Redis"),
                Err(e) => tracing::warn!(
                    error = %e,
                    "Redis unreachable at startup; cache operations will fail until it recovers"
                ),
            }

            Ok(Arc::new(store))
        }
    }
}

/// Strips credentials from a Redis URL before logging it.
fn redacted_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
