//! Redis-backed cache store.
//!
//! Each operation checks out a pooled connection and issues a single
//! command (or one MULTI/EXEC transaction for increments). The whole
//! operation, including the pool checkout, is bounded by the configured
//! timeout so a slow Redis cannot stall callers.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use deadpool_redis::{Connection, Pool};
use redis::AsyncCommands;

use crate::error::{CacheError, CacheResult};
use crate::store::{CacheStore, effective_ttl};

/// Cache store that delegates to a Redis server.
#[derive(Clone)]
pub struct RedisStore {
    pool: Pool,
    op_timeout: Duration,
}

impl RedisStore {
    /// Wraps an existing connection pool.
    pub fn new(pool: Pool, op_timeout: Duration) -> Self {
        Self { pool, op_timeout }
    }

    /// Builds a pool for `url` with the given size and timeout.
    pub fn connect(url: &str, pool_size: usize, op_timeout: Duration) -> CacheResult<Self> {
        let mut redis_config = deadpool_redis::Config::from_url(url);
        let mut pool_config = deadpool_redis::PoolConfig::new(pool_size);
        pool_config.timeouts.wait = Some(op_timeout);
        pool_config.timeouts.create = Some(op_timeout);
        pool_config.timeouts.recycle = Some(op_timeout);
        redis_config.pool = Some(pool_config);

        let pool = redis_config
            .create_pool(Some(deadpool_redis::Runtime::Tokio1))
            .map_err(|e| CacheError::unavailable(format!("failed to create pool: {e}")))?;

        Ok(Self::new(pool, op_timeout))
    }

    /// Sends `PING`; used at startup and by health checks.
    pub async fn ping(&self) -> CacheResult<()> {
        self.run("ping", |mut conn| async move {
            let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn run<T, F, Fut>(&self, operation: &'static str, f: F) -> CacheResult<T>
    where
        T: Send,
        F: FnOnce(Connection) -> Fut + Send,
        Fut: Future<Output = redis::RedisResult<T>> + Send,
    {
        let call = async {
            let conn = self.pool.get().await?;
            f(conn).await.map_err(CacheError::from)
        };

        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::warn!(operation, error = %e, "Redis command failed");
                }
                result
            }
            Err(_) => {
                tracing::warn!(
                    operation,
                    timeout_ms = self.op_timeout.as_millis() as u64,
                    "Redis command timed out"
                );
                Err(CacheError::Timeout { operation })
            }
        }
    }
}

/// Longest TTL sent to Redis. Redis rejects expiries that overflow once added
/// to its clock, and `PEXPIRE` takes a signed argument.
const MAX_TTL_MILLIS: u64 = 1 << 62;

/// Converts a TTL into Redis milliseconds, rounding sub-millisecond values up
/// and clamping to [`MAX_TTL_MILLIS`].
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis().max(1))
        .map_or(MAX_TTL_MILLIS, |millis| millis.min(MAX_TTL_MILLIS))
}

/// Signed form of [`ttl_millis`] for `PEXPIRE`.
fn pexpire_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl_millis(ttl)).unwrap_or(i64::MAX)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let key = key.to_string();
        let value = self
            .run("get", |mut conn| async move {
                conn.get::<_, Option<Vec<u8>>>(&key).await
            })
            .await?;
        tracing::debug!(hit = value.is_some(), "redis cache get");
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let key = key.to_string();
        match effective_ttl(ttl) {
            Some(ttl) => {
                let millis = ttl_millis(ttl);
                self.run("set", |mut conn| async move {
                    conn.pset_ex::<_, _, ()>(&key, value, millis).await
                })
                .await
            }
            None => {
                self.run("set", |mut conn| async move {
                    conn.set::<_, _, ()>(&key, value).await
                })
                .await
            }
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let key = key.to_string();
        self.run("delete", |mut conn| async move {
            conn.del::<_, ()>(&key).await
        })
        .await
    }

    async fn increment(&self, key: &str, ttl: Duration) -> CacheResult<Option<u64>> {
        let key = key.to_string();
        let millis = pexpire_millis(ttl);
        let (count,): (u64,) = self
            .run("increment", |mut conn| async move {
                redis::pipe()
                    .atomic()
                    .incr(&key, 1u64)
                    .pexpire(&key, millis)
                    .ignore()
                    .query_async(&mut conn)
                    .await
            })
            .await?;
        Ok(Some(count))
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_rounds_up_sub_millisecond() {
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(300)), 300_000);
    }

    #[test]
    fn test_huge_ttl_stays_positive() {
        assert_eq!(ttl_millis(Duration::MAX), MAX_TTL_MILLIS);
        assert_eq!(ttl_millis(Duration::from_millis(u64::MAX)), MAX_TTL_MILLIS);

        let millis = pexpire_millis(Duration::MAX);
        assert!(millis > 0);
        assert_eq!(u64::try_from(millis).unwrap(), MAX_TTL_MILLIS);
        assert_eq!(pexpire_millis(Duration::from_secs(900)), 900_000);
    }

    #[tokio::test]
    async fn test_unreachable_server_surfaces_error() {
        // Nothing listens on port 1; the pool checkout fails or times out.
        let store =
            RedisStore::connect("redis://127.0.0.1:1", 1, Duration::from_millis(200)).unwrap();

        let err = store.get("login:x").await.unwrap_err();
        assert!(err.is_unavailable());

        let err = store
            .increment("login:x", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }
}
