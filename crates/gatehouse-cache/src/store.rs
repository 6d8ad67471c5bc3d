//! The cache store contract shared by every backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheResult;

/// Key/value store with per-key time-to-live.
///
/// Implementations must never return a value whose TTL has elapsed, even if
/// the entry has not been physically evicted yet.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if it was never set,
    /// was deleted, or has expired.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// The entry expires at `now + ttl`. `None` or a zero duration means the
    /// entry never expires.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()>;

    /// Removes `key`. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically increments the counter under `key` and resets its expiry
    /// to `now + ttl`, returning the new count. An absent key counts as 0.
    ///
    /// Backends without an atomic primitive return `Ok(None)`; callers must
    /// then serialise their own read-modify-write.
    async fn increment(&self, _key: &str, _ttl: Duration) -> CacheResult<Option<u64>> {
        Ok(None)
    }

    /// Short backend name for logs ("memory", "redis").
    fn backend_name(&self) -> &'static str;
}

/// Typed helpers on top of [`CacheStore`] using JSON encoding.
#[async_trait]
pub trait CacheStoreExt: CacheStore {
    /// Reads and decodes a JSON value.
    async fn get_json<T>(&self, key: &str) -> CacheResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Encodes and stores a JSON value.
    async fn set_json<T>(&self, key: &str, value: &T, ttl: Option<Duration>) -> CacheResult<()>
    where
        T: Serialize + Sync,
    {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, bytes, ttl).await
    }
}

impl<S: CacheStore + ?Sized> CacheStoreExt for S {}

/// Normalises a caller TTL: zero means "no expiry".
pub(crate) fn effective_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|d| !d.is_zero())
}
