//! In-process cache store backed by an ARC directory.
//!
//! Suitable for a single process only: state is not shared across
//! instances. All operations take one short `parking_lot` lock and never
//! suspend while holding it, which also makes [`CacheStore::increment`]
//! atomic.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::arc::{ArcDirectory, ArcShape};
use crate::error::{CacheError, CacheResult};
use crate::store::{CacheStore, effective_ttl};

/// Default number of resident entries.
pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
struct CachedEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CachedEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: effective_ttl(ttl).map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    /// Number of resident entries (including expired ones not yet purged).
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
    /// Entries pushed out by the replacement policy.
    pub evictions: u64,
    /// Entries dropped because their TTL elapsed.
    pub expirations: u64,
    pub shape: ArcShape,
}

impl MemoryStats {
    /// Calculate hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct Inner {
    directory: ArcDirectory<CachedEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl Inner {
    /// Returns the live entry for `key`, dropping it first if it has expired.
    fn live(&mut self, key: &str, now: Instant) -> Option<&CachedEntry> {
        if self.directory.peek(key)?.is_expired(now) {
            self.directory.remove(key);
            self.expirations += 1;
            return None;
        }
        self.directory.touch(key)
    }

    fn store(&mut self, key: &str, entry: CachedEntry) {
        if let Some(evicted) = self.directory.insert(key.to_string(), entry) {
            self.evictions += 1;
            tracing::trace!(key = %evicted, "memory cache eviction");
        }
    }
}

/// Bounded in-process store using adaptive replacement.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates a store holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                directory: ArcDirectory::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().directory.capacity()
    }

    /// Drops every expired entry. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let removed = inner.directory.purge(|entry| entry.is_expired(now));
        inner.expirations += removed as u64;
        removed
    }

    pub fn clear(&self) {
        self.inner.lock().directory.clear();
    }

    pub fn stats(&self) -> MemoryStats {
        let inner = self.inner.lock();
        MemoryStats {
            size: inner.directory.len(),
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            expirations: inner.expirations,
            shape: inner.directory.shape(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut inner = self.inner.lock();
        let value = inner.live(key, Instant::now()).map(|e| e.value.clone());
        if value.is_some() {
            inner.hits += 1;
        } else {
            inner.misses += 1;
        }
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
        let entry = CachedEntry::new(value, ttl);
        self.inner.lock().store(key, entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.inner.lock().directory.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, ttl: Duration) -> CacheResult<Option<u64>> {
        let mut inner = self.inner.lock();
        let current = match inner.live(key, Instant::now()) {
            Some(entry) => std::str::from_utf8(&entry.value)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok())
                .ok_or_else(|| CacheError::serialization("value is not an integer counter"))?,
            None => 0,
        };
        let next = current + 1;
        inner.store(key, CachedEntry::new(next.to_string().into_bytes(), Some(ttl)));
        Ok(Some(next))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
