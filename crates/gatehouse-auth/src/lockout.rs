//! Failed-login tracking and lockout.
//!
//! Failures are counted per principal in the cache store under
//! `"login:" + principal`. The counter is refreshed with a full window TTL
//! on every failure, cleared on success, and simply expires if the
//! principal stops trying.
//!
//! ## Concurrency
//!
//! When the store offers an atomic increment (both bundled backends do),
//! counting is a single store call. Otherwise the read-increment-write is
//! serialised per principal through [`KeyedLocks`]; unrelated principals
//! never contend.
//!
//! ## Store outages
//!
//! [`LoginAttemptGuard::check_locked`] fails open so an outage cannot lock
//! every user out. Recording outcomes surfaces
//! [`AuthError::StoreUnavailable`] to the caller.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use gatehouse_cache::CacheStore;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::AuthError;

/// Failures at which a principal is locked out.
pub const DEFAULT_LOCKOUT_THRESHOLD: u64 = 3;

/// Lifetime of the failure counter.
pub const DEFAULT_LOCKOUT_WINDOW: Duration = Duration::from_secs(5 * 60);

const ATTEMPT_KEY_PREFIX: &str = "login:";

/// Lockout threshold and window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub threshold: u64,
    pub window: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_LOCKOUT_THRESHOLD,
            window: DEFAULT_LOCKOUT_WINDOW,
        }
    }
}

/// Tracks failed login attempts per principal.
pub struct LoginAttemptGuard {
    store: Arc<dyn CacheStore>,
    policy: LockoutPolicy,
    locks: KeyedLocks,
}

impl LoginAttemptGuard {
    pub fn new(store: Arc<dyn CacheStore>, policy: LockoutPolicy) -> Self {
        Self {
            store,
            policy,
            locks: KeyedLocks::default(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> LockoutPolicy {
        self.policy
    }

    /// Cache key holding the failure counter for `principal`.
    #[must_use]
    pub fn attempt_key(principal: &str) -> String {
        format!("{ATTEMPT_KEY_PREFIX}{principal}")
    }

    /// Returns `true` if `principal` has reached the failure threshold.
    ///
    /// Store errors are logged and treated as "not locked".
    pub async fn check_locked(&self, principal: &str) -> bool {
        match self.failure_count(principal).await {
            Ok(count) => count >= self.policy.threshold,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.store.backend_name(),
                    "Lockout check failed; allowing attempt"
                );
                false
            }
        }
    }

    /// Current number of consecutive failures for `principal`.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the store cannot be read.
    pub async fn failure_count(&self, principal: &str) -> Result<u64, AuthError> {
        let key = Self::attempt_key(principal);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(0);
        };

        match parse_counter(&raw) {
            Some(count) => Ok(count),
            None => {
                tracing::warn!(key = %key, "Ignoring undecodable attempt counter");
                Ok(0)
            }
        }
    }

    /// Records a failed attempt and returns the new failure count.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the failure could not be recorded.
    pub async fn record_failure(&self, principal: &str) -> Result<u64, AuthError> {
        let key = Self::attempt_key(principal);
        let window = self.policy.window;

        let count = match self.store.increment(&key, window).await? {
            Some(count) => count,
            None => {
                let _guard = self.locks.lock(&key).await;
                let next = self.failure_count(principal).await? + 1;
                self.store
                    .set(&key, next.to_string().into_bytes(), Some(window))
                    .await?;
                next
            }
        };

        tracing::debug!(
            key = %key,
            attempts = count,
            locked = count >= self.policy.threshold,
            "Failed login attempt recorded"
        );
        Ok(count)
    }

    /// Clears the failure counter for `principal`.
    ///
    /// # Errors
    /// Returns `StoreUnavailable` if the counter could not be deleted.
    pub async fn record_success(&self, principal: &str) -> Result<(), AuthError> {
        let key = Self::attempt_key(principal);
        self.store.delete(&key).await?;
        tracing::debug!(key = %key, "Failed login attempts cleared");
        Ok(())
    }
}

fn parse_counter(raw: &[u8]) -> Option<u64> {
    std::str::from_utf8(raw).ok()?.trim().parse().ok()
}

/// Per-key async mutexes. Idle entries are dropped on release.
#[derive(Default)]
struct KeyedLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

struct KeyedGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    async fn lock(&self, key: &str) -> KeyedGuard<'_> {
        let mutex = Arc::clone(self.locks.entry(key.to_string()).or_default().value());
        let guard = mutex.lock_owned().await;
        KeyedGuard {
            owner: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.owner
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use gatehouse_cache::{CacheError, CacheResult, MemoryStore};

    /// Memory store without the atomic increment, to exercise the locked path.
    struct PlainStore(MemoryStore);

    #[async_trait]
    impl CacheStore for PlainStore {
        async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            // Yield between read and write so racing tasks interleave.
            tokio::task::yield_now().await;
            self.0.get(key).await
        }

        async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> CacheResult<()> {
            tokio::task::yield_now().await;
            self.0.set(key, value, ttl).await
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            self.0.delete(key).await
        }

        fn backend_name(&self) -> &'static str {
            "plain"
        }
    }

    /// Store whose backend is always down.
    struct DownStore;

    #[async_trait]
    impl CacheStore for DownStore {
        async fn get(&self, _key: &str) -> CacheResult<Option<Vec<u8>>> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> CacheResult<()> {
            Err(CacheError::unavailable("connection refused"))
        }

        async fn delete(&self, _key: &str) -> CacheResult<()> {
            Err(CacheError::Timeout { operation: "delete" })
        }

        async fn increment(&self, _key: &str, _ttl: Duration) -> CacheResult<Option<u64>> {
            Err(CacheError::Timeout { operation: "increment" })
        }

        fn backend_name(&self) -> &'static str {
            "down"
        }
    }

    fn memory_guard() -> LoginAttemptGuard {
        LoginAttemptGuard::new(Arc::new(MemoryStore::new(64)), LockoutPolicy::default())
    }

    #[test]
    fn test_attempt_key() {
        assert_eq!(
            LoginAttemptGuard::attempt_key("a@example.com"),
            "login:a@example.com"
        );
    }

    #[tokio::test]
    async fn test_locks_at_threshold() {
        let guard = memory_guard();
        let principal = "a@example.com";

        for expected in 1..=2 {
            assert_eq!(guard.record_failure(principal).await.unwrap(), expected);
            assert!(!guard.check_locked(principal).await);
        }

        assert_eq!(guard.record_failure(principal).await.unwrap(), 3);
        assert!(guard.check_locked(principal).await);

        guard.record_failure(principal).await.unwrap();
        assert!(guard.check_locked(principal).await);
    }

    #[tokio::test]
    async fn test_success_clears_failures() {
        let guard = memory_guard();
        for _ in 0..5 {
            guard.record_failure("b@example.com").await.unwrap();
        }
        assert!(guard.check_locked("b@example.com").await);

        guard.record_success("b@example.com").await.unwrap();
        assert!(!guard.check_locked("b@example.com").await);
        assert_eq!(guard.failure_count("b@example.com").await.unwrap(), 0);

        // Clearing an absent counter is fine.
        guard.record_success("nobody@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn test_principals_are_independent() {
        let guard = memory_guard();
        for _ in 0..3 {
            guard.record_failure("c@example.com").await.unwrap();
        }
        assert!(guard.check_locked("c@example.com").await);
        assert!(!guard.check_locked("d@example.com").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_on_each_failure() {
        let guard = memory_guard();
        let principal = "e@example.com";

        guard.record_failure(principal).await.unwrap();
        tokio::time::advance(Duration::from_secs(240)).await;
        guard.record_failure(principal).await.unwrap();
        tokio::time::advance(Duration::from_secs(240)).await;
        guard.record_failure(principal).await.unwrap();
        assert!(guard.check_locked(principal).await);

        // Locked for a full window after the last failure, then released.
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(guard.check_locked(principal).await);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!guard.check_locked(principal).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_plain_store_window() {
        let guard =
            LoginAttemptGuard::new(Arc::new(PlainStore(MemoryStore::new(8))), LockoutPolicy::default());
        guard.record_failure("f@example.com").await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        assert_eq!(guard.failure_count("f@example.com").await.unwrap(), 0);
    }

    async fn hammer(guard: Arc<LoginAttemptGuard>, n: u64) {
        let mut handles = Vec::new();
        for _ in 0..n {
            let guard = Arc::clone(&guard);
            handles.push(tokio::spawn(async move {
                guard.record_failure("race@example.com").await.unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(guard.failure_count("race@example.com").await.unwrap(), n);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_atomic_store() {
        for n in [2, 10, 50] {
            hammer(Arc::new(memory_guard()), n).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_failures_keyed_lock_fallback() {
        for n in [2, 10, 50] {
            let guard = Arc::new(LoginAttemptGuard::new(
                Arc::new(PlainStore(MemoryStore::new(8))),
                LockoutPolicy::default(),
            ));
            hammer(Arc::clone(&guard), n).await;
            assert_eq!(guard.locks.len(), 0);
        }
    }

    #[tokio::test]
    async fn test_store_outage_fails_open_for_checks() {
        let guard = LoginAttemptGuard::new(Arc::new(DownStore), LockoutPolicy::default());

        assert!(!guard.check_locked("g@example.com").await);
        assert!(matches!(
            guard.record_failure("g@example.com").await,
            Err(AuthError::StoreUnavailable { .. })
        ));
        assert!(matches!(
            guard.record_success("g@example.com").await,
            Err(AuthError::StoreUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_undecodable_counter_counts_as_zero() {
        let store = Arc::new(MemoryStore::new(8));
        store
            .set("login:h@example.com", b"garbage".to_vec(), None)
            .await
            .unwrap();
        let guard = LoginAttemptGuard::new(store, LockoutPolicy::default());
        assert!(!guard.check_locked("h@example.com").await);
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let guard = LoginAttemptGuard::new(
            Arc::new(MemoryStore::new(8)),
            LockoutPolicy {
                threshold: 1,
                window: Duration::from_secs(60),
            },
        );
        guard.record_failure("i@example.com").await.unwrap();
        assert!(guard.check_locked("i@example.com").await);
    }
}
