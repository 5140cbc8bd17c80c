//! Rate-limited counters on top of a [`CacheStore`].
//!
//! Counters are keyed by `(namespace, guild, subject)` and live for one
//! window. The store is the source of truth; nothing is counted in-process.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::StoreError;
use crate::stores::{CacheStore, with_deadline};

/// Outcome of [`RateLimiter::check_and_increment`].
#[derive(Debug, Clone)]
pub struct RateCheck {
    /// False once the count exceeds the limit.
    pub ok: bool,
    /// Count after this event, 0 when the store was not touched.
    pub count: i64,
    /// Store failure, if any. The check failed open.
    pub error: Option<StoreError>,
}

impl RateCheck {
    fn open(error: Option<StoreError>) -> Self {
        Self { ok: true, count: 0, error }
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CacheStore>,
    timeout: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CacheStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn key(namespace: &str, guild_id: &str, subject_id: &str) -> String {
        format!("{}:{}:{}", namespace, guild_id, subject_id)
    }

    /// Count one event and compare against `limit`.
    ///
    /// The window starts at the first event. With `extend_on_repeat` every
    /// event pushes the expiry out again (sliding window); otherwise the
    /// first expiry stands (fixed window). With `limit = 3`, events 1-3 pass
    /// and the 4th fails.
    ///
    /// A limit of 0 never touches the store. Store failures fail open.
    pub async fn check_and_increment(
        &self,
        namespace: &str,
        guild_id: &str,
        subject_id: &str,
        limit: u64,
        window: Duration,
        extend_on_repeat: bool,
    ) -> RateCheck {
        if limit == 0 {
            return RateCheck::open(None);
        }

        let key = Self::key(namespace, guild_id, subject_id);
        match self.increment(&key, window, extend_on_repeat).await {
            Ok(count) => RateCheck {
                ok: count <= limit as i64,
                count,
                error: None,
            },
            Err(e) => {
                warn!("Rate limiter store error for {}: {}", key, e);
                RateCheck::open(Some(e))
            }
        }
    }

    async fn increment(&self, key: &str, window: Duration, extend: bool) -> Result<i64, StoreError> {
        let count = with_deadline(self.timeout, self.store.incr(key)).await?;

        // First event opens the window; later ones only refresh it when sliding.
        if count == 1 || extend {
            if let Err(e) = with_deadline(self.timeout, self.store.expire(key, window)).await {
                // A counter without a TTL would never reset in a fixed window.
                if let Err(del_err) = with_deadline(self.timeout, self.store.del(key)).await {
                    warn!("Failed to drop counter {} after expire error: {}", key, del_err);
                }
                return Err(e);
            }
        }

        Ok(count)
    }

    /// Forget a counter so one burst does not keep re-triggering.
    pub async fn clear(&self, namespace: &str, guild_id: &str, subject_id: &str) -> Result<(), StoreError> {
        let key = Self::key(namespace, guild_id, subject_id);
        with_deadline(self.timeout, self.store.del(&key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCounterStore;
    use crate::test_helpers::{FailingCache, FlakyExpireCache};

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(MemoryCounterStore::new()), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_limit_boundary() {
        let limiter = limiter();
        let mut results = Vec::new();
        for _ in 0..4 {
            let check = limiter
                .check_and_increment("messages", "g", "u", 3, Duration::from_secs(60), false)
                .await;
            results.push(check.ok);
        }
        assert_eq!(results, vec![true, true, true, false]);
    }

    #[tokio::test]
    async fn test_zero_limit_never_counts() {
        let store = Arc::new(MemoryCounterStore::new());
        let limiter = RateLimiter::new(store.clone(), Duration::from_secs(1));

        for _ in 0..10 {
            let check = limiter
                .check_and_increment("messages", "g", "u", 0, Duration::from_secs(60), false)
                .await;
            assert!(check.ok);
        }
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_keys_are_scoped() {
        let limiter = limiter();
        let window = Duration::from_secs(60);
        assert!(limiter.check_and_increment("messages", "g", "a", 1, window, false).await.ok);
        assert!(limiter.check_and_increment("messages", "g", "b", 1, window, false).await.ok);
        assert!(limiter.check_and_increment("memberRemove", "g", "a", 1, window, false).await.ok);
        assert!(!limiter.check_and_increment("messages", "g", "a", 1, window, false).await.ok);
    }

    #[tokio::test]
    async fn test_fixed_window_expires() {
        let limiter = limiter();
        let window = Duration::from_millis(30);
        assert!(limiter.check_and_increment("m", "g", "u", 1, window, false).await.ok);
        assert!(!limiter.check_and_increment("m", "g", "u", 1, window, false).await.ok);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let check = limiter.check_and_increment("m", "g", "u", 1, window, false).await;
        assert!(check.ok);
        assert_eq!(check.count, 1);
    }

    #[tokio::test]
    async fn test_sliding_window_is_extended() {
        let limiter = limiter();
        let window = Duration::from_millis(200);
        limiter.check_and_increment("m", "g", "u", 10, window, true).await;
        tokio::time::sleep(Duration::from_millis(120)).await;
        limiter.check_and_increment("m", "g", "u", 10, window, true).await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        // Past the first expiry, but the second event refreshed the TTL.
        let check = limiter.check_and_increment("m", "g", "u", 10, window, true).await;
        assert_eq!(check.count, 3);
    }

    #[tokio::test]
    async fn test_clear_resets_counter() {
        let limiter = limiter();
        let window = Duration::from_secs(60);
        limiter.check_and_increment("m", "g", "u", 1, window, false).await;
        limiter.clear("m", "g", "u").await.unwrap();
        assert_eq!(limiter.check_and_increment("m", "g", "u", 1, window, false).await.count, 1);
    }

    #[tokio::test]
    async fn test_fails_open_on_store_outage() {
        let limiter = RateLimiter::new(Arc::new(FailingCache), Duration::from_secs(1));
        for _ in 0..5 {
            let check = limiter
                .check_and_increment("m", "g", "u", 1, Duration::from_secs(60), false)
                .await;
            assert!(check.ok);
            assert!(check.error.is_some());
        }
    }

    #[tokio::test]
    async fn test_lost_ttl_does_not_pin_counter() {
        let store = Arc::new(FlakyExpireCache::new(1));
        let limiter = RateLimiter::new(store.clone(), Duration::from_secs(1));
        let window = Duration::from_millis(30);

        // The window could not be opened, so the counter is dropped.
        let first = limiter.check_and_increment("m", "g", "u", 2, window, false).await;
        assert!(first.ok);
        assert!(first.error.is_some());
        assert_eq!(store.inner().len(), 0);

        let mut results = Vec::new();
        for _ in 0..3 {
            results.push(limiter.check_and_increment("m", "g", "u", 2, window, false).await.ok);
        }
        assert_eq!(results, vec![true, true, false]);

        tokio::time::sleep(Duration::from_millis(100)).await;
        let check = limiter.check_and_increment("m", "g", "u", 2, window, false).await;
        assert!(check.ok);
        assert_eq!(check.count, 1);
    }
}
