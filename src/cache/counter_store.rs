//! In-process counter store.
//!
//! Implements [`CacheStore`] over a `DashMap` so rate limiting works without
//! a networked cache. Increments hold the shard lock, so concurrent handlers
//! hitting the same key never lose updates.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use crate::error::StoreError;
use crate::stores::CacheStore;

#[derive(Debug, Clone, Copy)]
struct Slot {
    value: i64,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// DashMap-backed counters with lazy TTL expiry.
#[derive(Clone)]
pub struct MemoryCounterStore {
    data: Arc<DashMap<String, Slot>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Arc::new(DashMap::with_capacity(capacity)),
        }
    }

    /// Drop every expired slot. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.data.len();
        self.data.retain(|_, slot| slot.is_live(now));
        let removed = before.saturating_sub(self.data.len());
        if removed > 0 {
            debug!("Purged {} expired counters, {} live", removed, self.len());
        }
        removed
    }

    /// Spawn a background task purging expired counters every `interval`.
    pub fn spawn_purger(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                store.purge_expired();
            }
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCounterStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let now = Instant::now();
        Ok(self
            .data
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value))
    }

    async fn set(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.data.insert(key.to_string(), Slot { value, expires_at });
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let value = match self.data.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if slot.is_live(now) {
                    slot.value = slot.value.saturating_add(1);
                } else {
                    *slot = Slot { value: 1, expires_at: None };
                }
                slot.value
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot { value: 1, expires_at: None });
                1
            }
        };
        Ok(value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.data.get_mut(key) {
            Some(mut slot) if slot.is_live(now) => {
                slot.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incr_creates_and_counts() {
        let store = MemoryCounterStore::new();
        assert_eq!(store.incr("k").await.unwrap(), 1);
        assert_eq!(store.incr("k").await.unwrap(), 2);
        assert_eq!(store.get("k").await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn test_expired_slot_restarts_at_one() {
        let store = MemoryCounterStore::new();
        store.set("k", 9, Some(Duration::from_millis(1))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(!store.expire("k", Duration::from_secs(1)).await.unwrap());
        assert_eq!(store.incr("k").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_purge_and_delete() {
        let store = MemoryCounterStore::new();
        store.set("old", 1, Some(Duration::from_millis(1))).await.unwrap();
        store.set("keep", 1, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(store.purge_expired(), 1);
        store.del("keep").await.unwrap();
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_not_lost() {
        let store = MemoryCounterStore::new();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..100 {
                    store.incr("shared").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("shared").await.unwrap(), Some(800));
    }
}
