//! Cache registry - Central management for named caches.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use super::{CacheConfig, TypedCache};

/// A cache name was registered twice with different key/value types.
#[derive(Debug, thiserror::Error)]
#[error("cache '{name}' already exists as {existing}, requested {requested}")]
pub struct CacheTypeMismatch {
    pub name: String,
    pub existing: &'static str,
    pub requested: &'static str,
}

/// Central registry for managing multiple typed caches.
///
/// Repositories look their caches up by name so that two repositories over
/// the same collection share one cache.
#[derive(Clone)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

/// Internal cache entry storing type-erased cache.
struct CacheEntry {
    cache: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl CacheRegistry {
    /// Create a new empty cache registry.
    pub fn new() -> Self {
        Self {
            caches: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    pub fn get_or_create<K, V>(
        &self,
        name: &str,
        config: CacheConfig,
    ) -> Result<TypedCache<K, V>, CacheTypeMismatch>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        let mut caches = self.caches.write();

        if let Some(existing) = caches.get(name) {
            return Self::downcast(name, existing);
        }

        debug!("Creating cache: {}", name);
        let cache = TypedCache::<K, V>::new(name, config);
        caches.insert(
            name.to_string(),
            CacheEntry {
                cache: Box::new(cache.clone()),
                type_name: std::any::type_name::<TypedCache<K, V>>(),
            },
        );

        Ok(cache)
    }

    fn downcast<K, V>(name: &str, entry: &CacheEntry) -> Result<TypedCache<K, V>, CacheTypeMismatch>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        entry
            .cache
            .downcast_ref::<TypedCache<K, V>>()
            .cloned()
            .ok_or_else(|| CacheTypeMismatch {
                name: name.to_string(),
                existing: entry.type_name,
                requested: std::any::type_name::<TypedCache<K, V>>(),
            })
    }

    /// Get a list of all registered cache names.
    pub fn cache_names(&self) -> Vec<String> {
        self.caches.read().keys().cloned().collect()
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_count", &caches.len())
            .field("cache_names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}
