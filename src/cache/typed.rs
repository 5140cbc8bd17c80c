//! Named Moka cache with a fixed key/value type.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;

use super::CacheConfig;

/// Clones share storage, so a repository and the registry see the same
/// entries.
pub struct TypedCache<K, V> {
    name: Arc<str>,
    entries: Cache<K, V>,
}

impl<K, V> Clone for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            // moka caches are reference counted internally
            entries: self.entries.clone(),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let name = name.into();
        let mut builder = Cache::builder()
            .name(&name)
            .max_capacity(config.max_capacity);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            name,
            entries: builder.build(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key)
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    /// Concurrent misses on one key run `init` once; the others wait for it.
    pub fn get_or_insert_with(&self, key: K, init: impl FnOnce() -> V) -> V {
        self.entries.get_with(key, init)
    }
}

impl<K, V> fmt::Debug for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypedCache({}, ~{} entries)", self.name, self.entries.entry_count())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let policies: TypedCache<String, i64> = TypedCache::new("guild_policy", CacheConfig::guild_policy());
        let shared = policies.clone();
        policies.insert("guild".to_string(), 1);
        assert_eq!(shared.get(&"guild".to_string()), Some(1));
        assert_eq!(shared.get(&"other".to_string()), None);
    }

    #[test]
    fn test_ttl_expires_entries() {
        let snapshot: TypedCache<u32, u32> =
            TypedCache::new("short", CacheConfig::bounded(10, Duration::from_millis(20)));
        snapshot.insert(1, 1);
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(snapshot.get(&1), None);
    }

    #[test]
    fn test_get_or_insert_with_keeps_first_value() {
        let patterns: TypedCache<u32, u32> = TypedCache::new("compiled_patterns", CacheConfig::compiled_patterns());
        assert_eq!(patterns.get_or_insert_with(1, || 10), 10);
        assert_eq!(patterns.get_or_insert_with(1, || 20), 10);
    }
}
