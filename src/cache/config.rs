//! Per-cache sizing and expiry presets.

use std::time::Duration;

/// Sizing and expiry for one named cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub ttl: Option<Duration>,
    /// Evict entries nobody has read for this long.
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::bounded(10_000, Duration::from_secs(300))
    }
}

impl CacheConfig {
    /// `max_capacity` entries, each living at most `ttl`.
    pub const fn bounded(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            max_capacity,
            ttl: Some(ttl),
            tti: None,
        }
    }

    #[must_use]
    pub fn idle_after(mut self, tti: Duration) -> Self {
        self.tti = Some(tti);
        self
    }

    /// Guild policies are read on every message and change rarely.
    pub fn guild_policy() -> Self {
        Self::bounded(10_000, Duration::from_secs(600))
    }

    /// The whole untrustworthy-content collection, stored under one key.
    pub fn untrustworthy_snapshot() -> Self {
        Self::bounded(1, Duration::from_secs(300))
    }

    /// Compiled guild regexes, kept while the guild is active.
    pub fn compiled_patterns() -> Self {
        Self::bounded(5_000, Duration::from_secs(3600)).idle_after(Duration::from_secs(900))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(CacheConfig::guild_policy().ttl, Some(Duration::from_secs(600)));
        assert_eq!(CacheConfig::untrustworthy_snapshot().max_capacity, 1);

        let patterns = CacheConfig::compiled_patterns();
        assert_eq!(patterns.tti, Some(Duration::from_secs(900)));
        assert_eq!(patterns.ttl, Some(Duration::from_secs(3600)));
    }
}
