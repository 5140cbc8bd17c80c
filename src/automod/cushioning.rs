//! Short-lived strike exemptions for message-rate bursts.
//!
//! One spam burst can trip the message-rate check several times before the
//! counter clears. The first trip issues a strike and arms a small number of
//! exemptions; further trips within the window consume them instead of
//! issuing more strikes.
//!
//! State is process-local. Expiry is checked lazily against the last
//! violation time, so no timers run per user.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// How long a burst keeps its exemptions after the last violation.
pub const CUSHIONING_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct Cushion {
    remaining: u32,
    last_violation_at: Instant,
}

#[derive(Clone, Default)]
pub struct CushioningState {
    entries: Arc<DashMap<(String, String), Cushion>>,
}

impl CushioningState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a message-rate violation at `now`.
    ///
    /// Returns true when the violation is absorbed and must not produce a
    /// strike. Otherwise the exemptions are re-armed to `cushion` and the
    /// caller should strike.
    pub fn consume(&self, guild_id: &str, user_id: &str, now: Instant, cushion: u32) -> bool {
        let key = (guild_id.to_string(), user_id.to_string());

        // The entry guard holds the shard lock, so concurrent violations for
        // the same user are serialized here.
        let mut entry = self.entries.entry(key).or_insert(Cushion {
            remaining: 0,
            last_violation_at: now,
        });

        let lapsed = now.saturating_duration_since(entry.last_violation_at) >= CUSHIONING_WINDOW;
        entry.last_violation_at = now;

        if !lapsed && entry.remaining > 0 {
            entry.remaining -= 1;
            return true;
        }

        entry.remaining = cushion;
        false
    }

    /// Drop entries whose window has lapsed. Returns how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, c| now.saturating_duration_since(c.last_violation_at) < CUSHIONING_WINDOW);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_is_absorbed() {
        let state = CushioningState::new();
        let t0 = Instant::now();

        assert!(!state.consume("g", "u", t0, 2));
        assert!(state.consume("g", "u", t0 + Duration::from_secs(1), 2));
        assert!(state.consume("g", "u", t0 + Duration::from_secs(2), 2));
        // Exemptions exhausted: strike again and re-arm.
        assert!(!state.consume("g", "u", t0 + Duration::from_secs(3), 2));
        assert!(state.consume("g", "u", t0 + Duration::from_secs(4), 2));
    }

    #[test]
    fn test_window_lapses() {
        let state = CushioningState::new();
        let t0 = Instant::now();

        assert!(!state.consume("g", "u", t0, 2));
        let later = t0 + CUSHIONING_WINDOW + Duration::from_secs(1);
        assert!(!state.consume("g", "u", later, 2));
    }

    #[test]
    fn test_activity_refreshes_window() {
        let state = CushioningState::new();
        let t0 = Instant::now();

        assert!(!state.consume("g", "u", t0, 5));
        assert!(state.consume("g", "u", t0 + Duration::from_secs(50), 5));
        // 100s after the first violation but only 50s after the last one.
        assert!(state.consume("g", "u", t0 + Duration::from_secs(100), 5));
    }

    #[test]
    fn test_zero_cushion_never_absorbs() {
        let state = CushioningState::new();
        let t0 = Instant::now();
        for i in 0..3 {
            assert!(!state.consume("g", "u", t0 + Duration::from_secs(i), 0));
        }
    }

    #[test]
    fn test_users_are_independent_and_purged() {
        let state = CushioningState::new();
        let t0 = Instant::now();

        assert!(!state.consume("g", "a", t0, 1));
        assert!(!state.consume("g", "b", t0, 1));
        assert!(!state.consume("other", "a", t0, 1));
        assert_eq!(state.len(), 3);

        assert_eq!(state.purge_expired(t0 + CUSHIONING_WINDOW), 3);
        assert_eq!(state.len(), 0);
    }
}
