//! Strike records.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Issuer recorded for strikes created by the automod engine.
pub const AUTOMOD_ISSUER: &str = "automod";

/// A persisted, weighted violation attributed to a user.
///
/// Immutable once written; removed only by a pardon or by expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrikeRecord {
    pub uuid: String,
    pub guild_id: String,
    pub user_id: String,
    /// Who issued the strike (`"automod"` or a moderator id).
    pub issuer: String,
    pub weight: i64,
    pub reason: String,
    /// Unix timestamp when the strike was issued
    pub created_at: i64,
    /// Unix timestamp after which the strike stops counting (None = permanent)
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl StrikeRecord {
    pub fn new(
        guild_id: &str,
        user_id: &str,
        issuer: &str,
        weight: i64,
        reason: &str,
        ttl_secs: Option<u64>,
    ) -> Self {
        let created_at = Utc::now().timestamp();
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            guild_id: guild_id.to_string(),
            user_id: user_id.to_string(),
            issuer: issuer.to_string(),
            weight,
            reason: reason.to_string(),
            created_at,
            expires_at: ttl_secs.map(|ttl| created_at.saturating_add(ttl as i64)),
        }
    }

    /// Check if the strike has expired at `now` (unix seconds).
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(at) => now >= at,
            None => false,
        }
    }
}

/// Sum of weights of strikes still active at `now`.
///
/// Negative weights are data errors and count as zero.
pub fn active_weight(strikes: &[StrikeRecord], now: i64) -> i64 {
    strikes
        .iter()
        .filter(|s| !s.is_expired(now))
        .map(|s| s.weight.max(0))
        .fold(0i64, |acc, w| acc.saturating_add(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let strike = StrikeRecord::new("g", "u", AUTOMOD_ISSUER, 1, "Spam", Some(60));
        assert!(!strike.is_expired(strike.created_at));
        assert!(strike.is_expired(strike.created_at + 60));

        let permanent = StrikeRecord::new("g", "u", AUTOMOD_ISSUER, 1, "Spam", None);
        assert!(!permanent.is_expired(i64::MAX));
    }

    #[test]
    fn test_active_weight_skips_expired_and_negative() {
        let mut old = StrikeRecord::new("g", "u", AUTOMOD_ISSUER, 4, "old", Some(10));
        old.created_at -= 100;
        old.expires_at = Some(old.created_at + 10);
        let live = StrikeRecord::new("g", "u", AUTOMOD_ISSUER, 2, "live", None);
        let broken = StrikeRecord::new("g", "u", AUTOMOD_ISSUER, -9, "broken", None);

        let now = Utc::now().timestamp();
        assert_eq!(active_weight(&[old, live, broken], now), 2);
    }
}
