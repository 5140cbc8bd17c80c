//! Mass kick/ban detection.

use std::time::Duration;

use tracing::{debug, warn};

use super::ratelimit::{RateCheck, RateLimiter};
use crate::database::models::AntiNukeConfig;
use crate::message::AuditEntry;
use crate::utils::parse_duration;

pub const MEMBER_REMOVE_NAMESPACE: &str = "memberRemove";

const FALLBACK_WINDOW: Duration = Duration::from_secs(60);

/// Counts membership removals per acting moderator in a fixed window.
#[derive(Clone)]
pub struct AntiNukeLimiter {
    limiter: RateLimiter,
}

impl AntiNukeLimiter {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }

    /// Record one audit entry. Returns `None` when the entry is not a member
    /// removal or the guild has anti-nuke disabled.
    pub async fn observe(&self, config: &AntiNukeConfig, entry: &AuditEntry) -> Option<RateCheck> {
        if !config.enabled || !entry.action.is_member_removal() {
            return None;
        }

        let window = match parse_duration(&config.window) {
            Some(window) if !window.is_zero() => window,
            _ => {
                warn!(
                    "Invalid anti-nuke window {:?} in guild {}, using {:?}",
                    config.window, entry.guild_id, FALLBACK_WINDOW
                );
                FALLBACK_WINDOW
            }
        };

        let check = self
            .limiter
            .check_and_increment(
                MEMBER_REMOVE_NAMESPACE,
                &entry.guild_id,
                &entry.actor_id,
                config.max_removals,
                window,
                false,
            )
            .await;

        debug!(
            "Anti-nuke: actor {} in guild {} at {} removals",
            entry.actor_id, entry.guild_id, check.count
        );

        Some(check)
    }
}
