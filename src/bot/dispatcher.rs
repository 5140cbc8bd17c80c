//! Shared application state.
//!
//! Wires the collaborators into the engine once at startup. Every event
//! handler receives a clone.

use std::sync::Arc;
use std::time::Duration;

use crate::automod::{AntiNukeLimiter, EscalationEngine, Evaluator, RateLimiter};
use crate::gateway::ChatGateway;
use crate::permissions::Owners;
use crate::stores::{CacheStore, PolicyStore, StrikeStore, UntrustworthyContentStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Per-guild automod policies.
    pub policies: Arc<dyn PolicyStore>,

    /// Message evaluation pipeline.
    pub evaluator: Evaluator,

    /// Strikes and punishments.
    pub escalation: EscalationEngine,

    /// Mass removal detection.
    pub antinuke: AntiNukeLimiter,

    /// Punishment actuation.
    pub gateway: Arc<dyn ChatGateway>,

    /// Owner user IDs (bypass automod).
    pub owners: Owners,

    /// Deadline for store and gateway calls made by handlers.
    pub timeout: Duration,
}

impl AppState {
    pub fn new(
        policies: Arc<dyn PolicyStore>,
        strikes: Arc<dyn StrikeStore>,
        counters: Arc<dyn CacheStore>,
        gateway: Arc<dyn ChatGateway>,
        owners: Owners,
        strike_cushioning: u32,
        timeout: Duration,
    ) -> Self {
        // Message rate and anti-nuke share one counter store, split by namespace.
        let limiter = RateLimiter::new(counters, timeout);

        Self {
            policies,
            evaluator: Evaluator::new(limiter.clone(), timeout),
            escalation: EscalationEngine::new(strikes, gateway.clone(), strike_cushioning, timeout),
            antinuke: AntiNukeLimiter::new(limiter),
            gateway,
            owners,
            timeout,
        }
    }

    /// Enable the untrustworthy content lookup.
    #[must_use]
    pub fn with_untrustworthy(mut self, store: Arc<dyn UntrustworthyContentStore>) -> Self {
        self.evaluator = self.evaluator.with_untrustworthy(store);
        self
    }
}
