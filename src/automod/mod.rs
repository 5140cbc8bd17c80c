//! Automod decision engine.
//!
//! - `resolver` - layered policy resolution (level, then channel)
//! - `checks` - stateless content and spam rules
//! - `pipeline` - ordered evaluation producing a [`Verdict`]
//! - `ratelimit` - windowed counters over a [`crate::stores::CacheStore`]
//! - `escalation` - strikes, cushioning and punishment decisions
//! - `antinuke` - mass removal detection

pub mod antinuke;
pub mod checks;
pub mod cushioning;
pub mod escalation;
pub mod lookup;
pub mod normalize;
pub mod pipeline;
pub mod ratelimit;
pub mod resolver;
pub mod verdict;

pub use antinuke::AntiNukeLimiter;
pub use escalation::{EscalationEngine, EscalationOutcome, Violation};
pub use pipeline::Evaluator;
pub use ratelimit::RateLimiter;
pub use verdict::Verdict;
