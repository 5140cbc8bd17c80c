//! Database models.

pub mod policy;
pub mod strike;
pub mod untrustworthy;

pub use policy::{AntiNukeConfig, CensorPolicy, EscalationStep, GuildPolicy, LevelConfig, SpamPolicy};
pub use strike::{AUTOMOD_ISSUER, StrikeRecord, active_weight};
pub use untrustworthy::{UntrustworthyEntry, UntrustworthySet};
