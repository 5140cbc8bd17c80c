//! Cache module - in-process caching.
//!
//! - `CacheRegistry` / `TypedCache` - named Moka caches used by repositories
//!   (guild policies, untrustworthy content snapshot, compiled regexes)
//! - `MemoryCounterStore` - TTL counters backing the rate limiter
//!
//! ## Usage
//!
//! ```rust,ignore
//! let policies = registry.get_or_create::<String, GuildPolicy>("guild_policy", CacheConfig::guild_policy())?;
//! policies.insert(guild_id, policy);
//! ```

mod config;
mod counter_store;
mod registry;
mod typed;

pub use config::CacheConfig;
pub use counter_store::MemoryCounterStore;
pub use registry::{CacheRegistry, CacheTypeMismatch};
pub use typed::TypedCache;
