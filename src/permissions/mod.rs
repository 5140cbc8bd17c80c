//! Permission levels.
//!
//! Users are ranked by an integer trust level derived from their roles or an
//! explicit per-user override. Bot owners bypass automod entirely.

mod levels;

pub use levels::{Owners, user_level};
