//! Guild automod policy models.
//!
//! A policy is layered: level-scoped censor/spam rules picked by the user's
//! trust level, then channel-scoped overrides merged on top.
//!
//! Non-boolean fields are `Option`s: `None` means "not set at this layer" and
//! inherits from the level layer. Booleans are never inherited.

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::automod::lookup::ThresholdTable;

/// Content rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CensorPolicy {
    pub filter_invites: bool,
    pub invite_whitelist: Option<Vec<String>>,
    pub invite_blacklist: Option<Vec<String>>,

    pub filter_domains: bool,
    pub domain_whitelist: Option<Vec<String>>,
    pub domain_blacklist: Option<Vec<String>>,

    pub filter_strings: bool,
    /// Whole-word matches.
    pub blocked_strings: Option<Vec<String>>,
    /// Matches anywhere, including attachment filenames.
    pub blocked_substrings: Option<Vec<String>>,

    pub filter_ips: bool,
    pub filter_zalgo: bool,
    pub filter_non_english: bool,
    pub filter_unicode: bool,

    pub filter_regex: bool,
    pub regex: Option<String>,

    /// Look up known-bad content in the untrustworthy content store.
    pub filter_untrustworthy: bool,
}

/// Behavioral thresholds. `Some(0)` and `None` both mean unlimited once
/// resolved; only `None` inherits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpamPolicy {
    pub max_messages: Option<u64>,
    /// Window for `max_messages`, in seconds.
    pub max_messages_interval: Option<u64>,
    /// Refresh the message window on every message instead of letting it lapse.
    pub reset_on_continued_spam: bool,

    pub max_mentions: Option<u64>,
    pub max_role_mentions: Option<u64>,
    pub max_links: Option<u64>,
    pub max_attachments: Option<u64>,
    pub max_emojis: Option<u64>,
    pub max_newlines: Option<u64>,
    pub max_uppercase_percent: Option<u64>,
    /// Messages with fewer letters than this skip the uppercase check.
    pub min_uppercase_length: Option<u64>,
    pub max_characters: Option<u64>,
}

/// How a user's trust level is derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    /// Role id -> level. A member gets the highest level among their roles.
    pub roles: HashMap<String, i64>,
    /// User id -> level, overrides roles.
    pub users: HashMap<String, i64>,
    /// Level for members without any matching role.
    pub default: i64,
}

/// One row of the escalation table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationStep {
    /// `"mute"` or `"ban"`. Anything else is a configuration error.
    pub punishment: String,
    /// Duration string such as `"1h"`; empty means permanent.
    #[serde(default)]
    pub duration: String,
}

impl EscalationStep {
    pub fn new(punishment: &str, duration: &str) -> Self {
        Self {
            punishment: punishment.to_string(),
            duration: duration.to_string(),
        }
    }
}

/// Mass kick/ban protection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntiNukeConfig {
    pub enabled: bool,
    /// Removals allowed per window before the actor trips the limiter.
    pub max_removals: u64,
    /// Window as a duration string.
    pub window: String,
}

impl Default for AntiNukeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_removals: 5,
            window: "1m".to_string(),
        }
    }
}

/// Full automod policy for one guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildPolicy {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub guild_id: String,

    #[serde(default)]
    pub censor_levels: ThresholdTable<CensorPolicy>,
    #[serde(default)]
    pub spam_levels: ThresholdTable<SpamPolicy>,

    /// Channel id -> override.
    #[serde(default)]
    pub censor_channels: HashMap<String, CensorPolicy>,
    #[serde(default)]
    pub spam_channels: HashMap<String, SpamPolicy>,

    #[serde(default)]
    pub levels: LevelConfig,

    /// Users at or above this level are staff.
    #[serde(default = "default_staff_level")]
    pub staff_level: i64,
    #[serde(default = "default_true")]
    pub staff_bypass: bool,

    /// Cumulative strike weight -> punishment.
    #[serde(default)]
    pub escalation: ThresholdTable<EscalationStep>,

    /// How long an automod strike counts towards escalation.
    #[serde(default = "default_strike_duration")]
    pub strike_duration: String,

    /// Role given to muted members.
    #[serde(default)]
    pub mute_role: Option<String>,

    #[serde(default)]
    pub anti_nuke: AntiNukeConfig,
}

fn default_staff_level() -> i64 {
    100
}

fn default_true() -> bool {
    true
}

fn default_strike_duration() -> String {
    "1w".to_string()
}

impl GuildPolicy {
    /// Create an empty (automod disabled) policy.
    pub fn new(guild_id: impl Into<String>) -> Self {
        Self {
            id: None,
            guild_id: guild_id.into(),
            censor_levels: ThresholdTable::new(),
            spam_levels: ThresholdTable::new(),
            censor_channels: HashMap::new(),
            spam_channels: HashMap::new(),
            levels: LevelConfig::default(),
            staff_level: default_staff_level(),
            staff_bypass: true,
            escalation: ThresholdTable::new(),
            strike_duration: default_strike_duration(),
            mute_role: None,
            anti_nuke: AntiNukeConfig::default(),
        }
    }

    /// Automod is disabled when no level-scoped rules exist.
    pub fn automod_enabled(&self) -> bool {
        !self.censor_levels.is_empty() || !self.spam_levels.is_empty()
    }
}
