//! Inbound chat events as seen by the engine.

use serde::{Deserialize, Serialize};

/// Message author.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Author {
    pub id: String,
    #[serde(default)]
    pub bot: bool,
    /// Role ids held by the author in this guild.
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    #[serde(default)]
    pub url: String,
}

/// A guild message, already fetched by the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: String,
    /// Empty for direct messages.
    #[serde(default)]
    pub guild_id: String,
    pub channel_id: String,
    pub author: Author,
    #[serde(default)]
    pub content: String,
    /// Mentioned user ids.
    #[serde(default)]
    pub mentions: Vec<String>,
    /// Mentioned role ids.
    #[serde(default)]
    pub role_mentions: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl IncomingMessage {
    /// Build a plain text message, mostly for tests and tooling.
    pub fn text(guild_id: &str, channel_id: &str, author_id: &str, content: &str) -> Self {
        Self {
            id: "0".to_string(),
            guild_id: guild_id.to_string(),
            channel_id: channel_id.to_string(),
            author: Author {
                id: author_id.to_string(),
                ..Default::default()
            },
            content: content.to_string(),
            ..Default::default()
        }
    }
}

/// Audit log action types the anti-nuke limiter cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Kick,
    Ban,
    #[serde(other)]
    Other,
}

impl AuditAction {
    pub fn is_member_removal(self) -> bool {
        matches!(self, Self::Kick | Self::Ban)
    }
}

/// One membership-removal audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub guild_id: String,
    /// Who performed the action.
    pub actor_id: String,
    pub target_id: String,
    pub action: AuditAction,
    /// Unix timestamp of the action.
    #[serde(default)]
    pub timestamp: i64,
}
