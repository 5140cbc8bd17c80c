//! Event handler system.
//!
//! Every inbound gateway event is handled independently and produces one
//! [`EventReport`] describing what was decided.

pub mod admin;
pub mod member_remove;
pub mod message;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::automod::escalation::BulkBanReport;
use crate::bot::dispatcher::AppState;
use crate::database::models::GuildPolicy;
use crate::message::{AuditEntry, IncomingMessage};
use crate::stores::with_deadline;

pub use admin::{BulkBanRequest, PardonReport, PardonRequest};
pub use member_remove::AntiNukeReport;
pub use message::ModerationReport;

/// Events accepted from the chat gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    MessageCreate(IncomingMessage),
    /// Audit log entry for a kick or ban.
    MemberRemove(AuditEntry),
    BulkBan(BulkBanRequest),
    Pardon(PardonRequest),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventReport {
    Moderation(ModerationReport),
    AntiNuke(AntiNukeReport),
    BulkBan(BulkBanReport),
    Pardon(PardonReport),
    Ignored { reason: String },
}

impl EventReport {
    pub fn ignored(reason: &str) -> Self {
        Self::Ignored {
            reason: reason.to_string(),
        }
    }
}

/// Route one event to its handler.
pub async fn handle_event(state: &AppState, event: GatewayEvent) -> anyhow::Result<EventReport> {
    match event {
        GatewayEvent::MessageCreate(msg) => message::handle_message(state, &msg).await,
        GatewayEvent::MemberRemove(entry) => member_remove::handle_member_remove(state, &entry).await,
        GatewayEvent::BulkBan(request) => admin::handle_bulk_ban(state, &request).await,
        GatewayEvent::Pardon(request) => admin::handle_pardon(state, &request).await,
    }
}

/// Load a guild's policy. `None` when the policy store is unavailable;
/// moderation then stands down for this event.
async fn load_policy(state: &AppState, guild_id: &str) -> Option<GuildPolicy> {
    match with_deadline(state.timeout, state.policies.get_policy(guild_id)).await {
        Ok(policy) => Some(policy),
        Err(e) => {
            warn!("Failed to load policy for guild {}: {}", guild_id, e);
            None
        }
    }
}
