//! Anti-nuke handler for kick/ban audit entries.

use serde::Serialize;
use tracing::warn;

use super::{EventReport, load_policy};
use crate::bot::dispatcher::AppState;
use crate::message::{AuditAction, AuditEntry};

#[derive(Debug, Clone, Serialize)]
pub struct AntiNukeReport {
    pub guild_id: String,
    pub actor_id: String,
    pub action: AuditAction,
    /// Removals by this actor in the current window.
    pub count: i64,
    pub limit: u64,
    /// The actor went over the limit.
    pub tripped: bool,
}

pub async fn handle_member_remove(state: &AppState, entry: &AuditEntry) -> anyhow::Result<EventReport> {
    if !entry.action.is_member_removal() {
        return Ok(EventReport::ignored("not a member removal"));
    }

    let Some(policy) = load_policy(state, &entry.guild_id).await else {
        return Ok(EventReport::ignored("policy unavailable"));
    };

    let Some(check) = state.antinuke.observe(&policy.anti_nuke, entry).await else {
        return Ok(EventReport::ignored("anti-nuke disabled"));
    };

    if !check.ok {
        warn!(
            target: "vigil::audit",
            guild = %entry.guild_id,
            actor = %entry.actor_id,
            "Anti-nuke tripped: {} removals in {} (limit {})",
            check.count, policy.anti_nuke.window, policy.anti_nuke.max_removals
        );
    }

    Ok(EventReport::AntiNuke(AntiNukeReport {
        guild_id: entry.guild_id.clone(),
        actor_id: entry.actor_id.clone(),
        action: entry.action,
        count: check.count,
        limit: policy.anti_nuke.max_removals,
        tripped: !check.ok,
    }))
}
