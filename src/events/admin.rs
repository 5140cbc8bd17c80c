//! Moderator-issued actions: bulk bans and strike pardons.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::EventReport;
use crate::bot::dispatcher::AppState;
use crate::database::models::AUTOMOD_ISSUER;
use crate::utils::parse_duration;

/// Ban a list of users, members or not.
#[derive(Debug, Clone, Deserialize)]
pub struct BulkBanRequest {
    pub guild_id: String,
    pub user_ids: Vec<String>,
    #[serde(default)]
    pub reason: String,
    /// How much message history to purge, as a duration string.
    #[serde(default)]
    pub purge: String,
}

/// Remove a user's strikes of one issuer.
#[derive(Debug, Clone, Deserialize)]
pub struct PardonRequest {
    pub guild_id: String,
    pub user_id: String,
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

fn default_issuer() -> String {
    AUTOMOD_ISSUER.to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct PardonReport {
    pub guild_id: String,
    pub user_id: String,
    pub issuer: String,
    pub removed: u64,
    /// Remaining active weight, when it could be read back.
    pub total_weight: Option<i64>,
}

pub async fn handle_bulk_ban(state: &AppState, request: &BulkBanRequest) -> anyhow::Result<EventReport> {
    if request.user_ids.is_empty() {
        return Ok(EventReport::ignored("no users to ban"));
    }

    let purge = if request.purge.trim().is_empty() {
        Duration::ZERO
    } else {
        parse_duration(&request.purge).unwrap_or_else(|| {
            warn!("Invalid purge window {:?}, purging nothing", request.purge);
            Duration::ZERO
        })
    };

    let reason = if request.reason.trim().is_empty() { "Bulk ban" } else { request.reason.as_str() };

    let report = state
        .escalation
        .ban_many(&request.guild_id, &request.user_ids, reason, purge)
        .await;

    Ok(EventReport::BulkBan(report))
}

pub async fn handle_pardon(state: &AppState, request: &PardonRequest) -> anyhow::Result<EventReport> {
    let removed = state
        .escalation
        .pardon(&request.guild_id, &request.user_id, &request.issuer)
        .await?;

    let total_weight = match state.escalation.total_weight(&request.guild_id, &request.user_id).await {
        Ok(total) => Some(total),
        Err(e) => {
            warn!("Failed to read back strikes for {}: {}", request.user_id, e);
            None
        }
    };

    Ok(EventReport::Pardon(PardonReport {
        guild_id: request.guild_id.clone(),
        user_id: request.user_id.clone(),
        issuer: request.issuer.clone(),
        removed,
        total_weight,
    }))
}
