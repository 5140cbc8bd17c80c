//! Message moderation handler.
//!
//! Evaluates a message and, when it fails, deletes it and records a strike.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{EventReport, load_policy};
use crate::automod::{EscalationOutcome, Verdict, Violation};
use crate::bot::dispatcher::AppState;
use crate::database::models::AUTOMOD_ISSUER;
use crate::error::GatewayError;
use crate::message::IncomingMessage;

/// What was decided for one message.
#[derive(Debug, Clone, Serialize)]
pub struct ModerationReport {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub verdict: Verdict,
    pub deleted: bool,
    pub escalation: Option<EscalationOutcome>,
    /// Actuation failures. The verdict and strike stand regardless.
    pub errors: Vec<String>,
}

pub async fn handle_message(state: &AppState, msg: &IncomingMessage) -> anyhow::Result<EventReport> {
    if msg.author.bot {
        return Ok(EventReport::ignored("bot author"));
    }
    if msg.guild_id.is_empty() {
        return Ok(EventReport::ignored("direct message"));
    }
    if state.owners.is_owner(&msg.author.id) {
        debug!("Owner {} bypasses automod", msg.author.id);
        return Ok(EventReport::ignored("owner"));
    }

    let Some(policy) = load_policy(state, &msg.guild_id).await else {
        return Ok(EventReport::ignored("policy unavailable"));
    };

    let verdict = state.evaluator.evaluate(msg, &policy).await;

    let mut report = ModerationReport {
        guild_id: msg.guild_id.clone(),
        channel_id: msg.channel_id.clone(),
        message_id: msg.id.clone(),
        user_id: msg.author.id.clone(),
        verdict: verdict.clone(),
        deleted: false,
        escalation: None,
        errors: Vec::new(),
    };

    if verdict.ok {
        return Ok(EventReport::Moderation(report));
    }

    info!(
        target: "vigil::audit",
        guild = %msg.guild_id,
        channel = %msg.channel_id,
        user = %msg.author.id,
        "Automod violation: {}",
        verdict.reason_code
    );

    match delete_message(state, msg).await {
        Ok(()) => report.deleted = true,
        Err(e) => {
            warn!("Failed to delete message {} in {}: {}", msg.id, msg.channel_id, e);
            report.errors.push(format!("delete: {}", e));
        }
    }

    let outcome = state
        .escalation
        .record_violation(
            &policy,
            Violation {
                guild_id: msg.guild_id.clone(),
                user_id: msg.author.id.clone(),
                issuer: AUTOMOD_ISSUER.to_string(),
                weight: verdict.weight,
                rule: verdict.rule,
                reason: verdict.reason_code.clone(),
                channel_id: Some(msg.channel_id.clone()),
            },
        )
        .await;

    report.escalation = Some(outcome);
    Ok(EventReport::Moderation(report))
}

async fn delete_message(state: &AppState, msg: &IncomingMessage) -> Result<(), GatewayError> {
    let result = tokio::time::timeout(state.timeout, state.gateway.delete_message(&msg.channel_id, &msg.id)).await;
    match result {
        // Already gone counts as deleted.
        Ok(Ok(())) | Ok(Err(GatewayError::AlreadyApplied)) | Ok(Err(GatewayError::NotFound(_))) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(GatewayError::Transport("delete timed out".to_string())),
    }
}
