//! Strike escalation.
//!
//! Every violation becomes a weighted strike. The sum of a user's active
//! strike weights is looked up in the guild's escalation table and the
//! largest threshold at or below it picks the punishment.
//!
//! Strikes are audit facts: a failed punishment never rolls one back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::cushioning::CushioningState;
use super::verdict::Rule;
use crate::database::models::{EscalationStep, GuildPolicy, StrikeRecord, active_weight};
use crate::error::{GatewayError, StoreError};
use crate::gateway::ChatGateway;
use crate::stores::{StrikeStore, with_deadline};
use crate::utils::{format_duration_full, parse_duration};

/// Strike lifetime used when the guild's `strike_duration` does not parse.
const FALLBACK_STRIKE_DURATION: Duration = Duration::from_secs(7 * 24 * 3600);

/// Concurrent actuations in [`EscalationEngine::ban_many`].
const BULK_CONCURRENCY: usize = 8;

/// One violation to be turned into a strike.
#[derive(Debug, Clone)]
pub struct Violation {
    pub guild_id: String,
    pub user_id: String,
    /// `"automod"` or a moderator id.
    pub issuer: String,
    pub weight: i64,
    /// Rule that fired; `None` for manual strikes.
    pub rule: Option<Rule>,
    pub reason: String,
    pub channel_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PunishmentKind {
    Mute,
    Ban,
}

impl PunishmentKind {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mute" => Some(Self::Mute),
            "ban" => Some(Self::Ban),
            _ => None,
        }
    }
}

/// Punishment picked from the escalation table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PunishmentDecision {
    pub kind: PunishmentKind,
    /// Threshold of the table row that matched.
    pub threshold: i64,
    /// Seconds; `None` means permanent.
    pub duration_secs: Option<u64>,
    /// Unix timestamp when the punishment should be lifted.
    pub expires_at: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrikeSummary {
    pub strike: StrikeRecord,
    /// False when the strike could not be written.
    pub persisted: bool,
    pub total_weight: i64,
    pub decision: Option<PunishmentDecision>,
    /// Punishment that could not be applied.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EscalationOutcome {
    /// Absorbed by cushioning; no strike issued.
    Cushioned,
    Recorded(StrikeSummary),
}

impl EscalationOutcome {
    pub fn decision(&self) -> Option<&PunishmentDecision> {
        match self {
            Self::Cushioned => None,
            Self::Recorded(summary) => summary.decision.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkBanReport {
    pub banned: Vec<String>,
    /// `(user id, error)` pairs.
    pub failed: Vec<(String, String)>,
}

#[derive(Clone)]
pub struct EscalationEngine {
    strikes: Arc<dyn StrikeStore>,
    gateway: Arc<dyn ChatGateway>,
    cushioning: CushioningState,
    strike_cushioning: u32,
    timeout: Duration,
}

impl EscalationEngine {
    pub fn new(
        strikes: Arc<dyn StrikeStore>,
        gateway: Arc<dyn ChatGateway>,
        strike_cushioning: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            strikes,
            gateway,
            cushioning: CushioningState::new(),
            strike_cushioning,
            timeout,
        }
    }

    pub fn cushioning(&self) -> &CushioningState {
        &self.cushioning
    }

    /// Record a violation and apply whatever punishment the new total reaches.
    pub async fn record_violation(&self, policy: &GuildPolicy, violation: Violation) -> EscalationOutcome {
        if violation.rule.is_some_and(Rule::is_message_rate)
            && self.cushioning.consume(
                &violation.guild_id,
                &violation.user_id,
                Instant::now(),
                self.strike_cushioning,
            )
        {
            debug!(
                "Cushioned message-rate violation for {} in guild {}",
                violation.user_id, violation.guild_id
            );
            return EscalationOutcome::Cushioned;
        }

        let strike = StrikeRecord::new(
            &violation.guild_id,
            &violation.user_id,
            &violation.issuer,
            violation.weight,
            &violation.reason,
            Some(strike_ttl(policy).as_secs()),
        );

        let persisted = match with_deadline(self.timeout, self.strikes.add_strike(&strike)).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to store strike for {} in guild {}: {}", strike.user_id, strike.guild_id, e);
                false
            }
        };

        let total_weight = self
            .current_weight(&violation.guild_id, &violation.user_id, &strike, persisted)
            .await;

        info!(
            target: "vigil::audit",
            guild = %violation.guild_id,
            user = %violation.user_id,
            channel = violation.channel_id.as_deref().unwrap_or("-"),
            "Strike +{} ({}) by {}, total {}",
            strike.weight, strike.reason, strike.issuer, total_weight
        );

        let mut errors = Vec::new();
        let decision = match policy.escalation.floor(total_weight) {
            Some((threshold, step)) => decide(threshold, step, &violation.guild_id),
            None => None,
        };

        if let Some(decision) = &decision {
            if let Err(e) = self.apply(policy, &violation, decision).await {
                warn!(
                    target: "vigil::audit",
                    guild = %violation.guild_id,
                    user = %violation.user_id,
                    "Escalation failed"
                );
                warn!("Failed to apply {:?} to {}: {}", decision.kind, violation.user_id, e);
                errors.push(e);
            } else {
                info!(
                    target: "vigil::audit",
                    guild = %violation.guild_id,
                    user = %violation.user_id,
                    "Escalated to {:?} for {} at weight {}",
                    decision.kind,
                    format_duration_full(decision.duration_secs.unwrap_or(0)),
                    total_weight
                );
            }
        }

        EscalationOutcome::Recorded(StrikeSummary {
            strike,
            persisted,
            total_weight,
            decision,
            errors,
        })
    }

    /// Sum of active strike weights, counting `strike` even if it was not
    /// persisted. Falls back to the new strike alone when history is
    /// unavailable.
    async fn current_weight(&self, guild_id: &str, user_id: &str, strike: &StrikeRecord, persisted: bool) -> i64 {
        let now = Utc::now().timestamp();
        match with_deadline(self.timeout, self.strikes.get_strikes_for_user(guild_id, user_id)).await {
            Ok(history) => {
                let total = active_weight(&history, now);
                if persisted { total } else { total + strike.weight.max(0) }
            }
            Err(e) => {
                warn!("Failed to load strikes for {} in guild {}: {}", user_id, guild_id, e);
                strike.weight.max(0)
            }
        }
    }

    async fn apply(&self, policy: &GuildPolicy, violation: &Violation, decision: &PunishmentDecision) -> Result<(), String> {
        let guild_id = violation.guild_id.as_str();
        let user_id = violation.user_id.as_str();

        let result = match decision.kind {
            PunishmentKind::Mute => {
                let Some(role) = policy.mute_role.as_deref() else {
                    error!("Guild {} escalates to mute but has no mute role configured", guild_id);
                    return Err("no mute role configured".to_string());
                };
                self.mute(guild_id, user_id, role).await
            }
            PunishmentKind::Ban => {
                let reason = format!("Automatic ban at strike weight threshold {}", decision.threshold);
                self.actuate(self.gateway.ban(guild_id, user_id, &reason, Duration::ZERO))
                    .await
            }
        };

        match result {
            Ok(()) | Err(GatewayError::AlreadyApplied) => Ok(()),
            Err(e) => Err(e.to_string()),
        }
    }

    async fn mute(&self, guild_id: &str, user_id: &str, role: &str) -> Result<(), GatewayError> {
        match self.actuate(self.gateway.fetch_member(guild_id, user_id)).await {
            Ok(Some(member)) if member.roles.iter().any(|r| r == role) => {
                debug!("User {} already muted in guild {}", user_id, guild_id);
                return Ok(());
            }
            Ok(Some(_)) => {}
            Ok(None) => return Err(GatewayError::NotFound(format!("member {}", user_id))),
            // Could not check; try the role anyway.
            Err(e) => debug!("Could not fetch member {}: {}", user_id, e),
        }

        self.actuate(self.gateway.add_role(guild_id, user_id, role)).await
    }

    async fn actuate<T, F>(&self, fut: F) -> Result<T, GatewayError>
    where
        F: std::future::Future<Output = Result<T, GatewayError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Transport(format!("timed out after {:?}", self.timeout))),
        }
    }

    /// Ban many users at once, including non-members. Already banned users
    /// count as banned.
    pub async fn ban_many(&self, guild_id: &str, user_ids: &[String], reason: &str, purge_window: Duration) -> BulkBanReport {
        let results = stream::iter(user_ids.iter().cloned())
            .map(|user_id| async move {
                let result = self
                    .actuate(self.gateway.ban(guild_id, &user_id, reason, purge_window))
                    .await;
                (user_id, result)
            })
            .buffer_unordered(BULK_CONCURRENCY)
            .collect::<Vec<_>>()
            .await;

        let mut report = BulkBanReport::default();
        for (user_id, result) in results {
            match result {
                Ok(()) => report.banned.push(user_id),
                Err(e) if e.is_already_applied() => report.banned.push(user_id),
                Err(e) => report.failed.push((user_id, e.to_string())),
            }
        }

        info!(
            target: "vigil::audit",
            guild = %guild_id,
            "Bulk ban: {} banned, {} failed ({})",
            report.banned.len(),
            report.failed.len(),
            reason
        );

        report
    }

    /// Remove a user's strikes issued by `issuer`.
    pub async fn pardon(&self, guild_id: &str, user_id: &str, issuer: &str) -> Result<u64, StoreError> {
        let removed = with_deadline(
            self.timeout,
            self.strikes.delete_strikes_of_type(guild_id, user_id, issuer),
        )
        .await?;

        info!(
            target: "vigil::audit",
            guild = %guild_id,
            user = %user_id,
            "Pardoned {} strike(s) issued by {}",
            removed, issuer
        );
        Ok(removed)
    }

    pub async fn total_weight(&self, guild_id: &str, user_id: &str) -> Result<i64, StoreError> {
        let history = with_deadline(self.timeout, self.strikes.get_strikes_for_user(guild_id, user_id)).await?;
        Ok(active_weight(&history, Utc::now().timestamp()))
    }
}

fn strike_ttl(policy: &GuildPolicy) -> Duration {
    match parse_duration(&policy.strike_duration) {
        Some(ttl) if !ttl.is_zero() => ttl,
        _ => {
            warn!(
                "Invalid strike duration {:?} in guild {}, using 1 week",
                policy.strike_duration, policy.guild_id
            );
            FALLBACK_STRIKE_DURATION
        }
    }
}

fn decide(threshold: i64, step: &EscalationStep, guild_id: &str) -> Option<PunishmentDecision> {
    let Some(kind) = PunishmentKind::parse(&step.punishment) else {
        error!(
            "Unknown punishment {:?} at threshold {} in guild {}, ignoring",
            step.punishment, threshold, guild_id
        );
        return None;
    };

    let duration = if step.duration.trim().is_empty() {
        None
    } else {
        match parse_duration(&step.duration) {
            Some(d) if !d.is_zero() => Some(d),
            Some(_) => None,
            None => {
                warn!(
                    "Invalid punishment duration {:?} in guild {}, treating as permanent",
                    step.duration, guild_id
                );
                None
            }
        }
    };

    let duration_secs = duration.map(|d| d.as_secs());
    Some(PunishmentDecision {
        kind,
        threshold,
        duration_secs,
        expires_at: duration_secs.map(|secs| Utc::now().timestamp() + secs as i64),
    })
}
