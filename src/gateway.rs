//! Chat gateway actuation interface.
//!
//! The engine never speaks the gateway wire protocol. It only asks for
//! punishments through this trait.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::GatewayError;

/// Minimal member view used to detect already-applied punishments.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Member {
    pub user_id: String,
    pub roles: Vec<String>,
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), GatewayError>;

    async fn add_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), GatewayError>;

    async fn remove_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), GatewayError>;

    /// Ban a user; works for non-members too (hackban).
    async fn ban(
        &self,
        guild_id: &str,
        user_id: &str,
        reason: &str,
        purge_window: Duration,
    ) -> Result<(), GatewayError>;

    async fn unban(&self, guild_id: &str, user_id: &str, reason: &str) -> Result<(), GatewayError>;

    /// `Ok(None)` when the user is not a member of the guild.
    async fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<Option<Member>, GatewayError>;

    async fn send_direct_message(&self, user_id: &str, content: &str) -> Result<(), GatewayError>;
}

/// Gateway that only logs what it would do.
///
/// Used when the process answers decisions back to the caller, which owns
/// the real chat connection.
#[derive(Debug, Default, Clone)]
pub struct DryRunGateway;

#[async_trait]
impl ChatGateway for DryRunGateway {
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), GatewayError> {
        info!("[dry-run] delete message {} in channel {}", message_id, channel_id);
        Ok(())
    }

    async fn add_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), GatewayError> {
        info!("[dry-run] add role {} to {} in guild {}", role_id, user_id, guild_id);
        Ok(())
    }

    async fn remove_role(&self, guild_id: &str, user_id: &str, role_id: &str) -> Result<(), GatewayError> {
        info!("[dry-run] remove role {} from {} in guild {}", role_id, user_id, guild_id);
        Ok(())
    }

    async fn ban(
        &self,
        guild_id: &str,
        user_id: &str,
        reason: &str,
        purge_window: Duration,
    ) -> Result<(), GatewayError> {
        info!(
            "[dry-run] ban {} in guild {} (reason: {}, purge {:?})",
            user_id, guild_id, reason, purge_window
        );
        Ok(())
    }

    async fn unban(&self, guild_id: &str, user_id: &str, reason: &str) -> Result<(), GatewayError> {
        info!("[dry-run] unban {} in guild {} (reason: {})", user_id, guild_id, reason);
        Ok(())
    }

    async fn fetch_member(&self, _guild_id: &str, _user_id: &str) -> Result<Option<Member>, GatewayError> {
        Ok(None)
    }

    async fn send_direct_message(&self, user_id: &str, content: &str) -> Result<(), GatewayError> {
        info!("[dry-run] DM to {}: {}", user_id, content);
        Ok(())
    }
}
