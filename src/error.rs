//! Error types for the collaborator seams.
//!
//! Application edges use `anyhow`; everything that talks to a store or the
//! chat gateway returns one of these so callers can decide between failing
//! open and reporting.

use std::time::Duration;

/// Errors from external stores (counter cache, MongoDB).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Errors from punishment actuation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The punishment is already in effect (user already banned, role already held).
    #[error("already applied")]
    AlreadyApplied,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("missing permissions: {0}")]
    Forbidden(String),

    #[error("gateway transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Whether this error should be treated as a successful actuation.
    pub fn is_already_applied(&self) -> bool {
        matches!(self, Self::AlreadyApplied)
    }
}

/// Errors while loading process configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    MissingVar(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },
}
