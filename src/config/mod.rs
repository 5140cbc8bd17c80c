//! Configuration module for Vigil.
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Where gateway events come from.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Newline-delimited JSON on stdin, reports on stdout.
    #[default]
    Stdin,
    /// HTTP ingest (`POST /events`).
    Webhook,
}

/// Where rate-limit counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterBackend {
    /// Shared across instances and restarts.
    #[default]
    Mongo,
    /// In-process only; counters reset on restart.
    Memory,
}

impl CounterBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_lowercase().as_str() {
            "" | "mongo" | "mongodb" => Ok(Self::Mongo),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::InvalidVar {
                name: "COUNTER_STORE",
                value: other.to_string(),
            }),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub event_source: EventSource,
    pub webhook_port: u16,

    /// Shared secret expected in the `x-vigil-secret` header.
    pub webhook_secret: Option<String>,

    /// Users that bypass automod everywhere.
    pub owner_ids: Vec<String>,

    // MongoDB
    pub mongodb_uri: String,
    pub mongodb_database: String,

    /// Spam exemptions granted after a message-rate strike.
    pub strike_cushioning: u32,

    /// Deadline for every external store call.
    pub store_timeout: Duration,

    pub counter_backend: CounterBackend,

    /// Capacity hint for the in-process counter store.
    pub counter_capacity: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let event_source = match env::var("EVENT_SOURCE")
            .unwrap_or_else(|_| "stdin".to_string())
            .to_lowercase()
            .as_str()
        {
            "webhook" => EventSource::Webhook,
            "stdin" => EventSource::Stdin,
            other => {
                return Err(ConfigError::InvalidVar {
                    name: "EVENT_SOURCE",
                    value: other.to_string(),
                });
            }
        };

        let owner_ids = env::var("OWNER_IDS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let webhook_secret = env::var("WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self {
            event_source,
            webhook_port: parse_var("WEBHOOK_PORT", 8080)?,
            webhook_secret,
            owner_ids,
            mongodb_uri: env::var("MONGODB_URI").map_err(|_| ConfigError::MissingVar("MONGODB_URI"))?,
            mongodb_database: env::var("MONGODB_DATABASE").unwrap_or_else(|_| "vigil".to_string()),
            strike_cushioning: parse_var("STRIKE_CUSHIONING", 2)?,
            store_timeout: Duration::from_millis(parse_var("STORE_TIMEOUT_MS", 3000)?),
            counter_backend: CounterBackend::parse(&env::var("COUNTER_STORE").unwrap_or_default())?,
            counter_capacity: parse_var("COUNTER_CAPACITY", 100_000)?,
        })
    }
}

/// Parse an optional numeric variable, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidVar { name, value: raw }),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_default_when_unset() {
        let value: u32 = parse_var("VIGIL_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn test_counter_backend() {
        assert_eq!(CounterBackend::parse("").unwrap(), CounterBackend::Mongo);
        assert_eq!(CounterBackend::parse(" Memory ").unwrap(), CounterBackend::Memory);
        assert!(CounterBackend::parse("redis").is_err());
    }
}
