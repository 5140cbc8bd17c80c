//! Collaborator interfaces consumed by the engine.
//!
//! Concrete implementations live in `database` (MongoDB) and `cache`
//! (in-process counters). Every call is wrapped in [`with_deadline`].

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::database::models::{GuildPolicy, StrikeRecord, UntrustworthyEntry};
use crate::error::StoreError;

/// Key-value store with TTL semantics backing rate limiting.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError>;

    async fn set(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Increment (creating at 0 without TTL if missing) and return the new value.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Set the TTL of an existing key. Returns false if the key is missing.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    async fn del(&self, key: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Policy for a guild; a disabled default when none is stored.
    async fn get_policy(&self, guild_id: &str) -> Result<GuildPolicy, StoreError>;
}

#[async_trait]
pub trait StrikeStore: Send + Sync {
    async fn add_strike(&self, record: &StrikeRecord) -> Result<(), StoreError>;

    async fn get_strikes_for_user(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<Vec<StrikeRecord>, StoreError>;

    /// Delete a user's strikes issued by `issuer`. Returns how many were removed.
    async fn delete_strikes_of_type(
        &self,
        guild_id: &str,
        user_id: &str,
        issuer: &str,
    ) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait UntrustworthyContentStore: Send + Sync {
    async fn lookup(&self, fragment: &str) -> Result<Option<UntrustworthyEntry>, StoreError>;
}

/// Run a store call under a deadline, mapping elapsed deadlines to
/// [`StoreError::Timeout`].
pub async fn with_deadline<T, F>(deadline: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<(), _> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), async { Ok::<_, StoreError>(5) }).await;
        assert_eq!(result.unwrap(), 5);
    }
}
