//! Guild policy repository with hot caching.
//!
//! Read on every message, so cached with a 10min TTL. Guilds without a
//! stored document get a disabled default, which is cached as well.

use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::debug;

use crate::cache::{CacheConfig, CacheRegistry, CacheTypeMismatch, TypedCache};
use crate::database::Database;
use crate::database::models::GuildPolicy;
use crate::database::mongo::POLICIES_COLLECTION;
use crate::error::StoreError;
use crate::stores::PolicyStore;

/// Repository for per-guild automod policies.
pub struct PolicyRepository {
    collection: Collection<GuildPolicy>,
    cache: TypedCache<String, GuildPolicy>,
}

impl PolicyRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Result<Self, CacheTypeMismatch> {
        let policy_cache = cache.get_or_create("guild_policy", CacheConfig::guild_policy())?;

        Ok(Self {
            collection: db.collection(POLICIES_COLLECTION),
            cache: policy_cache,
        })
    }
}

#[async_trait]
impl PolicyStore for PolicyRepository {
    async fn get_policy(&self, guild_id: &str) -> Result<GuildPolicy, StoreError> {
        let key = guild_id.to_string();
        if let Some(policy) = self.cache.get(&key) {
            return Ok(policy);
        }

        let filter = doc! { "guild_id": guild_id };
        let policy = match self.collection.find_one(filter).await? {
            Some(policy) => policy,
            None => {
                debug!("No automod policy stored for guild {}", guild_id);
                GuildPolicy::new(guild_id)
            }
        };

        self.cache.insert(key, policy.clone());
        Ok(policy)
    }
}
