//! Strike repository.
//!
//! Not cached: escalation needs the current total right after a write.

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::debug;

use crate::database::Database;
use crate::database::models::StrikeRecord;
use crate::database::mongo::STRIKES_COLLECTION;
use crate::error::StoreError;
use crate::stores::StrikeStore;

pub struct StrikeRepository {
    collection: Collection<StrikeRecord>,
}

impl StrikeRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(STRIKES_COLLECTION),
        }
    }
}

#[async_trait]
impl StrikeStore for StrikeRepository {
    async fn add_strike(&self, record: &StrikeRecord) -> Result<(), StoreError> {
        self.collection.insert_one(record).await?;
        debug!("Stored strike {} for user {} in guild {}", record.uuid, record.user_id, record.guild_id);
        Ok(())
    }

    /// Only strikes that have not expired yet.
    async fn get_strikes_for_user(&self, guild_id: &str, user_id: &str) -> Result<Vec<StrikeRecord>, StoreError> {
        let now = Utc::now().timestamp();
        let filter = doc! {
            "guild_id": guild_id,
            "user_id": user_id,
            "$or": [
                { "expires_at": null },
                { "expires_at": { "$gt": now } },
            ],
        };

        let mut cursor = self.collection.find(filter).await?;
        let mut strikes = Vec::new();

        while let Some(result) = cursor.next().await {
            strikes.push(result?);
        }

        Ok(strikes)
    }

    async fn delete_strikes_of_type(&self, guild_id: &str, user_id: &str, issuer: &str) -> Result<u64, StoreError> {
        let filter = doc! { "guild_id": guild_id, "user_id": user_id, "issuer": issuer };
        let result = self.collection.delete_many(filter).await?;
        Ok(result.deleted_count)
    }
}
