//! Shared rate-limit counters in MongoDB.
//!
//! One document per counter key. A TTL index on `expires_at` reaps old
//! windows, but the reaper only runs about once a minute, so every read
//! also treats a past `expires_at` as missing.

use std::time::Duration;

use async_trait::async_trait;
use mongodb::Collection;
use mongodb::bson::{Bson, DateTime, doc};
use mongodb::options::ReturnDocument;
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::database::mongo::COUNTERS_COLLECTION;
use crate::error::StoreError;
use crate::stores::CacheStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Counter {
    #[serde(rename = "_id")]
    key: String,
    value: i64,
    #[serde(default)]
    expires_at: Option<DateTime>,
}

pub struct CounterRepository {
    collection: Collection<Counter>,
}

impl CounterRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COUNTERS_COLLECTION),
        }
    }
}

fn deadline(ttl: Duration) -> DateTime {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    DateTime::from_millis(DateTime::now().timestamp_millis().saturating_add(ttl_ms))
}

#[async_trait]
impl CacheStore for CounterRepository {
    async fn get(&self, key: &str) -> Result<Option<i64>, StoreError> {
        let filter = doc! {
            "_id": key,
            "$or": [
                { "expires_at": null },
                { "expires_at": { "$gt": DateTime::now() } },
            ],
        };
        Ok(self.collection.find_one(filter).await?.map(|counter| counter.value))
    }

    async fn set(&self, key: &str, value: i64, ttl: Option<Duration>) -> Result<(), StoreError> {
        let expires_at = ttl.map(deadline).map_or(Bson::Null, Bson::DateTime);
        self.collection
            .update_one(
                doc! { "_id": key },
                doc! { "$set": { "value": value, "expires_at": expires_at } },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        // A lapsed window the reaper has not removed yet starts over.
        self.collection
            .delete_one(doc! { "_id": key, "expires_at": { "$lte": DateTime::now() } })
            .await?;

        let counter = self
            .collection
            .find_one_and_update(
                doc! { "_id": key },
                doc! {
                    "$inc": { "value": 1_i64 },
                    "$setOnInsert": { "expires_at": Bson::Null },
                },
            )
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;

        counter
            .map(|counter| counter.value)
            .ok_or_else(|| StoreError::Database(format!("counter {} missing after upsert", key)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError> {
        let result = self
            .collection
            .update_one(
                doc! { "_id": key },
                doc! { "$set": { "expires_at": deadline(ttl) } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn del(&self, key: &str) -> Result<(), StoreError> {
        self.collection.delete_one(doc! { "_id": key }).await?;
        Ok(())
    }
}
