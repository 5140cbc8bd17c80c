//! Untrustworthy content repository.
//!
//! The whole collection is small and curated, so it is loaded as one
//! compiled snapshot and refreshed every 5 minutes.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use mongodb::Collection;
use mongodb::bson::doc;
use tracing::{debug, warn};

use crate::cache::{CacheConfig, CacheRegistry, CacheTypeMismatch, TypedCache};
use crate::database::Database;
use crate::database::models::{UntrustworthyEntry, UntrustworthySet};
use crate::database::mongo::UNTRUSTWORTHY_COLLECTION;
use crate::error::StoreError;
use crate::stores::UntrustworthyContentStore;

const SNAPSHOT_KEY: &str = "all";

pub struct UntrustworthyRepository {
    collection: Collection<UntrustworthyEntry>,
    cache: TypedCache<&'static str, Arc<UntrustworthySet>>,
}

impl UntrustworthyRepository {
    pub fn new(db: &Database, cache: &CacheRegistry) -> Result<Self, CacheTypeMismatch> {
        let snapshot_cache = cache.get_or_create("untrustworthy_snapshot", CacheConfig::untrustworthy_snapshot())?;

        Ok(Self {
            collection: db.collection(UNTRUSTWORTHY_COLLECTION),
            cache: snapshot_cache,
        })
    }

    async fn snapshot(&self) -> Result<Arc<UntrustworthySet>, StoreError> {
        if let Some(set) = self.cache.get(&SNAPSHOT_KEY) {
            return Ok(set);
        }

        let mut cursor = self.collection.find(doc! {}).await?;
        let mut entries = Vec::new();

        while let Some(result) = cursor.next().await {
            match result {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping malformed untrustworthy entry: {}", e),
            }
        }

        let set = Arc::new(UntrustworthySet::build(entries));
        debug!("Loaded {} untrustworthy entries", set.len());

        self.cache.insert(SNAPSHOT_KEY, set.clone());
        Ok(set)
    }
}

#[async_trait]
impl UntrustworthyContentStore for UntrustworthyRepository {
    async fn lookup(&self, fragment: &str) -> Result<Option<UntrustworthyEntry>, StoreError> {
        let set = self.snapshot().await?;
        Ok(set.find(fragment).cloned())
    }
}
