//! MongoDB database wrapper.

use std::time::Duration;

use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

pub const POLICIES_COLLECTION: &str = "automod_policies";
pub const STRIKES_COLLECTION: &str = "strikes";
pub const UNTRUSTWORTHY_COLLECTION: &str = "untrustworthy_content";
pub const COUNTERS_COLLECTION: &str = "rate_counters";

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection fails.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Create the indexes the repositories query by.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        let unique = IndexOptions::builder().unique(true).build();

        self.collection::<Document>(POLICIES_COLLECTION)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "guild_id": 1 })
                    .options(unique.clone())
                    .build(),
            )
            .await?;

        let strikes = self.collection::<Document>(STRIKES_COLLECTION);
        strikes
            .create_index(IndexModel::builder().keys(doc! { "guild_id": 1, "user_id": 1 }).build())
            .await?;
        strikes
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "uuid": 1 })
                    .options(unique)
                    .build(),
            )
            .await?;

        // Expire counters at their own `expires_at`.
        self.collection::<Document>(COUNTERS_COLLECTION)
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "expires_at": 1 })
                    .options(IndexOptions::builder().expire_after(Duration::ZERO).build())
                    .build(),
            )
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }
}
