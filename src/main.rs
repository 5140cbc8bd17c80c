//! Vigil - Automod decision engine for chat guilds
//!
//! Evaluates guild messages against layered moderation policy, keeps a
//! weighted strike history and decides escalating punishments.
//!
//! ## Architecture
//!
//! - `config` - Environment configuration
//! - `database` - MongoDB models and repositories
//! - `cache` - Moka caches and the in-process counter store
//! - `permissions` - Trust levels and owners
//! - `automod` - Policy resolution, checks, rate limits, escalation
//! - `events` - Event handlers (messages, member removals)
//! - `bot` - State wiring and event ingest (stdin or webhook)
//! - `utils` - Utility functions

mod automod;
mod bot;
mod cache;
mod config;
mod database;
mod error;
mod events;
mod gateway;
mod message;
mod permissions;
mod stores;
mod utils;

#[cfg(test)]
mod test_helpers;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bot::AppState;
use cache::{CacheRegistry, MemoryCounterStore};
use stores::CacheStore;
use config::{Config, CounterBackend};
use database::{CounterRepository, Database, PolicyRepository, StrikeRepository, UntrustworthyRepository};
use gateway::DryRunGateway;
use permissions::Owners;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// How often expired counters and cushioning entries are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file first (before anything else)
    dotenvy::dotenv().ok();

    // If RUST_LOG is not set, default to "info" level for our crate
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vigil=info"));

    // Reports go to stdout in stdin mode, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Vigil...");

    let config = Config::from_env()?;
    info!("Configuration loaded successfully");
    info!("Event source: {:?}", config.event_source);

    // Connect to MongoDB
    info!("Connecting to MongoDB...");
    let db = Database::connect(&config.mongodb_uri, &config.mongodb_database).await?;
    db.ensure_indexes().await?;
    info!("Database connected");

    let cache = CacheRegistry::new();
    let policies = Arc::new(PolicyRepository::new(&db, &cache)?);
    let strikes = Arc::new(StrikeRepository::new(&db));
    let untrustworthy = Arc::new(UntrustworthyRepository::new(&db, &cache)?);
    info!("Repositories initialized (caches: {:?})", cache.cache_names());

    let counters: Arc<dyn CacheStore> = match config.counter_backend {
        CounterBackend::Mongo => Arc::new(CounterRepository::new(&db)),
        CounterBackend::Memory => {
            info!("Using in-process rate counters; they are not shared between instances");
            let counters = MemoryCounterStore::with_capacity(config.counter_capacity);
            counters.spawn_purger(PURGE_INTERVAL);
            Arc::new(counters)
        }
    };

    if config.owner_ids.is_empty() {
        info!("No owner IDs configured (OWNER_IDS is empty)");
    } else {
        info!("Owners: {:?}", config.owner_ids);
    }

    let state = AppState::new(
        policies,
        strikes,
        counters,
        Arc::new(DryRunGateway),
        Owners::new(config.owner_ids.clone()),
        config.strike_cushioning,
        config.store_timeout,
    )
    .with_untrustworthy(untrustworthy);

    let cushioning = state.escalation.cushioning().clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = cushioning.purge_expired(Instant::now());
            if purged > 0 {
                debug!("Purged {} cushioning entries, {} active", purged, cushioning.len());
            }
        }
    });

    bot::run(&config, state).await?;

    info!("Vigil stopped");
    Ok(())
}
