//! Listing platform cache layer
//!
//! Read-through caching, view counting, invalidation and scheduled
//! warming for a listing site backed by PostgreSQL. The layer sits
//! between the request handlers and the primary store:
//! - Typed per-namespace reads and writes over a pluggable key-value
//!   store (Redis in production, moka in-memory for development)
//! - Order-independent cache keys for search queries
//! - Buffered view counters flushed to the primary store in batches
//! - Cascade invalidation on listing and user mutations
//! - A cancellable warming schedule that pre-populates hot keys
//!
//! Cache failures degrade to misses; only primary-store failures reach
//! callers.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use api::state::CacheState;
use domain::cache::CacheNamespace;
use domain::listing::ListingStore;
use infrastructure::cache::{create_key_store, KeyStoreConfig, StoreBackend};
use infrastructure::listing_store::{connect_pool, DatabaseConfig, PostgresListingStore};
use infrastructure::services::{
    InvalidationCoordinator, ListingCacheService, StatsInspector, TtlPolicy, ViewCounter,
    ViewCounterConfig, WarmingConfig, WarmingScheduler,
};

/// Wires the cache layer against a Postgres-backed listing store built
/// from the same configuration.
pub async fn create_cache_state(config: &AppConfig) -> anyhow::Result<CacheState> {
    let db_config = DatabaseConfig::new(&config.database.url)
        .with_max_connections(config.database.max_connections);

    info!("Connecting to PostgreSQL...");
    let pool = connect_pool(&db_config).await?;

    let listing_store: Arc<dyn ListingStore> = Arc::new(PostgresListingStore::new(pool));

    create_cache_state_with_store(config, listing_store).await
}

/// Wires the cache layer against a caller-supplied listing store.
pub async fn create_cache_state_with_store(
    config: &AppConfig,
    listing_store: Arc<dyn ListingStore>,
) -> anyhow::Result<CacheState> {
    let backend = StoreBackend::from_str(&config.cache.backend)?;

    info!("Cache backend: {}", backend);

    let mut store_config = KeyStoreConfig {
        backend,
        redis_url: Some(config.cache.redis_url.clone()),
        ..Default::default()
    }
    .with_max_capacity(config.cache.max_capacity);

    if !config.cache.key_prefix.is_empty() {
        store_config = store_config.with_key_prefix(config.cache.key_prefix.clone());
    }

    let store = create_key_store(&store_config).await?;

    let mut ttl_policy = TtlPolicy::new();

    for (prefix, secs) in &config.cache.ttl_overrides {
        let namespace = CacheNamespace::ALL
            .into_iter()
            .find(|ns| ns.prefix() == prefix)
            .ok_or_else(|| anyhow::anyhow!("Unknown cache namespace in TTL override: {}", prefix))?;

        ttl_policy = ttl_policy.with_override(namespace, Duration::from_secs(*secs));
    }

    let cache = Arc::new(ListingCacheService::with_policy(store.clone(), ttl_policy));

    let counter_config = ViewCounterConfig::default()
        .with_flush_threshold(config.counter.flush_threshold)
        .with_counter_ttl(Duration::from_secs(config.counter.counter_ttl_secs));
    let view_counter = Arc::new(ViewCounter::with_config(
        store.clone(),
        listing_store.clone(),
        counter_config,
    ));

    let invalidation = Arc::new(InvalidationCoordinator::new(store.clone()));

    if config.warming.interval_minutes == 0 {
        anyhow::bail!("warming.interval_minutes must be at least 1");
    }

    let mut warming_config = WarmingConfig::default()
        .with_interval(Duration::from_secs(config.warming.interval_minutes * 60));
    warming_config.popular_limit = config.warming.popular_limit;
    warming_config.featured_limit = config.warming.featured_limit;
    warming_config.recent_limit = config.warming.recent_limit;

    if config.warming.distributed_lease {
        warming_config = warming_config.with_distributed_lease();
    }

    let warming = Arc::new(WarmingScheduler::new(
        cache.clone(),
        listing_store,
        warming_config,
    ));

    if config.warming.enabled {
        warming.start();
    }

    let stats = Arc::new(StatsInspector::new(store));

    Ok(CacheState {
        cache,
        view_counter,
        invalidation,
        warming,
        stats,
    })
}
