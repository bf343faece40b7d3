//! Shared state for the admin cache endpoints

use std::sync::Arc;

use crate::infrastructure::services::{
    InvalidationCoordinator, ListingCacheService, StatsInspector, ViewCounter, WarmingScheduler,
};

/// Handles to every cache-layer service, cloned into each handler.
///
/// The host application embeds this state in its own router; the cache
/// layer owns no HTTP listener of its own.
#[derive(Clone)]
pub struct CacheState {
    pub cache: Arc<ListingCacheService>,
    pub view_counter: Arc<ViewCounter>,
    pub invalidation: Arc<InvalidationCoordinator>,
    pub warming: Arc<WarmingScheduler>,
    pub stats: Arc<StatsInspector>,
}

impl CacheState {
    /// Stops the warming schedule. Call during graceful shutdown.
    pub fn shutdown(&self) {
        self.warming.stop();
    }
}
