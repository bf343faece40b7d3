//! View counter - high-frequency counter with periodic durable flush
//!
//! The key-value store itself is the buffer: every view is an atomic INCR
//! against `views:{id}`. Whenever the running count crosses a multiple of
//! the flush threshold, a best-effort batch write pushes that many views
//! into the primary store's durable counter column. Between boundary
//! crossings the durable column may lag by up to threshold - 1; that bounds
//! write amplification against the primary store.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::cache::{CacheNamespace, KeyStore};
use crate::domain::listing::ListingStore;

/// Configuration for the view counter
#[derive(Debug, Clone)]
pub struct ViewCounterConfig {
    /// Durable flush granularity: one primary-store write per this many views
    pub flush_threshold: i64,
    /// TTL armed on a counter's first increment so abandoned counters expire
    pub counter_ttl: Duration,
}

impl Default for ViewCounterConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 10,
            counter_ttl: CacheNamespace::ViewCounter.default_ttl(),
        }
    }
}

impl ViewCounterConfig {
    pub fn with_flush_threshold(mut self, threshold: i64) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    pub fn with_counter_ttl(mut self, ttl: Duration) -> Self {
        self.counter_ttl = ttl;
        self
    }
}

/// Eventually-consistent per-listing view counter
#[derive(Debug)]
pub struct ViewCounter {
    store: Arc<dyn KeyStore>,
    listing_store: Arc<dyn ListingStore>,
    config: ViewCounterConfig,
}

impl ViewCounter {
    pub fn new(store: Arc<dyn KeyStore>, listing_store: Arc<dyn ListingStore>) -> Self {
        Self::with_config(store, listing_store, ViewCounterConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn KeyStore>,
        listing_store: Arc<dyn ListingStore>,
        config: ViewCounterConfig,
    ) -> Self {
        Self {
            store,
            listing_store,
            config,
        }
    }

    /// Records one view and returns the running count.
    ///
    /// Fail-open: if the store is unavailable the view is dropped and 0 is
    /// returned; a page view must never fail because the counter did.
    pub async fn record_view(&self, listing_id: i64) -> i64 {
        let key = CacheNamespace::ViewCounter.key(listing_id.to_string());

        let count = match self.store.increment(&key, 1).await {
            Ok(count) => count,
            Err(e) => {
                warn!(listing_id, error = %e, "View counter increment failed, dropping view");
                return 0;
            }
        };

        // INCR returning 1 means the key was just created; arm its TTL so
        // counters for abandoned listings expire on their own.
        if count == 1 {
            if let Err(e) = self.store.expire(&key, self.config.counter_ttl).await {
                warn!(listing_id, error = %e, "Failed to arm view counter TTL");
            }
        }

        if count % self.config.flush_threshold == 0 {
            self.spawn_flush(listing_id, count);
        }

        count
    }

    /// Best-effort, non-blocking flush of one threshold batch
    fn spawn_flush(&self, listing_id: i64, count: i64) {
        let listing_store = self.listing_store.clone();
        let threshold = self.config.flush_threshold;

        debug!(listing_id, count, "Flushing view counter batch to primary store");

        tokio::spawn(async move {
            if let Err(e) = listing_store.add_view_counts(listing_id, threshold).await {
                warn!(listing_id, error = %e, "View counter flush failed");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockKeyStore;
    use crate::domain::listing::MockListingStore;

    fn counter_with_threshold(threshold: i64) -> (Arc<MockKeyStore>, Arc<MockListingStore>, ViewCounter) {
        let store = Arc::new(MockKeyStore::new());
        let listing_store = Arc::new(MockListingStore::new());
        let counter = ViewCounter::with_config(
            store.clone(),
            listing_store.clone(),
            ViewCounterConfig::default().with_flush_threshold(threshold),
        );
        (store, listing_store, counter)
    }

    #[tokio::test]
    async fn test_counts_are_monotonic() {
        let (_, _, counter) = counter_with_threshold(10);

        for expected in 1..=25 {
            assert_eq!(counter.record_view(42).await, expected);
        }
    }

    #[tokio::test]
    async fn test_first_increment_arms_ttl() {
        let (store, _, counter) = counter_with_threshold(10);

        counter.record_view(42).await;

        let ttl = store.ttl("views:42").await.unwrap();
        assert_eq!(ttl, Some(CacheNamespace::ViewCounter.default_ttl()));
    }

    #[tokio::test]
    async fn test_flush_at_threshold_multiples() {
        let (_, listing_store, counter) = counter_with_threshold(5);

        for _ in 0..12 {
            counter.record_view(42).await;
        }

        // Crossed 5 and 10: two batches of 5. The flush is spawned, give it
        // a moment to land.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(listing_store.flushed_views(42), 10);
    }

    #[tokio::test]
    async fn test_no_flush_below_threshold() {
        let (_, listing_store, counter) = counter_with_threshold(10);

        for _ in 0..9 {
            counter.record_view(42).await;
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(listing_store.flushed_views(42), 0);
    }

    #[tokio::test]
    async fn test_concurrent_views_all_counted() {
        let (store, _, counter) = counter_with_threshold(100);
        let counter = Arc::new(counter);

        let mut handles = Vec::new();
        for _ in 0..25 {
            let counter = counter.clone();
            handles.push(tokio::spawn(async move { counter.record_view(42).await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let final_count = store.increment("views:42", 0).await.unwrap();
        assert_eq!(final_count, 25);
    }

    #[tokio::test]
    async fn test_counters_are_per_listing() {
        let (_, _, counter) = counter_with_threshold(10);

        counter.record_view(1).await;
        counter.record_view(1).await;
        let other = counter.record_view(2).await;

        assert_eq!(other, 1);
    }

    #[tokio::test]
    async fn test_fail_open_on_store_error() {
        let (store, _, counter) = counter_with_threshold(10);
        store.fail("connection refused");

        assert_eq!(counter.record_view(42).await, 0);
    }

    #[tokio::test]
    async fn test_flush_failure_does_not_affect_count() {
        let store = Arc::new(MockKeyStore::new());
        let listing_store = Arc::new(MockListingStore::new().with_error("primary store down"));
        let counter = ViewCounter::with_config(
            store,
            listing_store,
            ViewCounterConfig::default().with_flush_threshold(2),
        );

        assert_eq!(counter.record_view(42).await, 1);
        assert_eq!(counter.record_view(42).await, 2);
        assert_eq!(counter.record_view(42).await, 3);
    }
}
