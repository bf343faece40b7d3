//! Cache warming scheduler
//!
//! Pre-populates hot keys from the primary store on a periodic schedule.
//! A pass reads the primary store only and writes through the cache
//! service; it never reads cached data, so a pass cannot warm itself from
//! stale entries. Sub-tasks are isolated: one failing leaves the others
//! running and is only logged.
//!
//! Overlap control is a process-local flag. `stop()` cancels future passes
//! through a watch channel; a pass already in flight runs to completion.
//! For horizontally scaled deployments an optional lease key in the shared
//! store keeps N instances from all warming at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Days, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::cache::{KeyStoreExt, QueryCriteria};
use crate::domain::listing::{ListingStore, SearchPage};

use super::listing_cache::ListingCacheService;

/// Key guarding cross-instance warming when the lease is enabled
const LEASE_KEY: &str = "warming:lease";

/// Configuration for the warming scheduler
#[derive(Debug, Clone)]
pub struct WarmingConfig {
    /// Time between scheduled passes
    pub interval: Duration,
    /// How many popular listings to warm
    pub popular_limit: i64,
    /// How many featured listings to warm
    pub featured_limit: i64,
    /// How many recent listings to warm
    pub recent_limit: i64,
    /// Common query shapes warmed on every pass
    pub query_catalog: Vec<QueryCriteria>,
    /// Acquire a lease in the shared store before a scheduled pass
    pub distributed_lease: bool,
}

impl Default for WarmingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(900),
            popular_limit: 10,
            featured_limit: 10,
            recent_limit: 10,
            query_catalog: default_query_catalog(),
            distributed_lease: false,
        }
    }
}

impl WarmingConfig {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_query_catalog(mut self, catalog: Vec<QueryCriteria>) -> Self {
        self.query_catalog = catalog;
        self
    }

    pub fn with_distributed_lease(mut self) -> Self {
        self.distributed_lease = true;
        self
    }
}

/// The searches the public site renders on its highest-traffic pages
fn default_query_catalog() -> Vec<QueryCriteria> {
    vec![
        QueryCriteria::new().listing_kind("sale").page(1).per_page(20),
        QueryCriteria::new().listing_kind("rent").page(1).per_page(20),
        QueryCriteria::new()
            .listing_kind("sale")
            .property_type("apartment")
            .page(1)
            .per_page(20),
        QueryCriteria::new()
            .listing_kind("sale")
            .property_type("house")
            .page(1)
            .per_page(20),
    ]
}

/// Clears the warming flag when a pass ends, on every path out
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Periodic cache warmer with single-pass overlap protection
#[derive(Debug)]
pub struct WarmingScheduler {
    cache: Arc<ListingCacheService>,
    listing_store: Arc<dyn ListingStore>,
    config: WarmingConfig,
    is_warming: AtomicBool,
    runner: Mutex<Option<RunnerHandle>>,
}

#[derive(Debug)]
struct RunnerHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WarmingScheduler {
    pub fn new(
        cache: Arc<ListingCacheService>,
        listing_store: Arc<dyn ListingStore>,
        config: WarmingConfig,
    ) -> Self {
        Self {
            cache,
            listing_store,
            config,
            is_warming: AtomicBool::new(false),
            runner: Mutex::new(None),
        }
    }

    /// Whether a warming pass is currently in flight
    pub fn is_warming(&self) -> bool {
        self.is_warming.load(Ordering::SeqCst)
    }

    /// Whether the periodic schedule is running
    pub fn is_scheduled(&self) -> bool {
        self.runner.lock().unwrap().is_some()
    }

    /// Runs one pass immediately, then schedules recurring passes.
    /// Calling `start` while already scheduled restarts the schedule.
    pub fn start(self: &Arc<Self>) {
        self.stop();

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let scheduler = self.clone();
        // A zero-duration ticker panics inside the runner task
        let interval = self.config.interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            scheduler.warm_once().await;

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await; // first tick fires immediately; already warmed

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        scheduler.run_scheduled_pass().await;
                    }
                    _ = stop_rx.changed() => {
                        info!("Warming schedule stopped");
                        return;
                    }
                }
            }
        });

        *self.runner.lock().unwrap() = Some(RunnerHandle { stop_tx, task });
        info!(interval_secs = interval.as_secs(), "Warming schedule started");
    }

    /// Cancels future scheduled passes. A pass already in flight runs to
    /// completion.
    pub fn stop(&self) {
        if let Some(handle) = self.runner.lock().unwrap().take() {
            let _ = handle.stop_tx.send(true);
            drop(handle.task);
        }
    }

    async fn run_scheduled_pass(&self) {
        if self.config.distributed_lease && !self.try_acquire_lease().await {
            debug!("Warming lease held by another instance, skipping pass");
            return;
        }

        self.warm_once().await;
    }

    /// SET NX EX on the lease key; the TTL covers one interval so a crashed
    /// holder frees the lease by expiry.
    async fn try_acquire_lease(&self) -> bool {
        match self
            .cache
            .store()
            .set_nx(LEASE_KEY, &true, self.config.interval)
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                // Fail open: an unreachable store means nothing to warm into
                // anyway, and the pass itself degrades to logged failures.
                warn!(error = %e, "Warming lease check failed");
                true
            }
        }
    }

    /// Runs a single warming pass unless one is already in flight.
    /// Returns false when the pass was skipped.
    pub async fn warm_once(&self) -> bool {
        if self
            .is_warming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Warming pass already in flight, skipping");
            return false;
        }

        let _guard = PassGuard(&self.is_warming);
        let started = std::time::Instant::now();
        info!("Warming pass started");

        tokio::join!(
            self.warm_popular(),
            self.warm_featured(),
            self.warm_recent(),
            self.warm_query_catalog(),
            self.warm_analytics(),
        );

        info!(elapsed_ms = started.elapsed().as_millis() as u64, "Warming pass finished");
        true
    }

    async fn warm_popular(&self) {
        let summaries = match self
            .listing_store
            .popular_listings(self.config.popular_limit)
            .await
        {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(error = %e, "Warming popular listings failed");
                return;
            }
        };

        // Warm the detail pages for the listings most likely to be opened
        for summary in &summaries {
            match self.listing_store.listing(summary.id).await {
                Ok(Some(listing)) => {
                    self.cache.write_listing_detail(&listing).await;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(listing_id = summary.id, error = %e, "Warming listing detail failed");
                }
            }
        }

        self.cache.write_popular_listings(&summaries).await;
    }

    async fn warm_featured(&self) {
        match self
            .listing_store
            .featured_listings(self.config.featured_limit)
            .await
        {
            Ok(summaries) => {
                let criteria = QueryCriteria::new().with_field("featured", true).page(1);
                let page = page_of(summaries, self.config.featured_limit);
                self.cache.write_search_results(&criteria, &page).await;
            }
            Err(e) => {
                warn!(error = %e, "Warming featured listings failed");
            }
        }
    }

    async fn warm_recent(&self) {
        match self
            .listing_store
            .recent_listings(self.config.recent_limit)
            .await
        {
            Ok(summaries) => {
                let criteria = QueryCriteria::new().sort("newest").page(1);
                let page = page_of(summaries, self.config.recent_limit);
                self.cache.write_search_results(&criteria, &page).await;
            }
            Err(e) => {
                warn!(error = %e, "Warming recent listings failed");
            }
        }
    }

    async fn warm_query_catalog(&self) {
        for criteria in &self.config.query_catalog {
            match self.listing_store.search(criteria).await {
                Ok(page) => {
                    self.cache.write_search_results(criteria, &page).await;
                }
                Err(e) => {
                    warn!(error = %e, "Warming catalog query failed");
                }
            }
        }
    }

    async fn warm_analytics(&self) {
        let today = Utc::now().date_naive();
        let dates = [today, today - Days::new(1)];

        for date in dates {
            match self.listing_store.daily_snapshot(date).await {
                Ok(Some(snapshot)) => {
                    self.cache.write_daily_snapshot(&snapshot).await;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(%date, error = %e, "Warming analytics snapshot failed");
                }
            }
        }
    }
}

fn page_of(items: Vec<crate::domain::listing::ListingSummary>, per_page: i64) -> SearchPage {
    let total = items.len() as i64;
    SearchPage {
        items,
        total,
        page: 1,
        per_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{KeyStore, MockKeyStore};
    use crate::domain::listing::{DailySnapshot, Listing, MockListingStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    fn test_listing(id: i64, views: i64, featured: bool) -> Listing {
        Listing {
            id,
            title: format!("Listing {}", id),
            description: String::new(),
            city: "lisbon".to_string(),
            price: 300_000,
            bedrooms: 2,
            bathrooms: 1,
            area_m2: 90.0,
            property_type: "apartment".to_string(),
            listing_kind: "sale".to_string(),
            featured,
            images: vec![],
            views,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn seeded_listing_store() -> MockListingStore {
        MockListingStore::new()
            .with_listing(test_listing(1, 500, true))
            .with_listing(test_listing(2, 300, false))
            .with_listing(test_listing(3, 100, false))
            .with_snapshot(DailySnapshot {
                date: Utc::now().date_naive(),
                views: 1000,
                leads: 12,
                new_listings: 3,
            })
    }

    fn build_scheduler(
        listing_store: Arc<dyn ListingStore>,
        config: WarmingConfig,
    ) -> (Arc<MockKeyStore>, Arc<WarmingScheduler>) {
        let store = Arc::new(MockKeyStore::new());
        let cache = Arc::new(ListingCacheService::new(store.clone()));
        let scheduler = Arc::new(WarmingScheduler::new(cache, listing_store, config));
        (store, scheduler)
    }

    #[tokio::test]
    async fn test_pass_populates_all_hot_namespaces() {
        let listing_store = Arc::new(seeded_listing_store());
        let (store, scheduler) = build_scheduler(listing_store, WarmingConfig::default());

        assert!(scheduler.warm_once().await);

        // Popular list and the popular listings' details
        assert!(store.contains("popular:listings"));
        assert!(store.contains("listing:1"));
        assert!(store.contains("listing:2"));

        // Featured / recent / catalog all live under the search namespace,
        // analytics under its own
        let size = store.size().await.unwrap();
        assert!(size > 7, "expected warmed entries, got {}", size);

        let today_key = format!("analytics:{}", Utc::now().date_naive());
        assert!(store.contains(&today_key));
    }

    #[tokio::test]
    async fn test_pass_with_failing_primary_store_clears_guard() {
        let listing_store = Arc::new(MockListingStore::new().with_error("primary store down"));
        let (_, scheduler) = build_scheduler(listing_store, WarmingConfig::default());

        assert!(scheduler.warm_once().await);
        assert!(!scheduler.is_warming());

        // A later pass still runs
        assert!(scheduler.warm_once().await);
    }

    /// Primary store whose popular query blocks until released, to hold a
    /// warming pass open.
    #[derive(Debug)]
    struct SlowListingStore {
        inner: MockListingStore,
        delay: Duration,
    }

    #[async_trait]
    impl ListingStore for SlowListingStore {
        async fn listing(&self, id: i64) -> Result<Option<Listing>, crate::domain::DomainError> {
            self.inner.listing(id).await
        }

        async fn popular_listings(
            &self,
            limit: i64,
        ) -> Result<Vec<crate::domain::listing::ListingSummary>, crate::domain::DomainError>
        {
            tokio::time::sleep(self.delay).await;
            self.inner.popular_listings(limit).await
        }

        async fn featured_listings(
            &self,
            limit: i64,
        ) -> Result<Vec<crate::domain::listing::ListingSummary>, crate::domain::DomainError>
        {
            self.inner.featured_listings(limit).await
        }

        async fn recent_listings(
            &self,
            limit: i64,
        ) -> Result<Vec<crate::domain::listing::ListingSummary>, crate::domain::DomainError>
        {
            self.inner.recent_listings(limit).await
        }

        async fn search(
            &self,
            criteria: &QueryCriteria,
        ) -> Result<SearchPage, crate::domain::DomainError> {
            self.inner.search(criteria).await
        }

        async fn daily_snapshot(
            &self,
            date: NaiveDate,
        ) -> Result<Option<DailySnapshot>, crate::domain::DomainError> {
            self.inner.daily_snapshot(date).await
        }

        async fn add_view_counts(
            &self,
            listing_id: i64,
            count: i64,
        ) -> Result<(), crate::domain::DomainError> {
            self.inner.add_view_counts(listing_id, count).await
        }
    }

    #[tokio::test]
    async fn test_concurrent_warm_once_is_a_noop() {
        let listing_store = Arc::new(SlowListingStore {
            inner: seeded_listing_store(),
            delay: Duration::from_millis(200),
        });
        let (_, scheduler) = build_scheduler(listing_store, WarmingConfig::default());

        let first = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.warm_once().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(scheduler.is_warming());

        // Second invocation returns immediately without starting a pass
        let second = scheduler.warm_once().await;
        assert!(!second);

        assert!(first.await.unwrap());
        assert!(!scheduler.is_warming());

        // After the first completes, a new pass runs normally
        assert!(scheduler.warm_once().await);
    }

    #[tokio::test]
    async fn test_start_runs_immediate_pass_and_stop_cancels() {
        let listing_store = Arc::new(seeded_listing_store());
        let config = WarmingConfig::default().with_interval(Duration::from_millis(50));
        let (_, scheduler) = build_scheduler(listing_store.clone(), config);

        scheduler.start();
        assert!(scheduler.is_scheduled());

        tokio::time::sleep(Duration::from_millis(130)).await;
        let queries_while_running = listing_store.query_count();
        assert!(queries_while_running > 0);

        scheduler.stop();
        assert!(!scheduler.is_scheduled());

        // Allow any in-flight pass to finish, then confirm no new queries
        tokio::time::sleep(Duration::from_millis(60)).await;
        let settled = listing_store.query_count();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(listing_store.query_count(), settled);
    }

    #[tokio::test]
    async fn test_start_with_zero_interval_keeps_running() {
        let listing_store = Arc::new(seeded_listing_store());
        let config = WarmingConfig::default().with_interval(Duration::ZERO);
        let (_, scheduler) = build_scheduler(listing_store.clone(), config);

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let after_first_pass = listing_store.query_count();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The runner task survives the degenerate interval and keeps
        // scheduling passes instead of dying on a panic
        assert!(scheduler.is_scheduled());
        assert!(listing_store.query_count() > after_first_pass);
        scheduler.stop();
    }

    #[tokio::test]
    async fn test_stop_without_start_is_harmless() {
        let listing_store = Arc::new(seeded_listing_store());
        let (_, scheduler) = build_scheduler(listing_store, WarmingConfig::default());

        scheduler.stop();
        assert!(!scheduler.is_scheduled());
    }

    #[tokio::test]
    async fn test_lease_blocks_second_instance() {
        let listing_store: Arc<dyn ListingStore> = Arc::new(seeded_listing_store());
        let store = Arc::new(MockKeyStore::new());
        let cache = Arc::new(ListingCacheService::new(store.clone()));
        let config = WarmingConfig::default().with_distributed_lease();

        let first = WarmingScheduler::new(cache.clone(), listing_store.clone(), config.clone());
        let second = WarmingScheduler::new(cache, listing_store, config);

        assert!(first.try_acquire_lease().await);
        assert!(!second.try_acquire_lease().await);
    }
}
