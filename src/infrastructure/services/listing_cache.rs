//! Listing cache service - typed, namespaced, fail-open access to the store
//!
//! The cache is an optimization only. Store failures and corrupt payloads
//! are logged and surfaced as misses or dropped writes; they never fail the
//! caller. The one exception is a populate function failing, which is a
//! genuine data-retrieval error and is propagated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::domain::cache::{
    CacheNamespace, CachedEnvelope, KeyStore, KeyStoreExt, QueryCriteria,
};
use crate::domain::listing::{DailySnapshot, Listing, ListingSummary, SearchPage};
use crate::domain::DomainError;

/// Per-namespace TTL policy with optional overrides on top of the defaults
#[derive(Debug, Clone, Default)]
pub struct TtlPolicy {
    overrides: HashMap<CacheNamespace, Duration>,
}

impl TtlPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, namespace: CacheNamespace, ttl: Duration) -> Self {
        self.overrides.insert(namespace, ttl);
        self
    }

    pub fn ttl(&self, namespace: CacheNamespace) -> Duration {
        self.overrides
            .get(&namespace)
            .copied()
            .unwrap_or_else(|| namespace.default_ttl())
    }
}

/// Typed read/write cache over the key store
#[derive(Debug)]
pub struct ListingCacheService {
    store: Arc<dyn KeyStore>,
    ttl_policy: TtlPolicy,
}

impl ListingCacheService {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_policy(store, TtlPolicy::default())
    }

    pub fn with_policy(store: Arc<dyn KeyStore>, ttl_policy: TtlPolicy) -> Self {
        Self { store, ttl_policy }
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Reads a payload from a namespace; any store or decode failure is a miss
    pub async fn read<T>(&self, namespace: CacheNamespace, scope: &str) -> Option<T>
    where
        T: DeserializeOwned + Send,
    {
        self.read_envelope(namespace, scope)
            .await
            .map(CachedEnvelope::into_payload)
    }

    /// Reads a payload together with its capture timestamp
    pub async fn read_envelope<T>(
        &self,
        namespace: CacheNamespace,
        scope: &str,
    ) -> Option<CachedEnvelope<T>>
    where
        T: DeserializeOwned + Send,
    {
        let key = namespace.key(scope);

        match self.store.get::<CachedEnvelope<T>>(&key).await {
            Ok(Some(envelope)) => {
                counter!("listing_cache_hits_total", "namespace" => namespace.prefix())
                    .increment(1);
                Some(envelope)
            }
            Ok(None) => {
                counter!("listing_cache_misses_total", "namespace" => namespace.prefix())
                    .increment(1);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                counter!("listing_cache_errors_total", "namespace" => namespace.prefix())
                    .increment(1);
                None
            }
        }
    }

    /// Writes a payload into a namespace with its TTL; returns whether the
    /// write reached the store
    pub async fn write<T>(&self, namespace: CacheNamespace, scope: &str, payload: &T) -> bool
    where
        T: Serialize + Send + Sync,
    {
        let key = namespace.key(scope);
        let envelope = CachedEnvelope::new(payload);
        let ttl = self.ttl_policy.ttl(namespace);

        match self.store.set(&key, &envelope, ttl).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache write failed, dropping");
                counter!("listing_cache_errors_total", "namespace" => namespace.prefix())
                    .increment(1);
                false
            }
        }
    }

    /// Read-through helper: on miss, runs the populate function against the
    /// primary store, writes the result through and returns it.
    ///
    /// Cache failures on either side are absorbed; a populate failure is
    /// returned to the caller as-is.
    pub async fn get_or_populate<T, F, Fut>(
        &self,
        namespace: CacheNamespace,
        scope: &str,
        populate: F,
    ) -> Result<T, DomainError>
    where
        T: Serialize + DeserializeOwned + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, DomainError>>,
    {
        if let Some(cached) = self.read(namespace, scope).await {
            return Ok(cached);
        }

        let value = populate().await?;
        self.write(namespace, scope, &value).await;

        Ok(value)
    }

    // ------------------------------------------------------------------
    // Per-namespace helpers
    // ------------------------------------------------------------------

    pub async fn listing_detail(&self, listing_id: i64) -> Option<Listing> {
        self.read(CacheNamespace::ListingDetail, &listing_id.to_string())
            .await
    }

    pub async fn write_listing_detail(&self, listing: &Listing) -> bool {
        self.write(
            CacheNamespace::ListingDetail,
            &listing.id.to_string(),
            listing,
        )
        .await
    }

    pub async fn search_results(&self, criteria: &QueryCriteria) -> Option<SearchPage> {
        self.read(CacheNamespace::QueryResult, &criteria.canonical_token())
            .await
    }

    pub async fn write_search_results(&self, criteria: &QueryCriteria, page: &SearchPage) -> bool {
        self.write(
            CacheNamespace::QueryResult,
            &criteria.canonical_token(),
            page,
        )
        .await
    }

    /// Read-through search keyed by canonicalized criteria
    pub async fn search_or_populate<F, Fut>(
        &self,
        criteria: &QueryCriteria,
        populate: F,
    ) -> Result<SearchPage, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<SearchPage, DomainError>>,
    {
        self.get_or_populate(
            CacheNamespace::QueryResult,
            &criteria.canonical_token(),
            populate,
        )
        .await
    }

    pub async fn session<T: DeserializeOwned + Send>(&self, user_id: i64) -> Option<T> {
        self.read(CacheNamespace::Session, &user_id.to_string()).await
    }

    pub async fn write_session<T: Serialize + Send + Sync>(
        &self,
        user_id: i64,
        session: &T,
    ) -> bool {
        self.write(CacheNamespace::Session, &user_id.to_string(), session)
            .await
    }

    pub async fn favorites(&self, user_id: i64) -> Option<Vec<i64>> {
        self.read(CacheNamespace::Favorites, &user_id.to_string())
            .await
    }

    pub async fn write_favorites(&self, user_id: i64, listing_ids: &Vec<i64>) -> bool {
        self.write(CacheNamespace::Favorites, &user_id.to_string(), listing_ids)
            .await
    }

    pub async fn daily_snapshot(&self, date: NaiveDate) -> Option<DailySnapshot> {
        self.read(CacheNamespace::AnalyticsDaily, &date.to_string())
            .await
    }

    pub async fn write_daily_snapshot(&self, snapshot: &DailySnapshot) -> bool {
        self.write(
            CacheNamespace::AnalyticsDaily,
            &snapshot.date.to_string(),
            snapshot,
        )
        .await
    }

    pub async fn popular_listings(&self) -> Option<Vec<ListingSummary>> {
        self.read(CacheNamespace::PopularList, CacheNamespace::POPULAR_SCOPE)
            .await
    }

    pub async fn write_popular_listings(&self, listings: &Vec<ListingSummary>) -> bool {
        self.write(
            CacheNamespace::PopularList,
            CacheNamespace::POPULAR_SCOPE,
            listings,
        )
        .await
    }
}
