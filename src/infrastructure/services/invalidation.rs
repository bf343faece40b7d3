//! Invalidation coordinator - maps mutation events to cache deletions
//!
//! Result sets are not indexed by the listings they contain, so a listing
//! mutation clears the whole query-result namespace rather than maintaining
//! a reverse index. The blast radius is wider but there is no second index
//! to keep consistent; cleared searches recompute on their next miss.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use crate::domain::cache::{CacheNamespace, KeyStore};

/// What an invalidation pass actually removed (best-effort)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationSummary {
    pub detail_removed: bool,
    pub query_results_removed: usize,
    pub popular_removed: bool,
    pub session_removed: bool,
    pub favorites_removed: bool,
}

/// Cascades cache deletions for mutations that happened elsewhere
#[derive(Debug)]
pub struct InvalidationCoordinator {
    store: Arc<dyn KeyStore>,
}

impl InvalidationCoordinator {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    /// Called after a listing was created or updated in the primary store
    pub async fn on_listing_mutated(&self, listing_id: i64) -> InvalidationSummary {
        let mut summary = self.invalidate_listing(listing_id).await;
        summary.query_results_removed = self.clear_query_results().await;
        summary.popular_removed = self.clear_popular().await;

        info!(
            listing_id,
            query_results = summary.query_results_removed,
            "Invalidated caches for listing mutation"
        );
        counter!("listing_cache_invalidations_total", "event" => "listing_mutated").increment(1);

        summary
    }

    /// Called after a listing was deleted; also drops its view counter
    pub async fn on_listing_deleted(&self, listing_id: i64) -> InvalidationSummary {
        let summary = self.on_listing_mutated(listing_id).await;

        let counter_key = CacheNamespace::ViewCounter.key(listing_id.to_string());
        if let Err(e) = self.store.delete(&counter_key).await {
            warn!(listing_id, error = %e, "Failed to drop view counter");
        }
        counter!("listing_cache_invalidations_total", "event" => "listing_deleted").increment(1);

        summary
    }

    /// Called after a user's account, session or favorites changed
    pub async fn on_user_mutated(&self, user_id: i64) -> InvalidationSummary {
        let mut summary = InvalidationSummary::default();

        summary.session_removed = self
            .delete_quietly(&CacheNamespace::Session.key(user_id.to_string()))
            .await;
        summary.favorites_removed = self
            .delete_quietly(&CacheNamespace::Favorites.key(user_id.to_string()))
            .await;

        info!(user_id, "Invalidated session and favorites caches");
        counter!("listing_cache_invalidations_total", "event" => "user_mutated").increment(1);

        summary
    }

    async fn invalidate_listing(&self, listing_id: i64) -> InvalidationSummary {
        InvalidationSummary {
            detail_removed: self
                .delete_quietly(&CacheNamespace::ListingDetail.key(listing_id.to_string()))
                .await,
            ..Default::default()
        }
    }

    async fn clear_query_results(&self) -> usize {
        match self
            .store
            .delete_prefix(&CacheNamespace::QueryResult.wildcard_prefix())
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Failed to clear query-result caches");
                0
            }
        }
    }

    async fn clear_popular(&self) -> bool {
        self.delete_quietly(&CacheNamespace::PopularList.key(CacheNamespace::POPULAR_SCOPE))
            .await
    }

    async fn delete_quietly(&self, key: &str) -> bool {
        match self.store.delete(key).await {
            Ok(existed) => existed,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::{KeyStoreExt, MockKeyStore};
    use std::time::Duration;

    async fn seeded_store() -> Arc<MockKeyStore> {
        let store = Arc::new(MockKeyStore::new());
        let ttl = Duration::from_secs(60);

        store.set("listing:42", &"detail", ttl).await.unwrap();
        store.set("listing:43", &"detail", ttl).await.unwrap();
        store.set("search:tok1", &"page", ttl).await.unwrap();
        store.set("search:tok2", &"page", ttl).await.unwrap();
        store.set("popular:listings", &"list", ttl).await.unwrap();
        store.set("session:7", &"sess", ttl).await.unwrap();
        store.set("favorites:7", &"favs", ttl).await.unwrap();
        store.increment("views:42", 5).await.unwrap();

        store
    }

    #[tokio::test]
    async fn test_listing_mutation_scope() {
        let store = seeded_store().await;
        let coordinator = InvalidationCoordinator::new(store.clone());

        let summary = coordinator.on_listing_mutated(42).await;

        assert!(summary.detail_removed);
        assert_eq!(summary.query_results_removed, 2);
        assert!(summary.popular_removed);

        // Unrelated namespaces are untouched
        assert!(store.contains("listing:43"));
        assert!(store.contains("session:7"));
        assert!(store.contains("favorites:7"));
        assert!(store.contains("views:42"));
    }

    #[tokio::test]
    async fn test_listing_deletion_drops_view_counter() {
        let store = seeded_store().await;
        let coordinator = InvalidationCoordinator::new(store.clone());

        coordinator.on_listing_deleted(42).await;

        assert!(!store.contains("views:42"));
        assert!(!store.contains("listing:42"));
    }

    #[tokio::test]
    async fn test_user_mutation_scope() {
        let store = seeded_store().await;
        let coordinator = InvalidationCoordinator::new(store.clone());

        let summary = coordinator.on_user_mutated(7).await;

        assert!(summary.session_removed);
        assert!(summary.favorites_removed);

        // Listing caches are untouched by user mutations
        assert!(store.contains("listing:42"));
        assert!(store.contains("search:tok1"));
        assert!(store.contains("popular:listings"));
    }

    #[tokio::test]
    async fn test_mutation_of_uncached_listing_is_harmless() {
        let store = Arc::new(MockKeyStore::new());
        let coordinator = InvalidationCoordinator::new(store);

        let summary = coordinator.on_listing_mutated(999).await;

        assert!(!summary.detail_removed);
        assert_eq!(summary.query_results_removed, 0);
    }

    #[tokio::test]
    async fn test_fail_open_on_store_error() {
        let store = Arc::new(MockKeyStore::new().with_error("connection refused"));
        let coordinator = InvalidationCoordinator::new(store);

        // Must not panic or error; mutation callers never see cache failures
        let summary = coordinator.on_listing_mutated(42).await;
        assert_eq!(summary, InvalidationSummary::default());
    }
}
