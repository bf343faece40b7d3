//! Cache statistics for the admin surface

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::cache::{CacheNamespace, KeyStore};

/// Point-in-time snapshot of the cache backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of keys currently stored
    pub total_keys: u64,
    /// Backend memory usage in bytes, when the backend reports it
    pub memory_bytes: Option<u64>,
    /// Key count per namespace prefix
    pub namespaces: BTreeMap<String, u64>,
}

/// Reads diagnostic figures from the key-value store.
///
/// Stats are informational: a failing backend yields zeroed stats rather
/// than an error, so the admin endpoint stays up while the cache is down.
#[derive(Debug, Clone)]
pub struct StatsInspector {
    store: Arc<dyn KeyStore>,
}

impl StatsInspector {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self { store }
    }

    pub async fn stats(&self) -> CacheStats {
        let total_keys = match self.store.size().await {
            Ok(size) => size as u64,
            Err(e) => {
                warn!(error = %e, "Cache size lookup failed");
                0
            }
        };

        let memory_bytes = match self.store.memory_usage().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Cache memory lookup failed");
                None
            }
        };

        let mut namespaces = BTreeMap::new();

        for namespace in CacheNamespace::ALL {
            let count = match self.store.count_prefix(&namespace.wildcard_prefix()).await {
                Ok(count) => count as u64,
                Err(e) => {
                    warn!(namespace = %namespace, error = %e, "Namespace count failed");
                    0
                }
            };

            namespaces.insert(namespace.prefix().to_string(), count);
        }

        CacheStats {
            total_keys,
            memory_bytes,
            namespaces,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockKeyStore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_stats_reports_key_count() {
        let store = Arc::new(
            MockKeyStore::new()
                .with_entry("listing:1", &"a", Some(Duration::from_secs(60)))
                .with_entry("listing:2", &"b", Some(Duration::from_secs(60))),
        );
        let inspector = StatsInspector::new(store);

        let stats = inspector.stats().await;

        assert_eq!(stats.total_keys, 2);
    }

    #[tokio::test]
    async fn test_stats_breaks_down_by_namespace() {
        let ttl = Some(Duration::from_secs(60));
        let store = Arc::new(
            MockKeyStore::new()
                .with_entry("listing:1", &"a", ttl)
                .with_entry("listing:2", &"b", ttl)
                .with_entry("search:tok", &"c", ttl)
                .with_entry("session:7", &"d", ttl),
        );
        let inspector = StatsInspector::new(store);

        let stats = inspector.stats().await;

        assert_eq!(stats.namespaces.get("listing"), Some(&2));
        assert_eq!(stats.namespaces.get("search"), Some(&1));
        assert_eq!(stats.namespaces.get("session"), Some(&1));
        assert_eq!(stats.namespaces.get("favorites"), Some(&0));
        // Every namespace appears even when empty
        assert_eq!(stats.namespaces.len(), CacheNamespace::ALL.len());
    }

    #[tokio::test]
    async fn test_stats_on_failing_store_are_zeroed() {
        let store = Arc::new(MockKeyStore::new().with_error("connection refused"));
        let inspector = StatsInspector::new(store);

        let stats = inspector.stats().await;

        assert_eq!(stats.total_keys, 0);
        assert_eq!(stats.memory_bytes, None);
        assert!(stats.namespaces.values().all(|count| *count == 0));
    }
}
