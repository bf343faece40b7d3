//! In-memory key store using moka
//!
//! Used in tests and single-process development setups. Per-entry TTLs are
//! tracked explicitly because moka only supports a cache-wide time-to-live.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache as MokaCache;

use crate::domain::cache::KeyStore;
use crate::domain::DomainError;

/// Configuration for the in-memory key store
#[derive(Debug, Clone)]
pub struct InMemoryStoreConfig {
    /// Maximum number of entries
    pub max_capacity: u64,
    /// Fallback TTL for counter keys created without one
    pub default_ttl: Duration,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_capacity: 10_000,
            default_ttl: Duration::from_secs(3600),
        }
    }
}

impl InMemoryStoreConfig {
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

#[derive(Debug, Clone)]
struct StoreEntry {
    data: String,
    /// Expiration timestamp in millis since epoch; None = no expiry yet
    expires_at: Option<u64>,
}

/// Thread-safe in-memory [`KeyStore`]
#[derive(Debug)]
pub struct InMemoryStore {
    cache: MokaCache<String, StoreEntry>,
    config: InMemoryStoreConfig,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_config(InMemoryStoreConfig::default())
    }

    pub fn with_config(config: InMemoryStoreConfig) -> Self {
        let cache = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .build();

        Self { cache, config }
    }

    fn current_time_millis() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    fn is_expired(entry: &StoreEntry) -> bool {
        entry
            .expires_at
            .is_some_and(|at| Self::current_time_millis() > at)
    }

    async fn live_entry(&self, key: &str) -> Option<StoreEntry> {
        match self.cache.get(key).await {
            Some(entry) if Self::is_expired(&entry) => {
                self.cache.remove(key).await;
                None
            }
            other => other,
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyStore for InMemoryStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self.live_entry(key).await.map(|entry| entry.data))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = StoreEntry {
            data: value.to_string(),
            expires_at: Some(Self::current_time_millis() + ttl.as_millis() as u64),
        };

        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        if self.live_entry(key).await.is_some() {
            return Ok(false);
        }

        self.set_raw(key, value, ttl).await?;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let existed = self.live_entry(key).await.is_some();
        self.cache.remove(key).await;
        Ok(existed)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;

        let prefix = prefix.to_string();
        let cache_clone = self.cache.clone();
        let keys_to_delete: Vec<String> = tokio::task::spawn_blocking(move || {
            cache_clone
                .iter()
                .filter_map(|(k, _)| k.starts_with(&prefix).then(|| k.to_string()))
                .collect()
        })
        .await
        .map_err(|e| DomainError::cache(format!("Failed to iterate store: {}", e)))?;

        let mut deleted = 0;
        for key in keys_to_delete {
            self.cache.remove(&key).await;
            deleted += 1;
        }

        Ok(deleted)
    }

    async fn count_prefix(&self, prefix: &str) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;

        let prefix = prefix.to_string();
        let cache_clone = self.cache.clone();
        tokio::task::spawn_blocking(move || {
            cache_clone
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .count()
        })
        .await
        .map_err(|e| DomainError::cache(format!("Failed to iterate store: {}", e)))
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        // Single-writer per call; concurrent increments are racy in-memory,
        // unlike the Redis backend. Good enough for tests and dev.
        let existing = self.live_entry(key).await;
        let current: i64 = existing
            .as_ref()
            .map(|entry| entry.data.parse().unwrap_or(0))
            .unwrap_or(0);

        let new_value = current + delta;
        let entry = StoreEntry {
            data: new_value.to_string(),
            expires_at: existing.and_then(|e| e.expires_at).or_else(|| {
                Some(Self::current_time_millis() + self.config.default_ttl.as_millis() as u64)
            }),
        };
        self.cache.insert(key.to_string(), entry).await;

        Ok(new_value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        match self.live_entry(key).await {
            Some(entry) => {
                let new_entry = StoreEntry {
                    data: entry.data,
                    expires_at: Some(Self::current_time_millis() + ttl.as_millis() as u64),
                };
                self.cache.insert(key.to_string(), new_entry).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        match self.live_entry(key).await {
            Some(StoreEntry {
                expires_at: Some(at),
                ..
            }) => {
                let now = Self::current_time_millis();
                Ok(Some(Duration::from_millis(at.saturating_sub(now))))
            }
            _ => Ok(None),
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        self.cache.run_pending_tasks().await;
        Ok(self.cache.entry_count() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::KeyStoreExt;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = InMemoryStore::new();

        store
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<String> = store.get("key1").await.unwrap();
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = InMemoryStore::new();

        let result: Option<String> = store.get("missing").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let store = InMemoryStore::new();

        store
            .set("key1", &"value1", Duration::from_millis(50))
            .await
            .unwrap();

        let result: Option<String> = store.get("key1").await.unwrap();
        assert!(result.is_some());

        tokio::time::sleep(Duration::from_millis(100)).await;

        let result: Option<String> = store.get("key1").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryStore::new();

        store
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();

        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_prefix() {
        let store = InMemoryStore::new();

        store
            .set("search:a", &"1", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set("search:b", &"2", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set("listing:1", &"3", Duration::from_secs(60))
            .await
            .unwrap();

        let deleted = store.delete_prefix("search:").await.unwrap();
        assert_eq!(deleted, 2);

        let kept: Option<String> = store.get("listing:1").await.unwrap();
        assert!(kept.is_some());
    }

    #[tokio::test]
    async fn test_count_prefix() {
        let store = InMemoryStore::new();

        store
            .set("listing:1", &"a", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set("listing:2", &"b", Duration::from_secs(60))
            .await
            .unwrap();
        store
            .set("search:tok", &"c", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(store.count_prefix("listing:").await.unwrap(), 2);
        assert_eq!(store.count_prefix("favorites:").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_from_missing() {
        let store = InMemoryStore::new();

        let val = store.increment("views:42", 1).await.unwrap();
        assert_eq!(val, 1);

        let val = store.increment("views:42", 1).await.unwrap();
        assert_eq!(val, 2);
    }

    #[tokio::test]
    async fn test_increment_keeps_ttl() {
        let store = InMemoryStore::new();

        store.increment("views:42", 1).await.unwrap();
        store.expire("views:42", Duration::from_secs(5)).await.unwrap();
        store.increment("views:42", 1).await.unwrap();

        let remaining = store.ttl("views:42").await.unwrap();
        assert!(remaining.is_some());
        assert!(remaining.unwrap() <= Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_expire_missing_key() {
        let store = InMemoryStore::new();

        let updated = store.expire("missing", Duration::from_secs(5)).await.unwrap();
        assert!(!updated);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = InMemoryStore::new();

        store
            .set("key1", &"value1", Duration::from_secs(60))
            .await
            .unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_usage_unreported() {
        let store = InMemoryStore::new();
        assert_eq!(store.memory_usage().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_nx() {
        let store = InMemoryStore::new();

        assert!(store
            .set_nx("lease", &"a", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!store
            .set_nx("lease", &"b", Duration::from_secs(60))
            .await
            .unwrap());

        let value: Option<String> = store.get("lease").await.unwrap();
        assert_eq!(value, Some("a".to_string()));
    }

    #[tokio::test]
    async fn test_set_nx_after_expiry() {
        let store = InMemoryStore::new();

        store
            .set_nx("lease", &"a", Duration::from_millis(50))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(store
            .set_nx("lease", &"b", Duration::from_secs(60))
            .await
            .unwrap());
    }
}
