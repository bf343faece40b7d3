//! KeyStore trait definition
//!
//! The key-value store is the only component that touches the external
//! cache backend. Everything above it (domain cache, view counter, warming)
//! goes through this trait, never through a client directly.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::domain::DomainError;

/// Async key-value store with TTL support
///
/// Uses JSON strings internally to be dyn-compatible. Use [`KeyStoreExt`]
/// for typed get/set operations. Implementations return `Err` on backend
/// failure; callers in the service layer translate those errors into
/// misses and no-ops (fail-open).
#[async_trait]
pub trait KeyStore: Send + Sync + Debug {
    /// Gets a raw JSON value
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Sets a raw JSON value with a TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Sets a value only if the key does not exist, with a TTL.
    /// Returns true when the value was set.
    async fn set_nx_raw(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, DomainError> {
        if self.get_raw(key).await?.is_some() {
            Ok(false)
        } else {
            self.set_raw(key, value, ttl).await?;
            Ok(true)
        }
    }

    /// Deletes a key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;

    /// Deletes every key starting with the given prefix, returning the count
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, DomainError>;

    /// Counts the keys starting with the given prefix
    async fn count_prefix(&self, prefix: &str) -> Result<usize, DomainError>;

    /// Atomically increments a numeric value, returning the new value.
    /// A missing key counts as zero, so the first increment returns `delta`.
    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError>;

    /// Updates the TTL for an existing key
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError>;

    /// Gets the remaining TTL for a key
    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError>;

    /// Removes every entry owned by this store
    async fn clear(&self) -> Result<(), DomainError>;

    /// Approximate number of keys in the store
    async fn size(&self) -> Result<usize, DomainError>;

    /// Memory used by the backend in bytes, if the backend reports it
    async fn memory_usage(&self) -> Result<Option<u64>, DomainError> {
        Ok(None)
    }
}

/// Extension trait providing typed get/set operations
pub trait KeyStoreExt: KeyStore {
    /// Gets a typed value
    fn get<'a, V>(
        &'a self,
        key: &'a str,
    ) -> impl std::future::Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            match self.get_raw(key).await? {
                Some(data) => {
                    let value: V = serde_json::from_str(&data).map_err(|e| {
                        DomainError::cache(format!("Failed to deserialize cached value: {}", e))
                    })?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }
    }

    /// Sets a typed value with a TTL
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_raw(key, &data, ttl).await
        }
    }

    /// Sets a typed value only if the key does not exist
    fn set_nx<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl std::future::Future<Output = Result<bool, DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let data = serde_json::to_string(value).map_err(|e| {
                DomainError::cache(format!("Failed to serialize cache value: {}", e))
            })?;
            self.set_nx_raw(key, &data, ttl).await
        }
    }
}

// Blanket implementation for all types implementing KeyStore
impl<T: KeyStore + ?Sized> KeyStoreExt for T {}
