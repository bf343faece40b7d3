//! Key store factory for runtime backend selection

use std::sync::Arc;

use crate::domain::cache::KeyStore;
use crate::domain::DomainError;

use super::in_memory::{InMemoryStore, InMemoryStoreConfig};
use super::redis::{RedisStore, RedisStoreConfig};

/// Supported key store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    /// In-memory store using moka
    #[default]
    InMemory,
    /// Redis store
    Redis,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::InMemory => write!(f, "in_memory"),
            StoreBackend::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(StoreBackend::InMemory),
            "redis" => Ok(StoreBackend::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown store backend: {}. Valid backends: in_memory, redis",
                s
            ))),
        }
    }
}

/// Configuration for the key store factory
#[derive(Debug, Clone, Default)]
pub struct KeyStoreConfig {
    /// Backend to create
    pub backend: StoreBackend,
    /// Redis URL (required for the Redis backend)
    pub redis_url: Option<String>,
    /// Key prefix isolating this deployment's keys
    pub key_prefix: Option<String>,
    /// Maximum capacity (in-memory backend)
    pub max_capacity: Option<u64>,
}

impl KeyStoreConfig {
    pub fn in_memory() -> Self {
        Self {
            backend: StoreBackend::InMemory,
            ..Default::default()
        }
    }

    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }
}

/// Creates a [`KeyStore`] from configuration
pub async fn create_key_store(config: &KeyStoreConfig) -> Result<Arc<dyn KeyStore>, DomainError> {
    match config.backend {
        StoreBackend::InMemory => {
            let mut in_memory_config = InMemoryStoreConfig::default();

            if let Some(capacity) = config.max_capacity {
                in_memory_config = in_memory_config.with_max_capacity(capacity);
            }

            Ok(Arc::new(InMemoryStore::with_config(in_memory_config)))
        }
        StoreBackend::Redis => {
            let url = config.redis_url.clone().ok_or_else(|| {
                DomainError::configuration("Redis URL is required for the redis backend")
            })?;

            let mut redis_config = RedisStoreConfig::new(url);

            if let Some(prefix) = &config.key_prefix {
                redis_config = redis_config.with_key_prefix(prefix.clone());
            }

            let store = RedisStore::connect(redis_config).await?;
            Ok(Arc::new(store))
        }
    }
}
