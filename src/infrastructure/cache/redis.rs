//! Redis key store implementation

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};

use crate::domain::cache::KeyStore;
use crate::domain::DomainError;

/// Configuration for the Redis key store
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis connection URL (e.g., "redis://127.0.0.1:6379")
    pub url: String,
    /// Key prefix isolating this deployment's keys
    pub key_prefix: Option<String>,
    /// Connection timeout
    pub connection_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: None,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl RedisStoreConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

/// Redis-backed [`KeyStore`]
///
/// All primitive operations (GET/SET/INCR/DEL) are atomic at the store
/// level, which is what the counter and invalidation paths rely on.
/// Prefix deletion uses SCAN rather than KEYS.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("config", &self.config)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisStore {
    /// Connects to Redis and returns the store
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Failed to create Redis client: {}", e)))?;

        let manager_config =
            ConnectionManagerConfig::new().set_connection_timeout(config.connection_timeout);
        let connection = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))?;

        Ok(Self { connection, config })
    }

    pub async fn with_url(url: impl Into<String>) -> Result<Self, DomainError> {
        Self::connect(RedisStoreConfig::new(url)).await
    }

    fn prefix_key(&self, key: &str) -> String {
        match &self.config.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut keys = Vec::new();

        loop {
            let (new_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(1000)
                .query_async(&mut conn)
                .await
                .map_err(|e| {
                    DomainError::cache(format!("Failed to scan keys '{}': {}", pattern, e))
                })?;

            keys.extend(batch);
            cursor = new_cursor;

            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }
}

#[async_trait]
impl KeyStore for RedisStore {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let result: Option<String> = conn
            .get(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get key '{}': {}", key, e)))?;

        Ok(result)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs = ttl.as_secs().max(1);

        let _: () = conn
            .set_ex(&prefixed_key, value, ttl_secs)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn set_nx_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs = ttl.as_secs().max(1);

        // SET NX EX is atomic; "OK" if set, nil if the key existed
        let result: Option<String> = redis::cmd("SET")
            .arg(&prefixed_key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to set_nx key '{}': {}", key, e)))?;

        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let deleted: i32 = conn
            .del(&prefixed_key)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(deleted > 0)
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<usize, DomainError> {
        let pattern = format!("{}*", self.prefix_key(prefix));
        let keys = self.scan_keys(&pattern).await?;

        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.connection.clone();
        let deleted: i64 = conn
            .del(&keys)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to delete keys: {}", e)))?;

        Ok(deleted as usize)
    }

    async fn count_prefix(&self, prefix: &str) -> Result<usize, DomainError> {
        let pattern = format!("{}*", self.prefix_key(prefix));
        Ok(self.scan_keys(&pattern).await?.len())
    }

    async fn increment(&self, key: &str, delta: i64) -> Result<i64, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let new_value: i64 = conn
            .incr(&prefixed_key, delta)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to increment key '{}': {}", key, e)))?;

        Ok(new_value)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs = ttl.as_secs().max(1) as i64;

        let updated: bool = conn.expire(&prefixed_key, ttl_secs).await.map_err(|e| {
            DomainError::cache(format!("Failed to update TTL for key '{}': {}", key, e))
        })?;

        Ok(updated)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, DomainError> {
        let prefixed_key = self.prefix_key(key);
        let mut conn = self.connection.clone();

        let ttl_secs: i64 = conn.ttl(&prefixed_key).await.map_err(|e| {
            DomainError::cache(format!("Failed to get TTL for key '{}': {}", key, e))
        })?;

        // Redis returns -2 if the key doesn't exist, -1 if it has no TTL
        if ttl_secs < 0 {
            Ok(None)
        } else {
            Ok(Some(Duration::from_secs(ttl_secs as u64)))
        }
    }

    async fn clear(&self) -> Result<(), DomainError> {
        match &self.config.key_prefix {
            Some(_) => {
                self.delete_prefix("").await?;
            }
            None => {
                let mut conn = self.connection.clone();
                redis::cmd("FLUSHDB")
                    .query_async::<()>(&mut conn)
                    .await
                    .map_err(|e| DomainError::cache(format!("Failed to flush database: {}", e)))?;
            }
        }

        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        match &self.config.key_prefix {
            Some(_) => {
                let pattern = format!("{}*", self.prefix_key(""));
                Ok(self.scan_keys(&pattern).await?.len())
            }
            None => {
                let mut conn = self.connection.clone();
                let size: usize = redis::cmd("DBSIZE")
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| {
                        DomainError::cache(format!("Failed to get database size: {}", e))
                    })?;
                Ok(size)
            }
        }
    }

    async fn memory_usage(&self) -> Result<Option<u64>, DomainError> {
        let mut conn = self.connection.clone();

        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache(format!("Failed to get memory info: {}", e)))?;

        let used = info
            .lines()
            .find_map(|line| line.strip_prefix("used_memory:"))
            .and_then(|v| v.trim().parse::<u64>().ok());

        Ok(used)
    }
}
