use serde::Deserialize;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub counter: CounterConfig,
    pub warming: WarmingSection,
    pub database: DatabaseSection,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache backend: "in_memory" or "redis"
    pub backend: String,
    pub redis_url: String,
    /// Prefix applied to every Redis key
    pub key_prefix: String,
    /// In-memory backend capacity
    pub max_capacity: u64,
    /// Per-namespace TTL overrides in seconds, keyed by namespace prefix
    pub ttl_overrides: std::collections::HashMap<String, u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CounterConfig {
    /// Buffered views flushed to the primary store per batch
    pub flush_threshold: i64,
    /// Seconds an idle view counter key survives
    pub counter_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarmingSection {
    /// Start the warming schedule at boot
    pub enabled: bool,
    pub interval_minutes: u64,
    pub popular_limit: i64,
    pub featured_limit: i64,
    pub recent_limit: i64,
    /// Coordinate passes across instances through a store lease
    pub distributed_lease: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: "in_memory".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: String::new(),
            max_capacity: 10_000,
            ttl_overrides: std::collections::HashMap::new(),
        }
    }
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            flush_threshold: 10,
            counter_ttl_secs: 86_400,
        }
    }
}

impl Default for WarmingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 15,
            popular_limit: 10,
            featured_limit: 10,
            recent_limit: 10,
            distributed_lease: false,
        }
    }
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/listings".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
