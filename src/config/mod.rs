//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, CacheConfig, CounterConfig, DatabaseSection, LogFormat, LoggingConfig,
    WarmingSection,
};
