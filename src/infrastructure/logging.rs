use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::config::{LogFormat, LoggingConfig};

/// Initializes the global tracing subscriber from the logging section of
/// [`AppConfig`](crate::config::AppConfig).
///
/// Call once at process startup, before the first log line:
///
/// ```no_run
/// use listing_cache::config::AppConfig;
/// use listing_cache::infrastructure::logging::init_logging;
///
/// let config = AppConfig::default();
/// init_logging(&config.logging);
/// ```
pub fn init_logging(config: &LoggingConfig) {
    // RUST_LOG wins over the configured level so an operator can turn up
    // cache tracing without a config change
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }

    tracing::info!("Logging initialized with level: {}", config.level);
}
