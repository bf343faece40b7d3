pub mod invalidation;
pub mod listing_cache;
pub mod stats;
pub mod view_counter;
pub mod warming;

pub use invalidation::{InvalidationCoordinator, InvalidationSummary};
pub use listing_cache::{ListingCacheService, TtlPolicy};
pub use stats::{CacheStats, StatsInspector};
pub use view_counter::{ViewCounter, ViewCounterConfig};
pub use warming::{WarmingConfig, WarmingScheduler};
