//! Cached value envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached payload together with its capture timestamp.
///
/// Every write stores when the value was captured so staleness can be
/// reasoned about independently of the TTL that happens to be left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEnvelope<T> {
    pub payload: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedEnvelope<T> {
    pub fn new(payload: T) -> Self {
        Self {
            payload,
            cached_at: Utc::now(),
        }
    }

    /// Seconds elapsed since the payload was captured
    pub fn age_secs(&self) -> i64 {
        (Utc::now() - self.cached_at).num_seconds()
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}
