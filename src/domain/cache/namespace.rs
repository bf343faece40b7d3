//! Cache namespaces - fixed key prefixes and TTL policy
//!
//! The key layout (`{prefix}:{scope}`) is persisted in the external store,
//! so prefixes must stay stable across releases.

use std::time::Duration;

/// Enumerated cache categories, each with a fixed key prefix and default TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheNamespace {
    /// Full listing detail, keyed by listing id
    ListingDetail,
    /// Search result set, keyed by canonicalized query criteria
    QueryResult,
    /// User session payload, keyed by user id
    Session,
    /// User favorites set, keyed by user id
    Favorites,
    /// Daily analytics snapshot, keyed by ISO date
    AnalyticsDaily,
    /// Shared most-viewed-listings list (single key)
    PopularList,
    /// Per-listing view counter, keyed by listing id
    ViewCounter,
}

impl CacheNamespace {
    pub const ALL: [CacheNamespace; 7] = [
        CacheNamespace::ListingDetail,
        CacheNamespace::QueryResult,
        CacheNamespace::Session,
        CacheNamespace::Favorites,
        CacheNamespace::AnalyticsDaily,
        CacheNamespace::PopularList,
        CacheNamespace::ViewCounter,
    ];

    /// Fixed scope for the single shared popular-listings key
    pub const POPULAR_SCOPE: &'static str = "listings";

    /// Stable key prefix for this namespace
    pub fn prefix(&self) -> &'static str {
        match self {
            CacheNamespace::ListingDetail => "listing",
            CacheNamespace::QueryResult => "search",
            CacheNamespace::Session => "session",
            CacheNamespace::Favorites => "favorites",
            CacheNamespace::AnalyticsDaily => "analytics",
            CacheNamespace::PopularList => "popular",
            CacheNamespace::ViewCounter => "views",
        }
    }

    /// Default TTL applied to writes in this namespace
    pub fn default_ttl(&self) -> Duration {
        match self {
            CacheNamespace::ListingDetail => Duration::from_secs(3600),
            CacheNamespace::QueryResult => Duration::from_secs(900),
            CacheNamespace::Session => Duration::from_secs(86_400),
            CacheNamespace::Favorites => Duration::from_secs(3600),
            CacheNamespace::AnalyticsDaily => Duration::from_secs(604_800),
            CacheNamespace::PopularList => Duration::from_secs(1800),
            CacheNamespace::ViewCounter => Duration::from_secs(86_400),
        }
    }

    /// Builds a full key for a scope in this namespace
    pub fn key(&self, scope: impl AsRef<str>) -> String {
        format!("{}:{}", self.prefix(), scope.as_ref())
    }

    /// The deletion prefix covering every key in this namespace
    pub fn wildcard_prefix(&self) -> String {
        format!("{}:", self.prefix())
    }
}

impl std::fmt::Display for CacheNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.prefix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(CacheNamespace::ListingDetail.key("42"), "listing:42");
        assert_eq!(CacheNamespace::Session.key("7"), "session:7");
        assert_eq!(
            CacheNamespace::PopularList.key(CacheNamespace::POPULAR_SCOPE),
            "popular:listings"
        );
    }

    #[test]
    fn test_prefixes_are_unique() {
        let mut prefixes: Vec<&str> = CacheNamespace::ALL.iter().map(|n| n.prefix()).collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), CacheNamespace::ALL.len());
    }

    #[test]
    fn test_default_ttls() {
        assert_eq!(
            CacheNamespace::QueryResult.default_ttl(),
            Duration::from_secs(900)
        );
        assert_eq!(
            CacheNamespace::AnalyticsDaily.default_ttl(),
            Duration::from_secs(604_800)
        );
    }
}
