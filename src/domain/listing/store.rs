//! Primary-store interface
//!
//! The narrow surface the cache layer needs from the relational store.
//! Warming sub-tasks and populate functions go through this trait; nothing
//! in this crate issues queries outside of it.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::cache::QueryCriteria;
use crate::domain::DomainError;

use super::entity::{DailySnapshot, Listing, ListingSummary, SearchPage};

/// Read and counter-flush operations against the primary store
#[async_trait]
pub trait ListingStore: Send + Sync + std::fmt::Debug {
    /// Loads one listing by id
    async fn listing(&self, id: i64) -> Result<Option<Listing>, DomainError>;

    /// Most viewed listings, descending by durable view count
    async fn popular_listings(&self, limit: i64) -> Result<Vec<ListingSummary>, DomainError>;

    /// Listings flagged as featured
    async fn featured_listings(&self, limit: i64) -> Result<Vec<ListingSummary>, DomainError>;

    /// Most recently created listings
    async fn recent_listings(&self, limit: i64) -> Result<Vec<ListingSummary>, DomainError>;

    /// Runs a filtered search against the primary store
    async fn search(&self, criteria: &QueryCriteria) -> Result<SearchPage, DomainError>;

    /// Aggregated analytics for one day
    async fn daily_snapshot(&self, date: NaiveDate) -> Result<Option<DailySnapshot>, DomainError>;

    /// Adds a batch of buffered view counts to the durable counter column
    async fn add_view_counts(&self, listing_id: i64, count: i64) -> Result<(), DomainError>;
}
