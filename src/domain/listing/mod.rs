//! Listing domain - payload types and the primary-store interface

mod entity;
mod store;

pub use entity::{DailySnapshot, Listing, ListingSummary, SearchPage};
pub use store::ListingStore;

#[cfg(test)]
pub use store::mock::MockListingStore;
