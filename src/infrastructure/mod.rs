//! Infrastructure layer - External service implementations

pub mod cache;
pub mod listing_store;
pub mod logging;
pub mod services;
