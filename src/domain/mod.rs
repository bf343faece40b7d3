//! Domain layer - cache abstractions and listing-platform types

pub mod cache;
pub mod listing;

mod error;

pub use error::DomainError;
