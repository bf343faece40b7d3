//! Cache domain - key-value store abstraction, namespaces and key building

mod criteria;
mod envelope;
mod namespace;
mod repository;

pub use criteria::QueryCriteria;
pub use envelope::CachedEnvelope;
pub use namespace::CacheNamespace;
pub use repository::{KeyStore, KeyStoreExt};

#[cfg(test)]
pub use repository::mock::MockKeyStore;
