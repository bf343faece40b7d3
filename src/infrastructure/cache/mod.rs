//! Cache infrastructure - key store implementations

mod factory;
mod in_memory;
mod redis;

pub use factory::{create_key_store, KeyStoreConfig, StoreBackend};
pub use in_memory::{InMemoryStore, InMemoryStoreConfig};
pub use redis::{RedisStore, RedisStoreConfig};
