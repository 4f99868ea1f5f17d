//! Persistence layer for workflows, events and event subscriptions
//!
//! This module provides:
//! - [`PersistenceProvider`] trait for record persistence and scheduling queries
//! - [`IndexedPersistenceProvider`] keeping records and their indices in a [`KeyValueBackend`]
//! - [`RedisBackend`] for production and [`InMemoryBackend`] for testing
//! - [`SchedulingIndex`] time-scored sorted sets behind the runnable and slug queues

mod backend;
mod index;
mod keys;
mod memory;
mod provider;
mod record;
mod redis;
mod store;

pub use backend::{KeyValueBackend, ScoreBound};
pub use index::{time_score, IndexHit, SchedulingIndex};
pub use keys::KeyNamespace;
pub use memory::InMemoryBackend;
pub use provider::IndexedPersistenceProvider;
pub use record::Record;
pub use self::redis::RedisBackend;
pub use store::{CommandHandler, PersistenceProvider, StoreError};

/// Provider backed by Redis
pub type RedisPersistenceProvider = IndexedPersistenceProvider<RedisBackend>;

/// Provider backed by process memory, for tests
pub type InMemoryPersistenceProvider = IndexedPersistenceProvider<InMemoryBackend>;

impl RedisPersistenceProvider {
    /// Create a Redis-backed provider on an established connection
    pub fn redis(
        connection: &crate::connection::StoreConnection,
        prefix: impl Into<String>,
        remove_complete: bool,
    ) -> Self {
        Self::new(RedisBackend::new(connection), prefix, remove_complete)
    }
}

impl InMemoryPersistenceProvider {
    /// Create an in-memory provider
    pub fn in_memory(prefix: impl Into<String>, remove_complete: bool) -> Self {
        Self::new(InMemoryBackend::new(), prefix, remove_complete)
    }
}
