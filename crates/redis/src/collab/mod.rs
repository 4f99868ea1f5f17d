//! Interfaces of the engine services that run alongside the store
//!
//! The store never calls these. The surrounding engine serializes workflow
//! execution with a [`DistributedLockManager`] and hands work to its runners
//! through a [`QueueProvider`]. In-process implementations are provided for
//! hosts' tests.

mod lock;
mod queue;

pub use lock::{DistributedLockManager, InMemoryLockManager, LockLease};
pub use queue::{InMemoryQueueProvider, QueueProvider, QueueType};
