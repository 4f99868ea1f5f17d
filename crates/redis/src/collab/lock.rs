// Distributed lock contract
//
// A lease is held until released or until its timeout passes, whichever
// comes first. Acquiring a held, unexpired resource fails without waiting.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::persistence::StoreError;

/// Proof of ownership returned by [`DistributedLockManager::acquire`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockLease {
    pub resource: String,
    pub token: String,
}

#[async_trait]
pub trait DistributedLockManager: Send + Sync + 'static {
    /// Take `resource` for at most `timeout`; `None` when someone else holds it
    async fn acquire(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> Result<Option<LockLease>, StoreError>;

    /// Give the lease back; stale or foreign leases are ignored
    async fn release(&self, lease: &LockLease) -> Result<(), StoreError>;
}

struct HeldLock {
    token: String,
    expires_at: Instant,
}

/// Single-process lock manager
#[derive(Default)]
pub struct InMemoryLockManager {
    locks: Mutex<HashMap<String, HeldLock>>,
}

impl InMemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `resource` is currently held by an unexpired lease
    pub fn is_locked(&self, resource: &str) -> bool {
        self.locks
            .lock()
            .get(resource)
            .is_some_and(|held| held.expires_at > Instant::now())
    }
}

#[async_trait]
impl DistributedLockManager for InMemoryLockManager {
    async fn acquire(
        &self,
        resource: &str,
        timeout: Duration,
    ) -> Result<Option<LockLease>, StoreError> {
        let now = Instant::now();
        let mut locks = self.locks.lock();

        if let Some(held) = locks.get(resource) {
            if held.expires_at > now {
                return Ok(None);
            }
            debug!(%resource, "taking over expired lock");
        }

        let token = Uuid::now_v7().to_string();
        locks.insert(
            resource.to_string(),
            HeldLock {
                token: token.clone(),
                expires_at: now + timeout,
            },
        );

        Ok(Some(LockLease {
            resource: resource.to_string(),
            token,
        }))
    }

    async fn release(&self, lease: &LockLease) -> Result<(), StoreError> {
        let mut locks = self.locks.lock();
        if locks
            .get(&lease.resource)
            .is_some_and(|held| held.token == lease.token)
        {
            locks.remove(&lease.resource);
        }
        Ok(())
    }
}
