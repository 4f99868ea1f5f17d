// Subscriber Registry
//
// Local callbacks notified of every lifecycle event the hub receives.
// Registration hands back a handle so a subscriber can later be removed.

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::RwLock;
use tracing::warn;

use crate::model::LifeCycleEvent;

// ============================================================================
// LifeCycleSubscriber Trait
// ============================================================================

/// Receives lifecycle events broadcast on the hub's channel.
///
/// Subscribers run one after another on the hub's receive task, so a slow
/// subscriber delays the ones after it and the next message. Returned errors
/// and panics are logged and do not reach other subscribers.
#[async_trait]
pub trait LifeCycleSubscriber: Send + Sync {
    async fn on_event(&self, event: &LifeCycleEvent) -> anyhow::Result<()>;

    /// Human-readable name for logging/debugging.
    fn name(&self) -> &'static str {
        "LifeCycleSubscriber"
    }
}

/// Adapts a synchronous closure into a [`LifeCycleSubscriber`]
pub struct FnSubscriber<F> {
    callback: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&LifeCycleEvent) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<F> LifeCycleSubscriber for FnSubscriber<F>
where
    F: Fn(&LifeCycleEvent) -> anyhow::Result<()> + Send + Sync,
{
    async fn on_event(&self, event: &LifeCycleEvent) -> anyhow::Result<()> {
        (self.callback)(event)
    }

    fn name(&self) -> &'static str {
        "FnSubscriber"
    }
}

// ============================================================================
// SubscriberRegistry
// ============================================================================

/// Stable handle returned by [`SubscriberRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionHandle(u64);

/// Registered subscribers, iterated in registration order
#[derive(Default)]
pub struct SubscriberRegistry {
    next_handle: AtomicU64,
    subscribers: RwLock<BTreeMap<SubscriptionHandle, Arc<dyn LifeCycleSubscriber>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, subscriber: Arc<dyn LifeCycleSubscriber>) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().insert(handle, subscriber);
        handle
    }

    /// Returns whether the handle was registered
    pub fn unregister(&self, handle: SubscriptionHandle) -> bool {
        self.subscribers.write().remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.read().is_empty()
    }

    /// Current subscribers, in registration order
    fn snapshot(&self) -> Vec<Arc<dyn LifeCycleSubscriber>> {
        self.subscribers.read().values().cloned().collect()
    }

    /// Deliver `event` to every subscriber, isolating failures
    ///
    /// Returns the number of subscribers that failed.
    pub async fn dispatch(&self, event: &LifeCycleEvent) -> usize {
        let mut failures = 0;

        for subscriber in self.snapshot() {
            let outcome = AssertUnwindSafe(subscriber.on_event(event))
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(
                        subscriber = subscriber.name(),
                        event_type = event.kind.name(),
                        "Error on event subscriber: {}",
                        e
                    );
                }
                Err(panic) => {
                    failures += 1;
                    warn!(
                        subscriber = subscriber.name(),
                        event_type = event.kind.name(),
                        "Event subscriber panicked: {}",
                        panic_message(&*panic)
                    );
                }
            }
        }

        failures
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
