// Lifecycle Event Hub
//
// Broadcasts lifecycle events on one named channel and hands every event
// received on it, including our own, to the local subscriber registry.
//
// NotStarted -> Started -> Stopped -> Started -> ...
//
// A session whose channel stream ends reports Stopped and may be restarted.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::registry::{FnSubscriber, LifeCycleSubscriber, SubscriberRegistry, SubscriptionHandle};
use super::transport::{ChannelPublisher, ChannelTransport, HubError};
use crate::model::LifeCycleEvent;

/// How long `stop` waits for an in-flight dispatch
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Hub lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubStatus {
    NotStarted,
    Started,
    Stopped,
}

enum HubState {
    NotStarted,
    Started(Running),
    Stopped,
}

struct Running {
    publisher: Arc<dyn ChannelPublisher>,
    shutdown: oneshot::Sender<()>,
    receiver: JoinHandle<()>,
}

impl HubState {
    /// The running session, unless its receive task has already ended
    fn live(&self) -> Option<&Running> {
        match self {
            HubState::Started(running) if !running.receiver.is_finished() => Some(running),
            _ => None,
        }
    }
}

/// Pub/sub hub for workflow lifecycle events
pub struct LifeCycleEventHub<T: ChannelTransport> {
    transport: T,
    channel: String,
    registry: Arc<SubscriberRegistry>,
    state: Mutex<HubState>,
    shutdown_timeout: Duration,
}

impl<T: ChannelTransport> LifeCycleEventHub<T> {
    pub fn new(transport: T, channel: impl Into<String>) -> Self {
        Self {
            transport,
            channel: channel.into(),
            registry: Arc::new(SubscriberRegistry::new()),
            state: Mutex::new(HubState::NotStarted),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }

    /// Set how long `stop` waits for the event being dispatched
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn status(&self) -> HubStatus {
        let state = self.state.lock().await;
        match &*state {
            HubState::NotStarted => HubStatus::NotStarted,
            HubState::Started(_) if state.live().is_some() => HubStatus::Started,
            HubState::Started(_) | HubState::Stopped => HubStatus::Stopped,
        }
    }

    pub async fn is_started(&self) -> bool {
        self.status().await == HubStatus::Started
    }

    /// Register a subscriber; valid in any state
    pub fn subscribe(&self, subscriber: Arc<dyn LifeCycleSubscriber>) -> SubscriptionHandle {
        let handle = self.registry.register(subscriber);
        debug!(?handle, "Registered lifecycle subscriber");
        handle
    }

    /// Register a synchronous closure as a subscriber
    pub fn subscribe_fn<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&LifeCycleEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(Arc::new(FnSubscriber::new(callback)))
    }

    /// Returns whether the handle was registered
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        self.registry.unregister(handle)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }

    /// Broadcast `event` to every hub listening on the channel
    #[instrument(skip(self, event), fields(event_type = event.kind.name(), workflow_id = %event.workflow_instance_id))]
    pub async fn publish(&self, event: &LifeCycleEvent) -> Result<(), HubError> {
        let publisher = match self.state.lock().await.live() {
            Some(running) => running.publisher.clone(),
            None => return Err(HubError::NotStarted),
        };

        let payload =
            serde_json::to_string(event).map_err(|e| HubError::Serialization(e.to_string()))?;
        publisher.publish(payload).await
    }

    /// Open the channel and start dispatching received events
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn start(&self) -> Result<(), HubError> {
        let mut state = self.state.lock().await;
        if state.live().is_some() {
            return Err(HubError::AlreadyStarted);
        }

        let session = self.transport.open(&self.channel).await?;
        let (shutdown, shutdown_rx) = oneshot::channel();
        let receiver = tokio::spawn(receive_loop(
            session.messages,
            self.registry.clone(),
            shutdown_rx,
        ));

        *state = HubState::Started(Running {
            publisher: Arc::from(session.publisher),
            shutdown,
            receiver,
        });

        info!("Lifecycle event hub started");
        Ok(())
    }

    /// Unsubscribe from the channel and release its connection
    ///
    /// The hub reports Stopped as soon as this is called, so subscribers
    /// publishing meanwhile get [`HubError::NotStarted`]. Waits up to the
    /// shutdown timeout for the event being dispatched, then leaves the
    /// receive task to finish on its own. No-op unless started.
    #[instrument(skip(self), fields(channel = %self.channel))]
    pub async fn stop(&self) {
        let running = {
            let mut state = self.state.lock().await;
            match std::mem::replace(&mut *state, HubState::Stopped) {
                HubState::Started(running) => running,
                previous => {
                    *state = previous;
                    return;
                }
            }
        };

        let Running {
            shutdown,
            mut receiver,
            ..
        } = running;
        let _ = shutdown.send(());

        match tokio::time::timeout(self.shutdown_timeout, &mut receiver).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Lifecycle receive task ended abnormally"),
            Err(_) => warn!(
                timeout_ms = self.shutdown_timeout.as_millis() as u64,
                "Shutdown timeout reached, detaching lifecycle receive task"
            ),
        }

        info!("Lifecycle event hub stopped");
    }
}

/// Dispatch loop; ends on shutdown, on hub drop, or when the channel closes
async fn receive_loop(
    mut messages: BoxStream<'static, String>,
    registry: Arc<SubscriberRegistry>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            message = messages.next() => match message {
                Some(payload) => handle_message(&registry, &payload).await,
                None => {
                    error!("Lifecycle channel closed, hub no longer receiving events");
                    break;
                }
            },
        }
    }
}

async fn handle_message(registry: &SubscriberRegistry, payload: &str) {
    let event: LifeCycleEvent = match serde_json::from_str(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Skipping undecodable lifecycle message");
            return;
        }
    };

    let failures = registry.dispatch(&event).await;
    if failures > 0 {
        debug!(
            failures,
            event_type = event.kind.name(),
            "Lifecycle event dispatched with subscriber failures"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::InMemoryChannelTransport;
    use crate::model::LifeCycleEventKind;

    fn create_hub() -> LifeCycleEventHub<InMemoryChannelTransport> {
        LifeCycleEventHub::new(InMemoryChannelTransport::new(), "lifecycle")
    }

    fn create_test_event() -> LifeCycleEvent {
        LifeCycleEvent::new("wf-1", "order_flow", 1, LifeCycleEventKind::WorkflowCompleted)
    }

    #[tokio::test]
    async fn test_publish_before_start_fails() {
        let hub = create_hub();
        assert_eq!(hub.status().await, HubStatus::NotStarted);

        let result = hub.publish(&create_test_event()).await;
        assert!(matches!(result, Err(HubError::NotStarted)));
    }

    #[tokio::test]
    async fn test_start_twice_fails() {
        let hub = create_hub();
        hub.start().await.unwrap();

        assert!(matches!(hub.start().await, Err(HubError::AlreadyStarted)));
        hub.stop().await;
    }

    #[tokio::test]
    async fn test_stop_when_not_started_is_noop() {
        let hub = create_hub();
        hub.stop().await;
        assert_eq!(hub.status().await, HubStatus::NotStarted);
    }

    #[tokio::test]
    async fn test_stop_releases_channel() {
        let hub = create_hub();
        hub.start().await.unwrap();
        assert_eq!(hub.transport().listener_count("lifecycle"), 1);

        hub.stop().await;
        assert_eq!(hub.status().await, HubStatus::Stopped);
        assert_eq!(hub.transport().listener_count("lifecycle"), 0);
    }

    #[tokio::test]
    async fn test_stop_returns_after_timeout_when_dispatch_hangs() {
        let hub = create_hub().with_shutdown_timeout(Duration::from_millis(50));
        let (entered_tx, entered_rx) = oneshot::channel();
        let entered_tx = parking_lot::Mutex::new(Some(entered_tx));
        hub.subscribe(Arc::new(FnSubscriber::new(move |_event| {
            if let Some(tx) = entered_tx.lock().take() {
                let _ = tx.send(());
            }
            Ok(())
        })));
        hub.subscribe(Arc::new(Hanging));
        hub.start().await.unwrap();

        hub.publish(&create_test_event()).await.unwrap();
        entered_rx.await.unwrap();

        tokio::time::timeout(Duration::from_secs(3), hub.stop())
            .await
            .expect("stop waited past its shutdown timeout");
        assert_eq!(hub.status().await, HubStatus::Stopped);
    }

    struct Hanging;

    #[async_trait::async_trait]
    impl LifeCycleSubscriber for Hanging {
        async fn on_event(&self, _event: &LifeCycleEvent) -> anyhow::Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_undecodable_message_is_skipped() {
        let registry = SubscriberRegistry::new();
        handle_message(&registry, "{not json").await;
        handle_message(&registry, r#"{"type":"unknown"}"#).await;
    }
}
