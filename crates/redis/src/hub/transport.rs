//! Broadcast channel transport used by the event hub

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// Error type for hub operations
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// Publish attempted while the hub is not started
    #[error("event hub not started")]
    NotStarted,

    /// Start attempted while the hub is already running
    #[error("event hub already started")]
    AlreadyStarted,

    /// Channel could not be opened or written to
    #[error("transport error: {0}")]
    Transport(String),

    /// Event could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Write half of an open channel
#[async_trait]
pub trait ChannelPublisher: Send + Sync {
    /// Send a raw payload to every listener on the channel, including this one
    async fn publish(&self, payload: String) -> Result<(), HubError>;
}

/// An open channel: a publisher plus the stream of received payloads
///
/// Dropping the session unsubscribes and releases its connection.
pub struct ChannelSession {
    pub publisher: Box<dyn ChannelPublisher>,
    pub messages: BoxStream<'static, String>,
}

/// Opens named broadcast channels
#[async_trait]
pub trait ChannelTransport: Send + Sync + 'static {
    async fn open(&self, channel: &str) -> Result<ChannelSession, HubError>;
}

// ============================================================================
// In-process transport
// ============================================================================

/// In-process transport for testing
///
/// Clones share the same channels, so several hubs built on clones of one
/// transport behave like separate processes attached to one server.
#[derive(Clone)]
pub struct InMemoryChannelTransport {
    channels: Arc<Mutex<HashMap<String, broadcast::Sender<String>>>>,
    capacity: usize,
}

impl InMemoryChannelTransport {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Messages buffered per receiver before it starts lagging
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Number of open sessions listening on `channel`
    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .lock()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

impl Default for InMemoryChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemoryPublisher {
    sender: broadcast::Sender<String>,
}

#[async_trait]
impl ChannelPublisher for InMemoryPublisher {
    async fn publish(&self, payload: String) -> Result<(), HubError> {
        // Like PUBLISH, zero listeners is not an error
        let _ = self.sender.send(payload);
        Ok(())
    }
}

#[async_trait]
impl ChannelTransport for InMemoryChannelTransport {
    async fn open(&self, channel: &str) -> Result<ChannelSession, HubError> {
        let sender = self.sender(channel);
        let channel_name = channel.to_string();

        let messages = BroadcastStream::new(sender.subscribe())
            .filter_map(move |item| {
                let payload = match item {
                    Ok(payload) => Some(payload),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(channel = %channel_name, skipped, "channel listener lagged");
                        None
                    }
                };
                futures::future::ready(payload)
            })
            .boxed();

        Ok(ChannelSession {
            publisher: Box::new(InMemoryPublisher { sender }),
            messages,
        })
    }
}
