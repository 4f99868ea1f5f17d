// Redis pub/sub transport
//
// Listening uses a dedicated pub/sub connection per session; publishing goes
// through the shared multiplexed connection.

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::ConnectionManager;
use tracing::{error, instrument, warn};

use super::transport::{ChannelPublisher, ChannelSession, ChannelTransport, HubError};
use crate::connection::StoreConnection;

/// Channel transport over Redis PUBLISH/SUBSCRIBE
#[derive(Clone, Debug)]
pub struct RedisChannelTransport {
    connection: StoreConnection,
}

impl RedisChannelTransport {
    pub fn new(connection: StoreConnection) -> Self {
        Self { connection }
    }
}

struct RedisPublisher {
    conn: ConnectionManager,
    channel: String,
}

#[async_trait]
impl ChannelPublisher for RedisPublisher {
    #[instrument(skip(self, payload), fields(channel = %self.channel))]
    async fn publish(&self, payload: String) -> Result<(), HubError> {
        let mut conn = self.conn.clone();
        redis::cmd("PUBLISH")
            .arg(&self.channel)
            .arg(payload)
            .query_async::<i64>(&mut conn)
            .await
            .map(|_receivers| ())
            .map_err(|e| {
                error!(error = %e, "Failed to publish lifecycle event");
                HubError::Transport(e.to_string())
            })
    }
}

#[async_trait]
impl ChannelTransport for RedisChannelTransport {
    #[instrument(skip(self))]
    async fn open(&self, channel: &str) -> Result<ChannelSession, HubError> {
        let mut pubsub = self
            .connection
            .client()
            .get_async_pubsub()
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| HubError::Transport(e.to_string()))?;

        let channel_name = channel.to_string();
        let messages = pubsub
            .into_on_message()
            .filter_map(move |msg| {
                let payload = match msg.get_payload::<String>() {
                    Ok(payload) => Some(payload),
                    Err(e) => {
                        warn!(channel = %channel_name, error = %e, "Dropping non-text channel message");
                        None
                    }
                };
                futures::future::ready(payload)
            })
            .boxed();

        Ok(ChannelSession {
            publisher: Box::new(RedisPublisher {
                conn: self.connection.manager(),
                channel: channel.to_string(),
            }),
            messages,
        })
    }
}
