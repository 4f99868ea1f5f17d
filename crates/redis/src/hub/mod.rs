//! Lifecycle event hub
//!
//! This module provides:
//! - [`LifeCycleEventHub`] publishing events and dispatching received ones
//! - [`LifeCycleSubscriber`] callbacks held in a [`SubscriberRegistry`]
//! - [`ChannelTransport`] with [`RedisChannelTransport`] for production and
//!   [`InMemoryChannelTransport`] for testing

mod event_hub;
mod redis;
mod registry;
mod transport;

pub use event_hub::{HubStatus, LifeCycleEventHub, DEFAULT_SHUTDOWN_TIMEOUT};
pub use registry::{FnSubscriber, LifeCycleSubscriber, SubscriberRegistry, SubscriptionHandle};
pub use self::redis::RedisChannelTransport;
pub use transport::{
    ChannelPublisher, ChannelSession, ChannelTransport, HubError, InMemoryChannelTransport,
};

/// Hub broadcasting over Redis pub/sub
pub type RedisLifeCycleEventHub = LifeCycleEventHub<RedisChannelTransport>;

/// Hub broadcasting within the process, for tests
pub type InMemoryLifeCycleEventHub = LifeCycleEventHub<InMemoryChannelTransport>;

impl RedisLifeCycleEventHub {
    /// Create a hub on an established connection
    pub fn redis(
        connection: &crate::connection::StoreConnection,
        channel: impl Into<String>,
    ) -> Self {
        Self::new(RedisChannelTransport::new(connection.clone()), channel)
    }
}

impl InMemoryLifeCycleEventHub {
    /// Create a hub with its own in-process transport
    pub fn in_memory(channel: impl Into<String>) -> Self {
        Self::new(InMemoryChannelTransport::new(), channel)
    }
}
