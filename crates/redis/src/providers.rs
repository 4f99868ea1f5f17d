//! One-call setup of the persistence provider and event hub

use std::sync::Arc;

use tracing::info;

use crate::config::RedisConfig;
use crate::connection::{ConnectionError, StoreConnection, TokenCredential};
use crate::hub::RedisLifeCycleEventHub;
use crate::persistence::RedisPersistenceProvider;

/// Persistence provider and event hub sharing one connection
///
/// The hub is returned unstarted; call [`RedisLifeCycleEventHub::start`]
/// once subscribers are registered.
#[derive(Clone)]
pub struct RedisProviders {
    pub connection: StoreConnection,
    pub persistence: Arc<RedisPersistenceProvider>,
    pub event_hub: Arc<RedisLifeCycleEventHub>,
}

impl RedisProviders {
    /// Connect and build both providers from `config`
    pub async fn connect(
        config: &RedisConfig,
        credential: Option<&dyn TokenCredential>,
    ) -> Result<Self, ConnectionError> {
        let connection = StoreConnection::connect(config, credential).await?;
        let providers = Self::from_connection(connection, config);

        info!(
            prefix = %config.prefix,
            channel = %config.channel,
            remove_complete = config.remove_complete,
            "Redis providers ready"
        );
        Ok(providers)
    }

    /// Build both providers on an existing connection
    pub fn from_connection(connection: StoreConnection, config: &RedisConfig) -> Self {
        let persistence = Arc::new(RedisPersistenceProvider::redis(
            &connection,
            config.prefix.clone(),
            config.remove_complete,
        ));
        let event_hub = Arc::new(RedisLifeCycleEventHub::redis(
            &connection,
            config.channel.clone(),
        ));

        Self {
            connection,
            persistence,
            event_hub,
        }
    }
}
