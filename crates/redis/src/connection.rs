//! Connection bootstrapping
//!
//! [`StoreConnection`] is the one live handle to Redis. It is built once from a
//! [`RedisConfig`] and cloned into every consumer; clones share the same
//! multiplexed connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use tracing::{info, instrument};

use crate::config::{ConfigError, ConnectionMode, RedisConfig};

/// Errors raised while establishing the connection
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("managed identity mode requires a token credential")]
    MissingCredential,

    #[error("failed to obtain credentials: {0}")]
    Credential(String),

    #[error("failed to connect to Redis: {0}")]
    Redis(String),
}

/// Redis credentials obtained from an identity provider
#[derive(Clone)]
pub struct RedisCredentials {
    /// Principal name Redis authenticates (typically the identity's object id)
    pub username: String,

    /// Access token presented as the password
    pub password: String,

    pub expires_on: DateTime<Utc>,
}

impl std::fmt::Debug for RedisCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Exchanges a managed identity for Redis credentials
///
/// Supplied by the host, which owns the identity provider SDK.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// `client_id` selects a user-assigned identity; `None` means system-assigned
    async fn credentials(&self, client_id: Option<&str>) -> anyhow::Result<RedisCredentials>;
}

/// Live, shareable handle to Redis
#[derive(Clone)]
pub struct StoreConnection {
    client: redis::Client,
    manager: ConnectionManager,
}

impl std::fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConnection")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl StoreConnection {
    /// Connect using `config`
    ///
    /// `credential` is required in managed identity mode and ignored otherwise.
    /// Failure is returned as-is; retrying is left to the caller.
    ///
    /// Managed identity credentials are resolved once. Reconnects reuse them,
    /// so a host running past token expiry must build a new connection.
    #[instrument(skip(config, credential), fields(mode = ?config.mode))]
    pub async fn connect(
        config: &RedisConfig,
        credential: Option<&dyn TokenCredential>,
    ) -> Result<Self, ConnectionError> {
        config.validate()?;

        let url = match config.mode {
            ConnectionMode::ConnectionString => config.connection_string.clone(),
            ConnectionMode::ManagedIdentity => {
                let credential = credential.ok_or(ConnectionError::MissingCredential)?;
                let credentials = credential
                    .credentials(config.managed_identity_client_id.as_deref())
                    .await
                    .map_err(|e| ConnectionError::Credential(e.to_string()))?;
                let host = config.host.as_deref().unwrap_or_default();
                managed_identity_url(host, config.port, &credentials)
            }
        };

        let client =
            redis::Client::open(url).map_err(|e| ConnectionError::Redis(e.to_string()))?;
        let manager = ConnectionManager::new(client.clone())
            .await
            .map_err(|e| ConnectionError::Redis(e.to_string()))?;

        info!("Successfully connected to Redis");
        Ok(Self { client, manager })
    }

    /// Client used to open dedicated connections (pub/sub)
    pub fn client(&self) -> &redis::Client {
        &self.client
    }

    /// Clone of the shared multiplexed connection
    pub fn manager(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

/// TLS URL carrying the exchanged credentials
fn managed_identity_url(host: &str, port: u16, credentials: &RedisCredentials) -> String {
    format!(
        "rediss://{}:{}@{}:{}",
        urlencoding::encode(&credentials.username),
        urlencoding::encode(&credentials.password),
        host,
        port
    )
}
