// Redis Configuration
//
// Connection, namespace and channel settings, loaded from environment variables
// or built in code.

use std::env;

use serde::{Deserialize, Serialize};

/// Errors raised while reading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown connection mode: {0}. Use 'connection_string' or 'managed_identity'")]
    UnknownMode(String),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// How to authenticate against Redis
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// Plain `redis://` or `rediss://` connection string (default)
    #[default]
    ConnectionString,

    /// Exchange a managed-identity access token for Redis credentials
    ManagedIdentity,
}

impl std::str::FromStr for ConnectionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "connection_string" | "connection-string" | "connectionstring" | "" => {
                Ok(ConnectionMode::ConnectionString)
            }
            "managed_identity" | "managed-identity" | "managedidentity" => {
                Ok(ConnectionMode::ManagedIdentity)
            }
            _ => Err(ConfigError::UnknownMode(s.to_string())),
        }
    }
}

/// Configuration for the Redis provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedisConfig {
    pub mode: ConnectionMode,

    /// Used in [`ConnectionMode::ConnectionString`] mode
    pub connection_string: String,

    /// Used in [`ConnectionMode::ManagedIdentity`] mode
    pub host: Option<String>,

    /// Used in [`ConnectionMode::ManagedIdentity`] mode
    pub port: u16,

    /// Client id of a user-assigned managed identity
    pub managed_identity_client_id: Option<String>,

    /// Namespace for every key, so deployments can share one server
    pub prefix: String,

    /// Pub/sub channel carrying lifecycle events
    pub channel: String,

    /// Delete workflows once they complete
    pub remove_complete: bool,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::ConnectionString,
            connection_string: "redis://127.0.0.1:6379".to_string(),
            host: None,
            port: 6380,
            managed_identity_client_id: None,
            prefix: "workflow".to_string(),
            channel: "workflow-lifecycle".to_string(),
            remove_complete: false,
        }
    }
}

impl RedisConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `REDIS_CONNECTION_MODE`: `connection_string` (default) or `managed_identity`
    /// - `REDIS_URL`: connection string (default: redis://127.0.0.1:6379)
    /// - `REDIS_HOST`: host for managed identity mode
    /// - `REDIS_PORT`: TLS port for managed identity mode (default: 6380)
    /// - `REDIS_MANAGED_IDENTITY_CLIENT_ID`: user-assigned identity client id
    /// - `REDIS_PREFIX`: key namespace (default: workflow)
    /// - `REDIS_CHANNEL`: lifecycle channel (default: workflow-lifecycle)
    /// - `REDIS_REMOVE_COMPLETE`: delete completed workflows (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let mode = env::var("REDIS_CONNECTION_MODE")
            .unwrap_or_default()
            .parse()?;

        let port = match env::var("REDIS_PORT") {
            Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                name: "REDIS_PORT",
                value: v,
            })?,
            Err(_) => defaults.port,
        };

        let remove_complete = env::var("REDIS_REMOVE_COMPLETE")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(defaults.remove_complete);

        let config = Self {
            mode,
            connection_string: env::var("REDIS_URL").unwrap_or(defaults.connection_string),
            host: env::var("REDIS_HOST").ok(),
            port,
            managed_identity_client_id: env::var("REDIS_MANAGED_IDENTITY_CLIENT_ID").ok(),
            prefix: env::var("REDIS_PREFIX").unwrap_or(defaults.prefix),
            channel: env::var("REDIS_CHANNEL").unwrap_or(defaults.channel),
            remove_complete,
        };
        config.validate()?;
        Ok(config)
    }

    /// Plain connection string configuration
    pub fn connection_string(url: impl Into<String>) -> Self {
        Self {
            connection_string: url.into(),
            ..Self::default()
        }
    }

    /// Managed identity configuration
    pub fn managed_identity(host: impl Into<String>, port: u16) -> Self {
        Self {
            mode: ConnectionMode::ManagedIdentity,
            host: Some(host.into()),
            port,
            ..Self::default()
        }
    }

    /// Set the key prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the lifecycle channel
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    /// Set the managed identity client id
    pub fn with_managed_identity_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.managed_identity_client_id = Some(client_id.into());
        self
    }

    /// Delete workflows once they complete
    pub fn with_remove_complete(mut self, remove_complete: bool) -> Self {
        self.remove_complete = remove_complete;
        self
    }

    /// Check that the settings required by the selected mode are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.is_empty() {
            return Err(ConfigError::Missing("prefix"));
        }
        if self.channel.is_empty() {
            return Err(ConfigError::Missing("channel"));
        }
        match self.mode {
            ConnectionMode::ConnectionString if self.connection_string.is_empty() => {
                Err(ConfigError::Missing("connection_string"))
            }
            ConnectionMode::ManagedIdentity if self.host.as_deref().unwrap_or("").is_empty() => {
                Err(ConfigError::Missing("host"))
            }
            _ => Ok(()),
        }
    }
}
