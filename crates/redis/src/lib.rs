//! # Redis Workflow Provider
//!
//! Redis-backed persistence and lifecycle event broadcasting for a workflow engine.
//!
//! ## Features
//!
//! - **Record storage**: workflows, event subscriptions and events kept as JSON in per-type hashes
//! - **Scheduling indices**: time-scored sorted sets answer "what is due" and "who is waiting"
//! - **Atomic claims**: exactly one worker wins a subscription, arbitrated by `HSETNX`
//! - **Lifecycle hub**: pub/sub fan-out of tagged lifecycle events to local subscribers
//! - **In-memory twins**: every store and transport has an in-process implementation for tests
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      StoreConnection                         │
//! │  (connection string or managed identity, built once)        │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                               │
//!                 ▼                               ▼
//! ┌───────────────────────────────┐ ┌───────────────────────────┐
//! │  IndexedPersistenceProvider   │ │    LifeCycleEventHub       │
//! │  (hashes + sorted-set index)  │ │  (channel + subscribers)   │
//! └───────────────────────────────┘ └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use everruns_redis::prelude::*;
//!
//! let config = RedisConfig::from_env()?;
//! let providers = RedisProviders::connect(&config, None).await?;
//!
//! providers.event_hub.subscribe_fn(|event| {
//!     println!("{} -> {}", event.workflow_instance_id, event.kind.name());
//!     Ok(())
//! });
//! providers.event_hub.start().await?;
//!
//! let mut workflow = WorkflowInstance::new("order_flow", 1);
//! providers.persistence.create_workflow(&mut workflow).await?;
//! let due = providers.persistence.get_runnable_workflows(Utc::now()).await?;
//! ```

pub mod collab;
pub mod config;
pub mod connection;
pub mod hub;
pub mod model;
pub mod persistence;
pub mod providers;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::{ConnectionMode, RedisConfig};
    pub use crate::connection::{StoreConnection, TokenCredential};
    pub use crate::hub::{
        HubError, InMemoryLifeCycleEventHub, LifeCycleEventHub, LifeCycleSubscriber,
        RedisLifeCycleEventHub, SubscriptionHandle,
    };
    pub use crate::model::{
        Event, EventSubscription, LifeCycleEvent, LifeCycleEventKind, WorkflowInstance,
        WorkflowStatus,
    };
    pub use crate::persistence::{
        InMemoryPersistenceProvider, PersistenceProvider, RedisPersistenceProvider, StoreError,
    };
    pub use crate::providers::RedisProviders;
    pub use chrono::Utc;
}

// Re-export key types at crate root
pub use config::{ConfigError, ConnectionMode, RedisConfig};
pub use connection::{ConnectionError, RedisCredentials, StoreConnection, TokenCredential};
pub use hub::{
    HubError, InMemoryLifeCycleEventHub, LifeCycleEventHub, LifeCycleSubscriber,
    RedisLifeCycleEventHub, SubscriptionHandle,
};
pub use model::{
    Event, EventSubscription, ExecutionError, LifeCycleEvent, LifeCycleEventKind,
    ScheduledCommand, SubscriptionClaim, WorkflowInstance, WorkflowStatus,
};
pub use persistence::{
    InMemoryPersistenceProvider, PersistenceProvider, RedisPersistenceProvider, StoreError,
};
pub use providers::RedisProviders;
