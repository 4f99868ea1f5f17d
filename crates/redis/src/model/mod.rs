//! Records and notifications handled by the provider
//!
//! - [`WorkflowInstance`] with its [`WorkflowStatus`]
//! - [`EventSubscription`] and its [`SubscriptionClaim`]
//! - [`Event`] published against a slug
//! - [`LifeCycleEvent`] broadcast through the hub
//! - [`ExecutionError`] and [`ScheduledCommand`] pass-through types

mod event;
mod execution;
mod lifecycle;
mod subscription;
mod workflow;

pub use event::Event;
pub use execution::{command_names, ExecutionError, ScheduledCommand};
pub use lifecycle::{LifeCycleEvent, LifeCycleEventKind};
pub use subscription::{EventSubscription, SubscriptionClaim};
pub use workflow::{WorkflowInstance, WorkflowStatus};
