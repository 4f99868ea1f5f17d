//! PersistenceProvider trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::model::{
    Event, EventSubscription, ExecutionError, ScheduledCommand, WorkflowInstance,
};

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record required by a mutation does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Could not reach the substrate
    #[error("connection error: {0}")]
    Connection(String),

    /// Substrate rejected or failed a command
    #[error("database error: {0}")]
    Database(String),

    /// Stored or outgoing data could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored blob carries a different type discriminant than expected
    #[error("record type mismatch: expected {expected}, found {found}")]
    RecordTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Capability not offered by this store
    #[error("operation not supported: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

/// Callback invoked for each due command by [`PersistenceProvider::process_commands`]
pub type CommandHandler =
    dyn Fn(ScheduledCommand) -> BoxFuture<'static, Result<(), StoreError>> + Send + Sync;

/// Store for workflows, events and event subscriptions
///
/// Implementations keep every record's secondary index entries in line with
/// the record itself. Index writes are separate commands from record writes,
/// so readers must tolerate index entries pointing at deleted records.
#[async_trait]
pub trait PersistenceProvider: Send + Sync + 'static {
    // =========================================================================
    // Workflow Operations
    // =========================================================================

    /// Assign a fresh id to the workflow and persist it
    async fn create_workflow(&self, workflow: &mut WorkflowInstance) -> Result<String, StoreError>;

    /// Rewrite an existing workflow and re-derive its runnable index entry
    async fn persist_workflow(&self, workflow: &WorkflowInstance) -> Result<(), StoreError>;

    /// Persist a workflow, then create each of the given subscriptions
    async fn persist_workflow_with_subscriptions(
        &self,
        workflow: &WorkflowInstance,
        subscriptions: &mut [EventSubscription],
    ) -> Result<(), StoreError> {
        self.persist_workflow(workflow).await?;
        for subscription in subscriptions.iter_mut() {
            self.create_event_subscription(subscription).await?;
        }
        Ok(())
    }

    /// Ids of runnable workflows due at or before `as_of`
    async fn get_runnable_workflows(&self, as_of: DateTime<Utc>)
        -> Result<Vec<String>, StoreError>;

    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowInstance>, StoreError>;

    /// Batched lookup; ids without a record are skipped
    async fn get_workflows(&self, ids: &[String]) -> Result<Vec<WorkflowInstance>, StoreError>;

    // =========================================================================
    // Subscription Operations
    // =========================================================================

    /// Assign a fresh id to the subscription and persist it
    async fn create_event_subscription(
        &self,
        subscription: &mut EventSubscription,
    ) -> Result<String, StoreError>;

    /// Subscriptions to the slug that started at or before `as_of`
    async fn get_subscriptions(
        &self,
        event_name: &str,
        event_key: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<EventSubscription>, StoreError>;

    async fn get_subscription(&self, id: &str) -> Result<Option<EventSubscription>, StoreError>;

    /// First unclaimed subscription from [`get_subscriptions`](Self::get_subscriptions)
    async fn get_first_open_subscription(
        &self,
        event_name: &str,
        event_key: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<EventSubscription>, StoreError> {
        Ok(self
            .get_subscriptions(event_name, event_key, as_of)
            .await?
            .into_iter()
            .find(EventSubscription::is_open))
    }

    /// Claim a subscription for an external worker
    ///
    /// Returns `false` when another claim is already in place.
    async fn set_subscription_token(
        &self,
        id: &str,
        token: &str,
        worker_id: &str,
        expiry: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Release a claim, only if `token` is the one currently held
    async fn clear_subscription_token(&self, id: &str, token: &str) -> Result<(), StoreError>;

    /// Delete the subscription and its slug index entry
    async fn terminate_subscription(&self, id: &str) -> Result<(), StoreError>;

    // =========================================================================
    // Event Operations
    // =========================================================================

    /// Assign a fresh id to the event and persist it
    async fn create_event(&self, event: &mut Event) -> Result<String, StoreError>;

    async fn get_event(&self, id: &str) -> Result<Option<Event>, StoreError>;

    /// Ids of unprocessed events published at or before `as_of`
    async fn get_runnable_events(&self, as_of: DateTime<Utc>) -> Result<Vec<String>, StoreError>;

    /// Ids of events published to the slug at or after `as_of`
    async fn get_events_by_slug(
        &self,
        event_name: &str,
        event_key: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError>;

    async fn mark_event_processed(&self, id: &str) -> Result<(), StoreError>;

    async fn mark_event_unprocessed(&self, id: &str) -> Result<(), StoreError>;

    // =========================================================================
    // Errors, Commands and Setup (optional)
    // =========================================================================

    /// Execution errors are not retained by default
    async fn persist_errors(&self, _errors: &[ExecutionError]) -> Result<(), StoreError> {
        Ok(())
    }

    /// Whether [`schedule_command`](Self::schedule_command) and
    /// [`process_commands`](Self::process_commands) are available
    fn supports_scheduled_commands(&self) -> bool {
        false
    }

    async fn schedule_command(&self, _command: &ScheduledCommand) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("schedule_command"))
    }

    async fn process_commands(
        &self,
        _as_of: DateTime<Utc>,
        _handler: &CommandHandler,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("process_commands"))
    }

    /// Create whatever schema the store needs
    async fn ensure_store_exists(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
