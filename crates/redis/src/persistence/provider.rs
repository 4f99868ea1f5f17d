//! Index-maintaining PersistenceProvider over any KeyValueBackend
//!
//! Every record lives as a tagged JSON blob in its collection hash. Index
//! entries are written with separate commands after the record, so a crash
//! between the two leaves either a record without its index entry or an
//! index entry pointing at nothing. Reads skip the latter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::backend::KeyValueBackend;
use super::index::{IndexHit, SchedulingIndex};
use super::keys::*;
use super::record::Record;
use super::store::{PersistenceProvider, StoreError};
use crate::model::{Event, EventSubscription, SubscriptionClaim, WorkflowInstance, WorkflowStatus};

/// PersistenceProvider storing records and their indices in a [`KeyValueBackend`]
///
/// # Example
///
/// ```ignore
/// use everruns_redis::prelude::*;
///
/// let connection = StoreConnection::connect(&config, None).await?;
/// let store = RedisPersistenceProvider::redis(&connection, "tenant-a", false);
///
/// let mut workflow = WorkflowInstance::new("order_flow", 1);
/// let id = store.create_workflow(&mut workflow).await?;
/// let due = store.get_runnable_workflows(Utc::now()).await?;
/// ```
pub struct IndexedPersistenceProvider<B: KeyValueBackend> {
    backend: B,
    keys: KeyNamespace,
    remove_complete: bool,
}

impl<B: KeyValueBackend> IndexedPersistenceProvider<B> {
    /// Create a provider over `backend` scoped to `prefix`
    ///
    /// With `remove_complete`, workflows are deleted once they reach
    /// [`WorkflowStatus::Complete`].
    pub fn new(backend: B, prefix: impl Into<String>, remove_complete: bool) -> Self {
        Self {
            backend,
            keys: KeyNamespace::new(prefix),
            remove_complete,
        }
    }

    /// Get a reference to the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get the key namespace
    pub fn keys(&self) -> &KeyNamespace {
        &self.keys
    }

    fn runnable_workflows(&self) -> SchedulingIndex<'_, B> {
        SchedulingIndex::new(&self.backend, self.keys.index(WORKFLOW_SET, RUNNABLE_INDEX))
    }

    fn runnable_events(&self) -> SchedulingIndex<'_, B> {
        SchedulingIndex::new(&self.backend, self.keys.index(EVENT_SET, RUNNABLE_INDEX))
    }

    fn subscription_slug(&self, event_name: &str, event_key: &str) -> SchedulingIndex<'_, B> {
        SchedulingIndex::new(
            &self.backend,
            self.keys.slug_index(SUBSCRIPTION_SET, event_name, event_key),
        )
    }

    fn event_slug(&self, event_name: &str, event_key: &str) -> SchedulingIndex<'_, B> {
        SchedulingIndex::new(
            &self.backend,
            self.keys.slug_index(EVENT_SET, event_name, event_key),
        )
    }

    fn claims_key(&self) -> String {
        self.keys.index(SUBSCRIPTION_SET, CLAIMS_INDEX)
    }

    async fn read<R: Record>(&self, collection: &str, id: &str) -> Result<Option<R>, StoreError> {
        self.backend
            .hash_get(&self.keys.collection(collection), id)
            .await?
            .map(|raw| R::decode(&raw))
            .transpose()
    }

    async fn write<R: Record + Sync>(&self, collection: &str, record: &R) -> Result<(), StoreError> {
        let raw = record.encode()?;
        self.backend
            .hash_set(&self.keys.collection(collection), record.id(), &raw)
            .await
    }

    /// Keep settled hits; keep boundary hits whose record `admits` them
    ///
    /// Order is preserved. Boundary hits with no record are dropped.
    async fn resolve_hits<R, F>(
        &self,
        collection: &str,
        hits: Vec<IndexHit>,
        admits: F,
    ) -> Result<Vec<String>, StoreError>
    where
        R: Record + Send,
        F: Fn(&R) -> bool + Send + Sync,
    {
        let mut ids = Vec::with_capacity(hits.len());
        for hit in hits {
            match hit {
                IndexHit::Settled(id) => ids.push(id),
                IndexHit::Boundary(id) => match self.read::<R>(collection, &id).await? {
                    Some(record) if admits(&record) => ids.push(id),
                    Some(_) => {}
                    None => debug!(%id, "skipping dangling index entry"),
                },
            }
        }
        Ok(ids)
    }

    async fn require_subscription(&self, id: &str) -> Result<EventSubscription, StoreError> {
        self.read(SUBSCRIPTION_SET, id)
            .await?
            .ok_or_else(|| StoreError::not_found("subscription", id))
    }

    async fn require_event(&self, id: &str) -> Result<Event, StoreError> {
        self.read(EVENT_SET, id)
            .await?
            .ok_or_else(|| StoreError::not_found("event", id))
    }
}

impl<B: KeyValueBackend> std::fmt::Debug for IndexedPersistenceProvider<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexedPersistenceProvider")
            .field("prefix", &self.keys.prefix())
            .field("remove_complete", &self.remove_complete)
            .finish()
    }
}

fn new_id() -> String {
    Uuid::now_v7().to_string()
}

#[async_trait]
impl<B: KeyValueBackend> PersistenceProvider for IndexedPersistenceProvider<B> {
    #[instrument(skip(self, workflow), fields(definition = %workflow.workflow_definition_id))]
    async fn create_workflow(&self, workflow: &mut WorkflowInstance) -> Result<String, StoreError> {
        workflow.id = new_id();
        self.persist_workflow(workflow).await?;
        debug!(workflow_id = %workflow.id, "created workflow");
        Ok(workflow.id.clone())
    }

    #[instrument(skip(self, workflow), fields(workflow_id = %workflow.id, status = %workflow.status))]
    async fn persist_workflow(&self, workflow: &WorkflowInstance) -> Result<(), StoreError> {
        self.write(WORKFLOW_SET, workflow).await?;

        match workflow.runnable_at() {
            Some(at) => self.runnable_workflows().add(&workflow.id, at).await?,
            None => {
                self.runnable_workflows().remove(&workflow.id).await?;
                if self.remove_complete && workflow.status == WorkflowStatus::Complete {
                    self.backend
                        .hash_delete(&self.keys.collection(WORKFLOW_SET), &workflow.id)
                        .await?;
                    debug!("removed completed workflow");
                }
            }
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_runnable_workflows(
        &self,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let hits = self.runnable_workflows().due(as_of).await?;
        self.resolve_hits(WORKFLOW_SET, hits, move |workflow: &WorkflowInstance| {
            workflow.runnable_at().is_some_and(|at| at <= as_of)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowInstance>, StoreError> {
        self.read(WORKFLOW_SET, id).await
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn get_workflows(&self, ids: &[String]) -> Result<Vec<WorkflowInstance>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.backend
            .hash_get_many(&self.keys.collection(WORKFLOW_SET), ids)
            .await?
            .into_iter()
            .flatten()
            .map(|raw| WorkflowInstance::decode(&raw))
            .collect()
    }

    #[instrument(skip(self, subscription), fields(event_name = %subscription.event_name, event_key = %subscription.event_key))]
    async fn create_event_subscription(
        &self,
        subscription: &mut EventSubscription,
    ) -> Result<String, StoreError> {
        subscription.id = new_id();
        self.write(SUBSCRIPTION_SET, subscription).await?;
        self.subscription_slug(&subscription.event_name, &subscription.event_key)
            .add(&subscription.id, subscription.subscribe_as_of)
            .await?;

        debug!(subscription_id = %subscription.id, "created event subscription");
        Ok(subscription.id.clone())
    }

    #[instrument(skip(self))]
    async fn get_subscriptions(
        &self,
        event_name: &str,
        event_key: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<EventSubscription>, StoreError> {
        let hits = self
            .subscription_slug(event_name, event_key)
            .due(as_of)
            .await?;

        let mut result = Vec::with_capacity(hits.len());
        for id in hits.into_iter().map(IndexHit::into_id) {
            let Some(subscription) = self.read::<EventSubscription>(SUBSCRIPTION_SET, &id).await?
            else {
                debug!(subscription_id = %id, "skipping dangling slug index entry");
                continue;
            };
            // Distinct slugs such as ("a-b", "c") and ("a", "b-c") share a key
            if subscription.event_name != event_name || subscription.event_key != event_key {
                debug!(subscription_id = %id, "skipping subscription for another slug");
                continue;
            }
            if subscription.subscribe_as_of <= as_of {
                result.push(subscription);
            }
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn get_subscription(&self, id: &str) -> Result<Option<EventSubscription>, StoreError> {
        self.read(SUBSCRIPTION_SET, id).await
    }

    /// Claims are arbitrated by HSETNX on the claims hash, so of several
    /// concurrent callers exactly one wins. The record rewrite that follows
    /// is a separate command.
    #[instrument(skip(self, token))]
    async fn set_subscription_token(
        &self,
        id: &str,
        token: &str,
        worker_id: &str,
        expiry: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut subscription = self.require_subscription(id).await?;
        if subscription.claim.is_some() {
            return Ok(false);
        }

        let claims = self.claims_key();
        if !self.backend.hash_set_if_absent(&claims, id, token).await? {
            debug!("subscription already claimed");
            return Ok(false);
        }

        subscription.claim = Some(SubscriptionClaim {
            token: token.to_string(),
            worker_id: worker_id.to_string(),
            expiry,
        });

        if let Err(e) = self.write(SUBSCRIPTION_SET, &subscription).await {
            // Give the claim back so the subscription is not stranded
            if let Err(release) = self.backend.hash_delete(&claims, id).await {
                warn!(error = %release, "failed to release claim after write failure");
            }
            return Err(e);
        }

        debug!(%worker_id, "claimed subscription");
        Ok(true)
    }

    /// The claims entry is released before the record is rewritten. A failure
    /// between the two leaves the record claimed, and a retry finishes both.
    #[instrument(skip(self, token))]
    async fn clear_subscription_token(&self, id: &str, token: &str) -> Result<(), StoreError> {
        let mut subscription = self.require_subscription(id).await?;
        let claims = self.claims_key();
        let arbitrated = self.backend.hash_get(&claims, id).await?;

        let record_holds = subscription.external_token() == Some(token);
        let claims_hold = arbitrated.as_deref() == Some(token);
        if !record_holds && !claims_hold {
            return Ok(());
        }

        if claims_hold {
            self.backend.hash_delete(&claims, id).await?;
        }
        if record_holds {
            subscription.claim = None;
            self.write(SUBSCRIPTION_SET, &subscription).await?;
        }

        debug!("released subscription claim");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn terminate_subscription(&self, id: &str) -> Result<(), StoreError> {
        let Some(existing) = self.read::<EventSubscription>(SUBSCRIPTION_SET, id).await? else {
            debug!("subscription already gone");
            return Ok(());
        };

        self.backend
            .hash_delete(&self.keys.collection(SUBSCRIPTION_SET), id)
            .await?;
        self.subscription_slug(&existing.event_name, &existing.event_key)
            .remove(id)
            .await?;
        self.backend.hash_delete(&self.claims_key(), id).await?;

        debug!("terminated subscription");
        Ok(())
    }

    #[instrument(skip(self, event), fields(event_name = %event.event_name, event_key = %event.event_key))]
    async fn create_event(&self, event: &mut Event) -> Result<String, StoreError> {
        event.id = new_id();
        self.write(EVENT_SET, event).await?;
        self.event_slug(&event.event_name, &event.event_key)
            .add(&event.id, event.event_time)
            .await?;

        if event.is_processed {
            self.runnable_events().remove(&event.id).await?;
        } else {
            self.runnable_events().add(&event.id, event.event_time).await?;
        }

        debug!(event_id = %event.id, "created event");
        Ok(event.id.clone())
    }

    #[instrument(skip(self))]
    async fn get_event(&self, id: &str) -> Result<Option<Event>, StoreError> {
        self.read(EVENT_SET, id).await
    }

    #[instrument(skip(self))]
    async fn get_runnable_events(&self, as_of: DateTime<Utc>) -> Result<Vec<String>, StoreError> {
        let hits = self.runnable_events().due(as_of).await?;
        self.resolve_hits(EVENT_SET, hits, move |event: &Event| event.event_time <= as_of)
            .await
    }

    #[instrument(skip(self))]
    async fn get_events_by_slug(
        &self,
        event_name: &str,
        event_key: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<String>, StoreError> {
        let hits = self.event_slug(event_name, event_key).since(as_of).await?;
        self.resolve_hits(EVENT_SET, hits, move |event: &Event| event.event_time >= as_of)
            .await
    }

    #[instrument(skip(self))]
    async fn mark_event_processed(&self, id: &str) -> Result<(), StoreError> {
        let mut event = self.require_event(id).await?;
        event.is_processed = true;
        self.write(EVENT_SET, &event).await?;
        self.runnable_events().remove(id).await
    }

    #[instrument(skip(self))]
    async fn mark_event_unprocessed(&self, id: &str) -> Result<(), StoreError> {
        let mut event = self.require_event(id).await?;
        event.is_processed = false;
        self.write(EVENT_SET, &event).await?;
        self.runnable_events().add(id, event.event_time).await
    }
}
