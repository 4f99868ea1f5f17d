// Work queue contract
//
// Ids of workflows and events that are ready to be processed, one FIFO queue
// per kind of work.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::persistence::StoreError;

/// Kind of work carried by a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueType {
    Workflow,
    Event,
}

#[async_trait]
pub trait QueueProvider: Send + Sync + 'static {
    async fn enqueue(&self, queue: QueueType, item: &str) -> Result<(), StoreError>;

    /// Oldest item, or `None` when the queue is empty
    async fn dequeue(&self, queue: QueueType) -> Result<Option<String>, StoreError>;
}

/// Single-process FIFO queues
#[derive(Default)]
pub struct InMemoryQueueProvider {
    queues: Mutex<HashMap<QueueType, VecDeque<String>>>,
}

impl InMemoryQueueProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, queue: QueueType) -> usize {
        self.queues.lock().get(&queue).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self, queue: QueueType) -> bool {
        self.len(queue) == 0
    }
}

#[async_trait]
impl QueueProvider for InMemoryQueueProvider {
    async fn enqueue(&self, queue: QueueType, item: &str) -> Result<(), StoreError> {
        self.queues
            .lock()
            .entry(queue)
            .or_default()
            .push_back(item.to_string());
        Ok(())
    }

    async fn dequeue(&self, queue: QueueType) -> Result<Option<String>, StoreError> {
        Ok(self
            .queues
            .lock()
            .get_mut(&queue)
            .and_then(VecDeque::pop_front))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_per_queue() {
        let queues = InMemoryQueueProvider::new();

        queues.enqueue(QueueType::Workflow, "wf-1").await.unwrap();
        queues.enqueue(QueueType::Workflow, "wf-2").await.unwrap();
        queues.enqueue(QueueType::Event, "ev-1").await.unwrap();
        assert_eq!(queues.len(QueueType::Workflow), 2);

        assert_eq!(
            queues.dequeue(QueueType::Workflow).await.unwrap().as_deref(),
            Some("wf-1")
        );
        assert_eq!(
            queues.dequeue(QueueType::Event).await.unwrap().as_deref(),
            Some("ev-1")
        );
        assert_eq!(
            queues.dequeue(QueueType::Workflow).await.unwrap().as_deref(),
            Some("wf-2")
        );
    }

    #[tokio::test]
    async fn test_dequeue_empty() {
        let queues = InMemoryQueueProvider::new();
        assert!(queues.is_empty(QueueType::Event));
        assert!(queues.dequeue(QueueType::Event).await.unwrap().is_none());
    }
}
