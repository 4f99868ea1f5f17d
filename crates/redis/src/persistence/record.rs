//! Self-describing record encoding
//!
//! Records are stored as JSON objects carrying a `type` discriminant next to
//! the payload, so a blob read from the wrong collection is rejected instead
//! of being misread.

use serde::{Deserialize, Serialize};

use super::store::StoreError;
use crate::model::{Event, EventSubscription, WorkflowInstance};

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StoredRecordRef<'a> {
    WorkflowInstance(&'a WorkflowInstance),
    EventSubscription(&'a EventSubscription),
    Event(&'a Event),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StoredRecord {
    WorkflowInstance(WorkflowInstance),
    EventSubscription(EventSubscription),
    Event(Event),
}

impl StoredRecord {
    fn type_name(&self) -> &'static str {
        match self {
            Self::WorkflowInstance(_) => WorkflowInstance::TYPE,
            Self::EventSubscription(_) => EventSubscription::TYPE,
            Self::Event(_) => Event::TYPE,
        }
    }
}

/// A record type the store knows how to persist
pub trait Record: Sized {
    /// Discriminant written alongside the payload
    const TYPE: &'static str;

    /// Store-assigned identifier
    fn id(&self) -> &str;

    fn encode(&self) -> Result<String, StoreError>;

    fn decode(raw: &str) -> Result<Self, StoreError>;
}

fn encode_ref(record: StoredRecordRef<'_>) -> Result<String, StoreError> {
    serde_json::to_string(&record).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_any(raw: &str) -> Result<StoredRecord, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn mismatch(expected: &'static str, found: &StoredRecord) -> StoreError {
    StoreError::RecordTypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl Record for WorkflowInstance {
    const TYPE: &'static str = "workflow_instance";

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Result<String, StoreError> {
        encode_ref(StoredRecordRef::WorkflowInstance(self))
    }

    fn decode(raw: &str) -> Result<Self, StoreError> {
        match decode_any(raw)? {
            StoredRecord::WorkflowInstance(wf) => Ok(wf),
            other => Err(mismatch(Self::TYPE, &other)),
        }
    }
}

impl Record for EventSubscription {
    const TYPE: &'static str = "event_subscription";

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Result<String, StoreError> {
        encode_ref(StoredRecordRef::EventSubscription(self))
    }

    fn decode(raw: &str) -> Result<Self, StoreError> {
        match decode_any(raw)? {
            StoredRecord::EventSubscription(sub) => Ok(sub),
            other => Err(mismatch(Self::TYPE, &other)),
        }
    }
}

impl Record for Event {
    const TYPE: &'static str = "event";

    fn id(&self) -> &str {
        &self.id
    }

    fn encode(&self) -> Result<String, StoreError> {
        encode_ref(StoredRecordRef::Event(self))
    }

    fn decode(raw: &str) -> Result<Self, StoreError> {
        match decode_any(raw)? {
            StoredRecord::Event(evt) => Ok(evt),
            other => Err(mismatch(Self::TYPE, &other)),
        }
    }
}
