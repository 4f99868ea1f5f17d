//! Published event records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An externally published event, correlated to subscriptions by its slug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Assigned by the store on creation; empty until then
    #[serde(default)]
    pub id: String,

    pub event_name: String,

    pub event_key: String,

    #[serde(default)]
    pub event_data: serde_json::Value,

    pub event_time: DateTime<Utc>,

    pub is_processed: bool,
}

impl Event {
    /// Create an unprocessed event published now
    pub fn new(
        event_name: impl Into<String>,
        event_key: impl Into<String>,
        event_data: serde_json::Value,
    ) -> Self {
        Self {
            id: String::new(),
            event_name: event_name.into(),
            event_key: event_key.into(),
            event_data,
            event_time: Utc::now(),
            is_processed: false,
        }
    }

    /// Set the event time
    pub fn at(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = event_time;
        self
    }
}
