//! Event subscription records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External claim on a subscription
///
/// Token, worker and expiry are always set together, so a subscription is
/// either fully claimed or open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionClaim {
    pub token: String,
    pub worker_id: String,
    pub expiry: DateTime<Utc>,
}

/// A workflow step waiting for an event identified by its slug
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSubscription {
    /// Assigned by the store on creation; empty until then
    #[serde(default)]
    pub id: String,

    pub workflow_id: String,

    pub step_id: i32,

    pub execution_pointer_id: String,

    pub event_name: String,

    pub event_key: String,

    /// Only events at or after this time satisfy the subscription
    pub subscribe_as_of: DateTime<Utc>,

    /// Opaque data attached by the engine
    #[serde(default)]
    pub subscription_data: serde_json::Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<SubscriptionClaim>,
}

impl EventSubscription {
    /// Create an open subscription for the given slug
    pub fn new(
        workflow_id: impl Into<String>,
        execution_pointer_id: impl Into<String>,
        step_id: i32,
        event_name: impl Into<String>,
        event_key: impl Into<String>,
        subscribe_as_of: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            workflow_id: workflow_id.into(),
            step_id,
            execution_pointer_id: execution_pointer_id.into(),
            event_name: event_name.into(),
            event_key: event_key.into(),
            subscribe_as_of,
            subscription_data: serde_json::Value::Null,
            claim: None,
        }
    }

    /// Whether no external actor holds a claim on this subscription
    pub fn is_open(&self) -> bool {
        self.claim.is_none()
    }

    /// Current claim token, if any
    pub fn external_token(&self) -> Option<&str> {
        self.claim.as_ref().map(|c| c.token.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_subscription_omits_claim() {
        let sub = EventSubscription::new("wf", "ptr", 1, "order", "42", Utc::now());
        assert!(sub.is_open());

        let json = serde_json::to_value(&sub).unwrap();
        assert!(json.get("claim").is_none());
    }

    #[test]
    fn test_claimed_subscription() {
        let mut sub = EventSubscription::new("wf", "ptr", 1, "order", "42", Utc::now());
        sub.claim = Some(SubscriptionClaim {
            token: "tok".to_string(),
            worker_id: "w1".to_string(),
            expiry: Utc::now(),
        });

        assert!(!sub.is_open());
        assert_eq!(sub.external_token(), Some("tok"));
    }
}
