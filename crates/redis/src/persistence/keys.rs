//! Key layout within a deployment prefix
//!
//! - `{prefix}.workflows` (HASH): workflow records by id
//! - `{prefix}.workflows.runnable` (ZSET): runnable workflow ids, score = next execution
//! - `{prefix}.subscriptions` (HASH): subscription records by id
//! - `{prefix}.subscriptions.claims` (HASH): claim tokens by subscription id
//! - `{prefix}.subscriptions.eventslug.{name}-{key}` (ZSET): score = subscribe-as-of
//! - `{prefix}.events` (HASH): event records by id
//! - `{prefix}.events.runnable` (ZSET): unprocessed event ids, score = event time
//! - `{prefix}.events.eventslug.{name}-{key}` (ZSET): score = event time

pub const WORKFLOW_SET: &str = "workflows";
pub const SUBSCRIPTION_SET: &str = "subscriptions";
pub const EVENT_SET: &str = "events";

pub const RUNNABLE_INDEX: &str = "runnable";
pub const EVENTSLUG_INDEX: &str = "eventslug";
pub const CLAIMS_INDEX: &str = "claims";

/// Builds keys scoped to one deployment prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNamespace {
    prefix: String,
}

impl KeyNamespace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Hash holding a collection's records
    pub fn collection(&self, collection: &str) -> String {
        format!("{}.{}", self.prefix, collection)
    }

    /// Secondary index of a collection
    pub fn index(&self, collection: &str, index: &str) -> String {
        format!("{}.{}.{}", self.prefix, collection, index)
    }

    /// Slug-scoped correlation index of a collection
    pub fn slug_index(&self, collection: &str, event_name: &str, event_key: &str) -> String {
        format!(
            "{}.{}.{}.{}-{}",
            self.prefix, collection, EVENTSLUG_INDEX, event_name, event_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        let ns = KeyNamespace::new("tenant-a");

        assert_eq!(ns.collection(WORKFLOW_SET), "tenant-a.workflows");
        assert_eq!(
            ns.index(WORKFLOW_SET, RUNNABLE_INDEX),
            "tenant-a.workflows.runnable"
        );
        assert_eq!(
            ns.slug_index(SUBSCRIPTION_SET, "order-paid", "42"),
            "tenant-a.subscriptions.eventslug.order-paid-42"
        );
    }

    #[test]
    fn test_prefixes_do_not_collide() {
        let a = KeyNamespace::new("a");
        let b = KeyNamespace::new("b");
        assert_ne!(a.collection(EVENT_SET), b.collection(EVENT_SET));
    }
}
