//! Lifecycle events broadcast through the event hub

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened to the workflow
///
/// Serialized with a `type` tag so receivers reconstruct the exact variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifeCycleEventKind {
    WorkflowStarted,
    WorkflowResumed,
    WorkflowSuspended,
    WorkflowCompleted,
    WorkflowTerminated,

    /// Workflow raised an unhandled error
    WorkflowError {
        message: String,
        execution_pointer_id: Option<String>,
        step_id: Option<i32>,
    },

    StepStarted {
        execution_pointer_id: String,
        step_id: i32,
    },

    StepCompleted {
        execution_pointer_id: String,
        step_id: i32,
    },
}

impl LifeCycleEventKind {
    /// Stable name of the variant, matching its serialized tag
    pub fn name(&self) -> &'static str {
        match self {
            Self::WorkflowStarted => "workflow_started",
            Self::WorkflowResumed => "workflow_resumed",
            Self::WorkflowSuspended => "workflow_suspended",
            Self::WorkflowCompleted => "workflow_completed",
            Self::WorkflowTerminated => "workflow_terminated",
            Self::WorkflowError { .. } => "workflow_error",
            Self::StepStarted { .. } => "step_started",
            Self::StepCompleted { .. } => "step_completed",
        }
    }
}

/// A lifecycle notification about one workflow instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeCycleEvent {
    pub event_time: DateTime<Utc>,
    pub workflow_instance_id: String,
    pub workflow_definition_id: String,
    pub version: i32,
    pub reference: Option<String>,
    pub kind: LifeCycleEventKind,
}

impl LifeCycleEvent {
    /// Create an event for the given workflow, timestamped now
    pub fn new(
        workflow_instance_id: impl Into<String>,
        workflow_definition_id: impl Into<String>,
        version: i32,
        kind: LifeCycleEventKind,
    ) -> Self {
        Self {
            event_time: Utc::now(),
            workflow_instance_id: workflow_instance_id.into(),
            workflow_definition_id: workflow_definition_id.into(),
            version,
            reference: None,
            kind,
        }
    }

    /// Set the correlation reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tag_matches_name() {
        let kinds = vec![
            LifeCycleEventKind::WorkflowStarted,
            LifeCycleEventKind::WorkflowError {
                message: "boom".to_string(),
                execution_pointer_id: None,
                step_id: Some(3),
            },
            LifeCycleEventKind::StepCompleted {
                execution_pointer_id: "ptr".to_string(),
                step_id: 1,
            },
        ];

        for kind in kinds {
            let json = serde_json::to_value(&kind).unwrap();
            assert_eq!(json["type"], kind.name());
        }
    }

    #[test]
    fn test_step_events_stay_distinct() {
        let started = LifeCycleEvent::new(
            "wf-1",
            "def",
            1,
            LifeCycleEventKind::StepStarted {
                execution_pointer_id: "ptr".to_string(),
                step_id: 2,
            },
        );

        let json = serde_json::to_string(&started).unwrap();
        let parsed: LifeCycleEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, started);
        assert!(matches!(parsed.kind, LifeCycleEventKind::StepStarted { step_id: 2, .. }));
    }
}
