//! Workflow instance records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Waiting for the scheduler to pick it up at `next_execution`
    Runnable,

    /// Currently being executed by a worker
    Running,

    /// Paused until resumed externally
    Suspended,

    /// Finished successfully
    Complete,

    /// Stopped before completion
    Terminated,
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Runnable => write!(f, "runnable"),
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::Complete => write!(f, "complete"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}

/// A persisted workflow instance
///
/// Only `id`, `status` and `next_execution` are interpreted by the store.
/// Everything else is engine state carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Assigned by the store on creation; empty until then
    #[serde(default)]
    pub id: String,

    pub workflow_definition_id: String,

    pub version: i32,

    pub description: Option<String>,

    /// Caller-supplied correlation reference
    pub reference: Option<String>,

    pub status: WorkflowStatus,

    /// When the scheduler should next run this workflow
    pub next_execution: Option<DateTime<Utc>>,

    /// Serialized execution pointers (opaque to the store)
    #[serde(default)]
    pub execution_pointers: serde_json::Value,

    /// Workflow data (opaque to the store)
    #[serde(default)]
    pub data: serde_json::Value,

    pub create_time: DateTime<Utc>,

    pub complete_time: Option<DateTime<Utc>>,
}

impl WorkflowInstance {
    /// Create a runnable instance of the given definition, due immediately
    pub fn new(workflow_definition_id: impl Into<String>, version: i32) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            workflow_definition_id: workflow_definition_id.into(),
            version,
            description: None,
            reference: None,
            status: WorkflowStatus::Runnable,
            next_execution: Some(now),
            execution_pointers: serde_json::Value::Array(vec![]),
            data: serde_json::Value::Null,
            create_time: now,
            complete_time: None,
        }
    }

    /// Set workflow data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Set status
    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }

    /// Set next execution time
    pub fn with_next_execution(mut self, next_execution: Option<DateTime<Utc>>) -> Self {
        self.next_execution = next_execution;
        self
    }

    /// Set the correlation reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// The time this workflow belongs in the runnable index, if any
    ///
    /// Present iff the workflow is `Runnable` and has a next execution time.
    pub fn runnable_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            WorkflowStatus::Runnable => self.next_execution,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runnable_at_requires_status_and_time() {
        let wf = WorkflowInstance::new("def", 1);
        assert!(wf.runnable_at().is_some());

        let wf = wf.with_next_execution(None);
        assert!(wf.runnable_at().is_none());

        let wf = WorkflowInstance::new("def", 1).with_status(WorkflowStatus::Suspended);
        assert!(wf.runnable_at().is_none());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(WorkflowStatus::Runnable.to_string(), "runnable");
        assert_eq!(WorkflowStatus::Terminated.to_string(), "terminated");
    }
}
