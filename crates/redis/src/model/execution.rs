//! Pass-through value types the store accepts but does not retain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Error raised while executing a workflow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionError {
    pub workflow_id: String,
    pub execution_pointer_id: String,
    pub error_time: DateTime<Utc>,
    pub message: String,
}

impl ExecutionError {
    pub fn new(
        workflow_id: impl Into<String>,
        execution_pointer_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: workflow_id.into(),
            execution_pointer_id: execution_pointer_id.into(),
            error_time: Utc::now(),
            message: message.into(),
        }
    }
}

/// A deferred engine command (e.g. "process workflow X at time T")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledCommand {
    pub command_name: String,
    pub data: String,
    pub execute_time: DateTime<Utc>,
}

/// Well-known command names
pub mod command_names {
    pub const PROCESS_WORKFLOW: &str = "ProcessWorkflow";
    pub const PROCESS_EVENT: &str = "ProcessEvent";
}
