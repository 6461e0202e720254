//! Execution log entries: one row per step attempt

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::error::StoreResult;
use crate::workflow::types::{ExecutionStatus, StepName};

/// Record of a single step invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// Unique per attempt
    pub execution_id: String,
    /// Owning workflow
    pub workflow_id: String,
    /// Step that was invoked
    pub step_name: StepName,
    /// RUNNING until updated once to a terminal status
    pub status: ExecutionStatus,
    /// Parameters the step was called with
    pub input_snapshot: Value,
    /// Normalized payload on success
    pub output_snapshot: Option<Value>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: Option<f64>,
    /// Error text on failure
    pub error_message: Option<String>,
}

impl ExecutionLogEntry {
    /// Create a RUNNING entry for a step that is about to be invoked
    pub fn running(workflow_id: impl Into<String>, step_name: StepName, input: Value) -> Self {
        Self {
            execution_id: Uuid::new_v4().to_string(),
            workflow_id: workflow_id.into(),
            step_name,
            status: ExecutionStatus::Running,
            input_snapshot: input,
            output_snapshot: None,
            start_time: Utc::now(),
            end_time: None,
            duration_seconds: None,
            error_message: None,
        }
    }

    /// Mark the attempt COMPLETED
    pub fn complete(&mut self, output: Value, duration: Duration) {
        self.status = ExecutionStatus::Completed;
        self.output_snapshot = Some(output);
        self.finish(duration);
    }

    /// Mark the attempt FAILED
    pub fn fail(&mut self, error: impl Into<String>, duration: Duration) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(error.into());
        self.finish(duration);
    }

    fn finish(&mut self, duration: Duration) {
        self.end_time = Some(Utc::now());
        self.duration_seconds = Some(duration.as_secs_f64());
    }
}

/// Append/update-only log of step invocations.
///
/// Writers treat every call as best-effort: a failed write is reported to
/// the caller but must never change a workflow's outcome.
pub trait ExecutionLog: Send + Sync {
    /// Insert a new entry
    fn append(&self, entry: &ExecutionLogEntry) -> StoreResult<()>;

    /// Overwrite an existing entry with its terminal state
    fn update(&self, entry: &ExecutionLogEntry) -> StoreResult<()>;

    /// Entries of a workflow in start order
    fn list_executions(&self, workflow_id: &str) -> StoreResult<Vec<ExecutionLogEntry>>;
}
