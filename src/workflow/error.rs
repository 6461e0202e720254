//! Error types for workflow orchestration
//!
//! Step failures are reported by the step executor as values; only the
//! controller turns them into a `WorkflowError::StepFailure`, after the
//! workflow record has been persisted as FAILED.

use thiserror::Error;

use super::types::{StepName, WorkflowStatus};
use crate::store::StoreError;

/// Errors that can occur while starting, running or querying workflows
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// The requested workflow type is not part of the supported enumeration
    #[error("Unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// The workflow type exists but cannot be run
    #[error("Workflow type {workflow_type} is not implemented: {reason}")]
    NotImplemented {
        workflow_type: String,
        reason: String,
    },

    /// A step's collaborator failed; the remaining plan was aborted
    #[error("Step '{step}' failed in workflow {workflow_id}: {message}")]
    StepFailure {
        workflow_id: String,
        step: StepName,
        message: String,
    },

    /// Illegal status change on a workflow record
    #[error("Invalid status transition for workflow {workflow_id}: {from} -> {to}")]
    InvalidTransition {
        workflow_id: String,
        from: WorkflowStatus,
        to: WorkflowStatus,
    },

    /// Step attempted out of plan order
    #[error("Step '{step}' is out of plan order for workflow {workflow_id}")]
    PlanViolation { workflow_id: String, step: StepName },

    /// No workflow with the given ID
    #[error("Workflow not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Persistence error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for orchestrator operations
pub type OrchestratorResult<T> = Result<T, WorkflowError>;

impl WorkflowError {
    /// Create a step failure
    pub fn step_failure(
        workflow_id: impl Into<String>,
        step: StepName,
        message: impl Into<String>,
    ) -> Self {
        Self::StepFailure {
            workflow_id: workflow_id.into(),
            step,
            message: message.into(),
        }
    }

    /// Get the step name if this is a step failure
    pub fn step_name(&self) -> Option<StepName> {
        match self {
            WorkflowError::StepFailure { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// Get the workflow ID the error belongs to, if one was allocated
    pub fn workflow_id(&self) -> Option<&str> {
        match self {
            WorkflowError::StepFailure { workflow_id, .. }
            | WorkflowError::InvalidTransition { workflow_id, .. }
            | WorkflowError::PlanViolation { workflow_id, .. } => Some(workflow_id),
            WorkflowError::NotFound(id) => Some(id),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::UnknownWorkflowType(kind) => {
                format!(
                    "Unknown workflow type: {kind}\n\nHint: Use one of ONBOARDING, PROFILING_ONLY."
                )
            }
            WorkflowError::NotImplemented {
                workflow_type,
                reason,
            } => {
                format!(
                    "Workflow type {workflow_type} is not available: {reason}\n\nHint: Run an ONBOARDING workflow instead."
                )
            }
            WorkflowError::StepFailure {
                workflow_id,
                step,
                message,
            } => {
                format!(
                    "Step {step} failed: {message}\n\nHint: Inspect the execution log with 'onboard executions {workflow_id}'."
                )
            }
            WorkflowError::NotFound(id) => {
                format!("Workflow not found: {id}\n\nHint: Use 'onboard list' to see recent workflows.")
            }
            WorkflowError::ConfigError(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your orchestrator configuration file.")
            }
            WorkflowError::Store(err) => err.user_message(),
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failure_display() {
        let err = WorkflowError::step_failure("wf-1", StepName::Dictionary, "warehouse offline");
        let display = err.to_string();
        assert!(display.contains("DICTIONARY"));
        assert!(display.contains("warehouse offline"));
        assert_eq!(err.step_name(), Some(StepName::Dictionary));
        assert_eq!(err.workflow_id(), Some("wf-1"));
    }

    #[test]
    fn test_unknown_type_has_no_workflow() {
        let err = WorkflowError::UnknownWorkflowType("BOGUS".to_string());
        assert!(err.workflow_id().is_none());
        assert!(err.user_message().contains("Hint:"));
    }

    #[test]
    fn test_user_message_points_to_execution_log() {
        let err = WorkflowError::step_failure("wf-9", StepName::Mapping, "timeout");
        assert!(err.user_message().contains("onboard executions wf-9"));
    }
}
