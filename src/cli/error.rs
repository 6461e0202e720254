//! CLI error type

use std::path::PathBuf;

use onboarding_orchestrator::llm::LlmError;
use onboarding_orchestrator::store::StoreError;
use onboarding_orchestrator::workflow::WorkflowError;
use thiserror::Error;

/// Errors reported by `onboard` commands
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),

    /// A run finished FAILED; details were already printed
    #[error("Workflow {workflow_id} failed: {message}")]
    WorkflowFailed {
        workflow_id: String,
        message: String,
    },
}

impl CliError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CliError::Workflow(e) => e.user_message(),
            CliError::Store(e) => e.user_message(),
            CliError::Llm(e) => e.user_message(),
            CliError::WorkflowFailed {
                workflow_id,
                message,
            } => format!(
                "Workflow {workflow_id} failed: {message}\n\n\
                Hint: Inspect the execution log with 'onboard executions {workflow_id}'."
            ),
            _ => self.to_string(),
        }
    }
}
