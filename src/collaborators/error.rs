//! Error types for stage collaborators

use thiserror::Error;

/// Errors a collaborator can report for a single step invocation
#[derive(Error, Debug)]
pub enum CollaboratorError {
    /// Failed to reach the collaborator
    #[error("Failed to connect to {procedure}: {message}")]
    Connection { procedure: String, message: String },

    /// Call exceeded the per-step timeout
    #[error("{procedure} timed out after {seconds} seconds")]
    Timeout { procedure: String, seconds: u64 },

    /// The collaborator ran and reported a failure
    #[error("{procedure} failed: {message}")]
    Procedure { procedure: String, message: String },

    /// The collaborator returned something that is not a usable result
    #[error("Invalid response from {procedure}: {message}")]
    InvalidResponse { procedure: String, message: String },

    /// A step's input from an earlier step is not available
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Collaborator panicked
    #[error("Collaborator panicked: {0}")]
    Panicked(String),

    /// Parameters could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for collaborator calls
pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

impl CollaboratorError {
    /// Create a procedure-reported failure
    pub fn procedure(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Procedure {
            procedure: procedure.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-response error
    pub fn invalid_response(procedure: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            procedure: procedure.into(),
            message: message.into(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            CollaboratorError::Connection { procedure, message } => {
                format!(
                    "Failed to connect to {procedure}: {message}\n\n\
                    Hint: Check 'procedures.base_url' in the orchestrator configuration."
                )
            }
            CollaboratorError::Timeout { procedure, seconds } => {
                format!(
                    "{procedure} timed out after {seconds} seconds.\n\n\
                    Hint: Increase 'procedures.timeout_seconds' or reduce the sample size."
                )
            }
            _ => self.to_string(),
        }
    }
}
