//! Errors from the summary completion backend

use thiserror::Error;

/// Why a summary completion could not be produced
#[derive(Error, Debug)]
pub enum LlmError {
    /// The backend could not be reached
    #[error("Completion backend at {url} is unreachable: {message}")]
    Unreachable { url: String, message: String },

    #[error("Completion request timed out after {0} seconds")]
    Timeout(u64),

    /// The backend answered with a non-success status
    #[error("Completion backend returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body was not the expected JSON
    #[error("Could not decode completion response: {0}")]
    Decode(String),

    /// The model answered with only whitespace
    #[error("Model '{0}' returned an empty completion")]
    EmptyCompletion(String),

    /// `llm.mode` names no known backend
    #[error("Unknown completion mode '{0}'")]
    UnknownMode(String),

    /// The configured mode needs a feature this build lacks
    #[error("Completion mode '{mode}' requires the '{feature}' feature")]
    BackendDisabled { mode: String, feature: &'static str },
}

/// Result type for completion requests
pub type LlmResult<T> = Result<T, LlmError>;

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::Decode(err.to_string())
    }
}

impl LlmError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LlmError::Unreachable { url, .. } => format!(
                "{self}\n\n\
                Hint: Start the model server at {url}, or set llm.mode = \"none\" to use templated summaries."
            ),
            LlmError::Timeout(_) => {
                format!("{self}\n\nHint: Raise llm.timeout_seconds in the orchestrator configuration.")
            }
            LlmError::UnknownMode(_) => {
                format!("{self}\n\nHint: Supported modes are 'none' and 'online'.")
            }
            LlmError::BackendDisabled { feature, .. } => {
                format!("{self}\n\nHint: Rebuild with --features {feature}.")
            }
            _ => self.to_string(),
        }
    }
}
