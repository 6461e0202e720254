//! Error types for workflow persistence

use thiserror::Error;

use crate::workflow::WorkflowStatus;

/// Errors that can occur while reading or writing persisted workflow state
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// A store mutex was poisoned by a panicking writer
    #[error("Store lock poisoned: {0}")]
    Lock(String),

    /// Row to update does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Row to insert already exists
    #[error("{kind} already exists: {id}")]
    AlreadyExists { kind: &'static str, id: String },

    /// Row already reached COMPLETED or FAILED and cannot change
    #[error("Workflow {workflow_id} is already {status}")]
    AlreadyTerminal {
        workflow_id: String,
        status: WorkflowStatus,
    },

    /// Stored value could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Database not initialized
    #[error("Database not initialized. Run 'init' first.")]
    NotInitialized,

    /// Schema version mismatch
    #[error("Schema version mismatch: expected {expected}, found {found}")]
    SchemaVersionMismatch { expected: i32, found: i32 },
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn already_exists(kind: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            id: id.into(),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotInitialized => {
                "Workflow database not initialized.\n\nHint: Run 'onboard init' first.".to_string()
            }
            StoreError::SchemaVersionMismatch { expected, found } => {
                format!(
                    "Schema version mismatch (expected v{expected}, found v{found}).\n\n\
                    Hint: Run 'onboard init --force' to reinitialize the database."
                )
            }
            StoreError::Lock(_) => format!(
                "{self}\n\nHint: A previous writer panicked; restart the process."
            ),
            _ => self.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        StoreError::Lock(err.to_string())
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
