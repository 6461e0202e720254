//! Immutable per-run context

use chrono::{DateTime, Utc};

use super::record::WorkflowRecord;
use super::types::WorkflowType;

/// Identity and targets of a single run, threaded through every step call.
///
/// Built once from the workflow record; nothing in it changes while the
/// run executes.
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    workflow_id: String,
    workflow_type: WorkflowType,
    source_reference: String,
    target_reference: String,
    target_table: Option<String>,
    started_at: DateTime<Utc>,
}

impl RunContext {
    /// Create a context for the given record
    pub fn from_record(record: &WorkflowRecord) -> Self {
        Self {
            workflow_id: record.workflow_id.clone(),
            workflow_type: record.workflow_type,
            source_reference: record.source_reference.clone(),
            target_reference: record.target_reference.clone(),
            target_table: record.target_table.clone(),
            started_at: record.start_time,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub fn workflow_type(&self) -> WorkflowType {
        self.workflow_type
    }

    pub fn source_reference(&self) -> &str {
        &self.source_reference
    }

    pub fn target_reference(&self) -> &str {
        &self.target_reference
    }

    pub fn target_table(&self) -> Option<&str> {
        self.target_table.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
