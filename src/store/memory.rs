//! In-process store for tests and embedding

use std::sync::Mutex;

use super::error::{StoreError, StoreResult};
use super::log::{ExecutionLog, ExecutionLogEntry};
use super::metrics::{MetricsSink, StepMetric};
use super::{WorkflowFilter, WorkflowStore};
use crate::workflow::WorkflowRecord;

#[derive(Debug, Default)]
struct MemoryState {
    workflows: Vec<WorkflowRecord>,
    executions: Vec<ExecutionLogEntry>,
    metrics: Vec<StepMetric>,
}

/// Thread-safe in-memory implementation of every store trait
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every metric recorded so far, in arrival order
    pub fn metrics(&self) -> StoreResult<Vec<StepMetric>> {
        Ok(self.state.lock()?.metrics.clone())
    }

    /// Number of workflow records held
    pub fn workflow_count(&self) -> StoreResult<usize> {
        Ok(self.state.lock()?.workflows.len())
    }

    /// Number of execution log entries held, across all workflows
    pub fn execution_count(&self) -> StoreResult<usize> {
        Ok(self.state.lock()?.executions.len())
    }
}

impl WorkflowStore for MemoryStore {
    fn create_workflow(&self, record: &WorkflowRecord) -> StoreResult<()> {
        let mut state = self.state.lock()?;
        if state
            .workflows
            .iter()
            .any(|w| w.workflow_id == record.workflow_id)
        {
            return Err(StoreError::already_exists("Workflow", &record.workflow_id));
        }
        state.workflows.push(record.clone());
        Ok(())
    }

    fn update_workflow(&self, record: &WorkflowRecord) -> StoreResult<()> {
        let mut state = self.state.lock()?;
        let existing = state
            .workflows
            .iter_mut()
            .find(|w| w.workflow_id == record.workflow_id)
            .ok_or_else(|| StoreError::not_found("Workflow", &record.workflow_id))?;
        if existing.status.is_terminal() {
            return Err(StoreError::AlreadyTerminal {
                workflow_id: record.workflow_id.clone(),
                status: existing.status,
            });
        }
        *existing = record.clone();
        Ok(())
    }

    fn get_workflow(&self, workflow_id: &str) -> StoreResult<Option<WorkflowRecord>> {
        let state = self.state.lock()?;
        Ok(state
            .workflows
            .iter()
            .find(|w| w.workflow_id == workflow_id)
            .cloned())
    }

    fn list_workflows(&self, filter: &WorkflowFilter) -> StoreResult<Vec<WorkflowRecord>> {
        let state = self.state.lock()?;
        let mut records: Vec<WorkflowRecord> = state
            .workflows
            .iter()
            .filter(|w| filter.matches(w))
            .cloned()
            .collect();
        // Newest first; insertion order breaks ties between equal start times
        records.reverse();
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }
}

impl ExecutionLog for MemoryStore {
    fn append(&self, entry: &ExecutionLogEntry) -> StoreResult<()> {
        let mut state = self.state.lock()?;
        if state
            .executions
            .iter()
            .any(|e| e.execution_id == entry.execution_id)
        {
            return Err(StoreError::already_exists("Execution", &entry.execution_id));
        }
        state.executions.push(entry.clone());
        Ok(())
    }

    fn update(&self, entry: &ExecutionLogEntry) -> StoreResult<()> {
        let mut state = self.state.lock()?;
        let existing = state
            .executions
            .iter_mut()
            .find(|e| e.execution_id == entry.execution_id)
            .ok_or_else(|| StoreError::not_found("Execution", &entry.execution_id))?;
        *existing = entry.clone();
        Ok(())
    }

    fn list_executions(&self, workflow_id: &str) -> StoreResult<Vec<ExecutionLogEntry>> {
        let state = self.state.lock()?;
        let mut entries: Vec<ExecutionLogEntry> = state
            .executions
            .iter()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(entries)
    }
}

impl MetricsSink for MemoryStore {
    fn record(&self, metric: &StepMetric) -> StoreResult<()> {
        self.state.lock()?.metrics.push(metric.clone());
        Ok(())
    }
}
