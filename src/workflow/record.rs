//! Workflow record: one row per top-level run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::{OrchestratorResult, WorkflowError};
use super::types::{StepName, WorkflowStatus, WorkflowType};

/// Persisted state of a single workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRecord {
    /// Unique workflow identifier
    pub workflow_id: String,
    /// Workflow variant
    pub workflow_type: WorkflowType,
    /// Current status
    pub status: WorkflowStatus,
    /// Input location (e.g. a stage path)
    pub source_reference: String,
    /// Output location (e.g. a curated schema)
    pub target_reference: String,
    /// Optional target table inside the target location
    pub target_table: Option<String>,
    /// Who started the run
    pub initiated_by: Option<String>,
    /// When the run started
    pub start_time: DateTime<Utc>,
    /// When the run reached a terminal status
    pub end_time: Option<DateTime<Utc>>,
    /// Total duration, set once terminal
    pub duration_seconds: Option<f64>,
    /// Steps attempted so far, in order
    pub step_sequence: Vec<StepName>,
    /// Error message if failed
    pub error_message: Option<String>,
}

impl WorkflowRecord {
    /// Create a new record in INITIATED status
    pub fn new(
        workflow_type: WorkflowType,
        source_reference: impl Into<String>,
        target_reference: impl Into<String>,
    ) -> Self {
        Self {
            workflow_id: Self::generate_id(),
            workflow_type,
            status: WorkflowStatus::Initiated,
            source_reference: source_reference.into(),
            target_reference: target_reference.into(),
            target_table: None,
            initiated_by: None,
            start_time: Utc::now(),
            end_time: None,
            duration_seconds: None,
            step_sequence: Vec::new(),
            error_message: None,
        }
    }

    /// Generate a new workflow ID
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Set the target table
    pub fn with_target_table(mut self, table: Option<String>) -> Self {
        self.target_table = table;
        self
    }

    /// Set the initiating user
    pub fn with_initiated_by(mut self, user: Option<String>) -> Self {
        self.initiated_by = user;
        self
    }

    /// Check whether the record can no longer change
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to IN_PROGRESS
    pub fn start(&mut self) -> OrchestratorResult<()> {
        self.transition(WorkflowStatus::InProgress)
    }

    /// Append a step to the attempted sequence.
    ///
    /// Only the next step of the plan is accepted, so the sequence stays a
    /// prefix of the plan with no repeats.
    pub fn record_step(&mut self, step: StepName) -> OrchestratorResult<()> {
        if self.status != WorkflowStatus::InProgress {
            return Err(self.invalid(WorkflowStatus::InProgress));
        }
        let mut attempted = self.step_sequence.clone();
        attempted.push(step);
        if !self.workflow_type.is_plan_prefix(&attempted) {
            return Err(WorkflowError::PlanViolation {
                workflow_id: self.workflow_id.clone(),
                step,
            });
        }
        self.step_sequence = attempted;
        Ok(())
    }

    /// Mark the run COMPLETED.
    ///
    /// Stamps `end_time` now; `duration_seconds` is `end_time - start_time`.
    pub fn complete(&mut self) -> OrchestratorResult<()> {
        self.transition(WorkflowStatus::Completed)?;
        self.finish();
        Ok(())
    }

    /// Mark the run FAILED with an error message
    pub fn fail(&mut self, error: impl Into<String>) -> OrchestratorResult<()> {
        self.transition(WorkflowStatus::Failed)?;
        self.error_message = Some(error.into());
        self.finish();
        Ok(())
    }

    /// Check that the run finished every planned step
    pub fn ran_full_plan(&self) -> bool {
        self.step_sequence.as_slice() == self.workflow_type.plan()
    }

    fn finish(&mut self) {
        let end = Utc::now().max(self.start_time);
        self.end_time = Some(end);
        self.duration_seconds = Some(seconds_between(self.start_time, end));
    }

    fn transition(&mut self, next: WorkflowStatus) -> OrchestratorResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(self.invalid(next));
        }
        self.status = next;
        Ok(())
    }

    fn invalid(&self, to: WorkflowStatus) -> WorkflowError {
        WorkflowError::InvalidTransition {
            workflow_id: self.workflow_id.clone(),
            from: self.status,
            to,
        }
    }
}

/// Fractional seconds from `start` to `end`
pub(crate) fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start)
        .num_microseconds()
        .map_or_else(|| (end - start).num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onboarding() -> WorkflowRecord {
        WorkflowRecord::new(
            WorkflowType::Onboarding,
            "@RAW_DATA_STAGE/customers.csv",
            "CURATED",
        )
    }

    #[test]
    fn test_new_record_is_initiated() {
        let record = onboarding();
        assert_eq!(record.status, WorkflowStatus::Initiated);
        assert!(record.step_sequence.is_empty());
        assert!(record.end_time.is_none());
        assert!(record.duration_seconds.is_none());
        assert!(Uuid::parse_str(&record.workflow_id).is_ok());
    }

    #[test]
    fn test_record_lifecycle_completed() {
        let mut record = onboarding();
        record.start().unwrap();
        for step in WorkflowType::Onboarding.plan() {
            record.record_step(*step).unwrap();
        }
        record.start_time = record.start_time - chrono::Duration::milliseconds(1500);
        record.complete().unwrap();

        assert_eq!(record.status, WorkflowStatus::Completed);
        assert!(record.ran_full_plan());
        let end = record.end_time.unwrap();
        assert_eq!(
            record.duration_seconds,
            Some(seconds_between(record.start_time, end))
        );
        assert!(record.duration_seconds.unwrap() >= 1.5);
        assert!(record.error_message.is_none());
    }

    #[test]
    fn test_terminal_record_rejects_changes() {
        let mut record = onboarding();
        record.start().unwrap();
        record.record_step(StepName::Profiling).unwrap();
        record.fail("profiling failed").unwrap();
        let snapshot = record.clone();

        assert!(matches!(
            record.complete(),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        assert!(record.fail("again").is_err());
        assert!(record.record_step(StepName::Dictionary).is_err());
        assert_eq!(record, snapshot);
    }

    #[test]
    fn test_step_sequence_enforces_plan_order() {
        let mut record = onboarding();
        record.start().unwrap();
        assert!(record.record_step(StepName::Dictionary).is_err());
        record.record_step(StepName::Profiling).unwrap();
        assert!(record.record_step(StepName::Profiling).is_err());
        assert_eq!(record.step_sequence, vec![StepName::Profiling]);
    }

    #[test]
    fn test_steps_require_in_progress() {
        let mut record = onboarding();
        assert!(record.record_step(StepName::Profiling).is_err());
    }
}
