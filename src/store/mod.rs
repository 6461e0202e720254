//! Persistence for workflow records, execution logs and step metrics
//!
//! Three narrow traits separate the concerns the controller depends on:
//!
//! - [`WorkflowStore`]: one row per top-level run, written only by the controller
//! - [`ExecutionLog`]: append/update-only log of step attempts
//! - [`MetricsSink`]: best-effort stream of per-step observations
//!
//! [`MemoryStore`] implements all three for tests and embedding. With the
//! `duckdb-backend` feature, [`DuckDbStore`] persists them in an embedded
//! DuckDB file:
//!
//! ```rust,ignore
//! use onboarding_orchestrator::store::{DuckDbStore, WorkflowFilter, WorkflowStore};
//!
//! let store = DuckDbStore::open("workflows.duckdb")?;
//! store.init(false)?;
//!
//! for record in store.list_workflows(&WorkflowFilter::recent(10))? {
//!     println!("{} {}", record.workflow_id, record.status);
//! }
//! ```


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod error;
mod log;
mod memory;
mod metrics;

#[cfg(feature = "duckdb-backend")]
mod db;
#[cfg(feature = "duckdb-backend")]
mod schema;

pub use error::{StoreError, StoreResult};
pub use log::{ExecutionLog, ExecutionLogEntry};
pub use memory::MemoryStore;
pub use metrics::{MetricKind, MetricsSink, StepMetric};

#[cfg(feature = "duckdb-backend")]
pub use db::DuckDbStore;
#[cfg(feature = "duckdb-backend")]
pub use schema::{SCHEMA_VERSION, StoreSchema};

use crate::workflow::{WorkflowRecord, WorkflowStatus};

/// Message stored on records closed by [`WorkflowStore::reconcile_orphaned`]
pub const ORPHANED_MESSAGE: &str = "Workflow abandoned: no progress recorded before the orphan timeout";

/// Selection criteria for listing workflows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowFilter {
    /// Only these statuses (empty means any)
    pub statuses: Vec<WorkflowStatus>,
    /// Started at or after
    pub since: Option<DateTime<Utc>>,
    /// Started strictly before
    pub started_before: Option<DateTime<Utc>>,
    /// Maximum number of rows
    pub limit: Option<usize>,
}

impl WorkflowFilter {
    /// Most recent workflows, newest first
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn with_statuses(mut self, statuses: Vec<WorkflowStatus>) -> Self {
        self.statuses = statuses;
        self
    }

    pub fn with_since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self
    }

    pub fn with_started_before(mut self, before: Option<DateTime<Utc>>) -> Self {
        self.started_before = before;
        self
    }

    /// Check whether a record passes every criterion except the limit
    pub fn matches(&self, record: &WorkflowRecord) -> bool {
        (self.statuses.is_empty() || self.statuses.contains(&record.status))
            && self.since.is_none_or(|since| record.start_time >= since)
            && self
                .started_before
                .is_none_or(|before| record.start_time < before)
    }
}

/// Aggregate counts for the operations dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStats {
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    /// INITIATED and IN_PROGRESS
    pub in_progress: u64,
    /// Mean over workflows with a recorded duration
    pub average_duration_seconds: Option<f64>,
    /// Percentage of workflows that COMPLETED
    pub success_rate: f64,
}

impl WorkflowStats {
    /// Aggregate a set of records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a WorkflowRecord>) -> Self {
        let mut stats = WorkflowStats::default();
        let mut duration_sum = 0.0;
        let mut duration_count = 0u64;

        for record in records {
            stats.total += 1;
            match record.status {
                WorkflowStatus::Completed => stats.completed += 1,
                WorkflowStatus::Failed => stats.failed += 1,
                WorkflowStatus::Initiated | WorkflowStatus::InProgress => stats.in_progress += 1,
            }
            if let Some(duration) = record.duration_seconds {
                duration_sum += duration;
                duration_count += 1;
            }
        }

        if duration_count > 0 {
            stats.average_duration_seconds = Some(duration_sum / duration_count as f64);
        }
        stats.success_rate = success_rate(stats.completed, stats.total);
        stats
    }
}

pub(crate) fn success_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 * 100.0 / total as f64
    }
}

/// Storage for workflow records.
///
/// Each call is an atomic per-row insert, update or read. There is no
/// optimistic concurrency token: the controller is the only writer of a
/// given row while it is running.
pub trait WorkflowStore: Send + Sync {
    /// Insert a new record
    fn create_workflow(&self, record: &WorkflowRecord) -> StoreResult<()>;

    /// Overwrite an existing record
    fn update_workflow(&self, record: &WorkflowRecord) -> StoreResult<()>;

    /// Get a record by ID
    fn get_workflow(&self, workflow_id: &str) -> StoreResult<Option<WorkflowRecord>>;

    /// Records matching the filter, most recent first
    fn list_workflows(&self, filter: &WorkflowFilter) -> StoreResult<Vec<WorkflowRecord>>;

    /// Aggregate counts over workflows started since the given time
    fn workflow_stats(&self, since: Option<DateTime<Utc>>) -> StoreResult<WorkflowStats> {
        let records = self.list_workflows(&WorkflowFilter::default().with_since(since))?;
        Ok(WorkflowStats::from_records(&records))
    }

    /// Mark non-terminal records started before `older_than` as FAILED.
    ///
    /// Returns the IDs of the records that were closed.
    fn reconcile_orphaned(&self, older_than: DateTime<Utc>) -> StoreResult<Vec<String>> {
        let filter = WorkflowFilter::default()
            .with_statuses(vec![WorkflowStatus::Initiated, WorkflowStatus::InProgress])
            .with_started_before(Some(older_than));

        let mut closed = Vec::new();
        for mut record in self.list_workflows(&filter)? {
            if record.fail(ORPHANED_MESSAGE).is_err() {
                continue;
            }
            match self.update_workflow(&record) {
                // Finished between the listing and the update
                Err(StoreError::AlreadyTerminal { .. }) => continue,
                other => other?,
            }
            tracing::warn!(workflow_id = %record.workflow_id, "Closed orphaned workflow");
            closed.push(record.workflow_id);
        }
        Ok(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowType;

    fn record(status: WorkflowStatus, duration: Option<f64>) -> WorkflowRecord {
        let mut record = WorkflowRecord::new(WorkflowType::Onboarding, "@STAGE/a.csv", "CURATED");
        record.status = status;
        record.duration_seconds = duration;
        record
    }

    #[test]
    fn test_stats_from_records() {
        let records = vec![
            record(WorkflowStatus::Completed, Some(10.0)),
            record(WorkflowStatus::Completed, Some(20.0)),
            record(WorkflowStatus::Failed, Some(3.0)),
            record(WorkflowStatus::InProgress, None),
        ];
        let stats = WorkflowStats::from_records(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.average_duration_seconds, Some(11.0));
        assert_eq!(stats.success_rate, 50.0);
    }

    #[test]
    fn test_empty_stats() {
        let stats = WorkflowStats::from_records(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert!(stats.average_duration_seconds.is_none());
    }

    #[test]
    fn test_filter_matches() {
        let failed = record(WorkflowStatus::Failed, Some(1.0));
        let filter = WorkflowFilter::recent(5).with_statuses(vec![WorkflowStatus::Completed]);
        assert!(!filter.matches(&failed));

        let filter = WorkflowFilter::default()
            .with_started_before(Some(failed.start_time - chrono::Duration::seconds(1)));
        assert!(!filter.matches(&failed));

        let filter = WorkflowFilter::default().with_since(Some(failed.start_time));
        assert!(filter.matches(&failed));
    }
}
