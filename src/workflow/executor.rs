//! Step executor: runs one collaborator call and records it
//!
//! Every invocation writes exactly one execution log insert and one update,
//! and emits two metric observations. Writes to the log and metrics sinks are
//! best-effort: a failing sink produces a warning and nothing else, so it can
//! never change a step's outcome.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, info_span, warn};

use super::context::RunContext;
use super::types::{StepName, StepStatus};
use crate::collaborators::{CollaboratorError, CollaboratorResult, StepParameters, normalize_payload};
use crate::store::{ExecutionLog, ExecutionLogEntry, MetricsSink, StepMetric};

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome<T> {
    /// The collaborator returned a payload
    Success(T),
    /// The collaborator failed with the given error text
    Failure(String),
}

/// Normalized result of running one step
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult<T> {
    pub step: StepName,
    /// Execution log entry written for this attempt
    pub execution_id: String,
    pub outcome: StepOutcome<T>,
    /// Wall-clock duration of the collaborator call
    pub duration: Duration,
}

impl<T> StepResult<T> {
    pub fn status(&self) -> StepStatus {
        match self.outcome {
            StepOutcome::Success(_) => StepStatus::Success,
            StepOutcome::Failure(_) => StepStatus::Failure,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, StepOutcome::Success(_))
    }

    /// Error text if the step failed
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            StepOutcome::Failure(message) => Some(message),
            StepOutcome::Success(_) => None,
        }
    }

    /// Serializable summary without the payload
    pub fn report(&self) -> StepReport {
        StepReport {
            step: self.step,
            execution_id: self.execution_id.clone(),
            status: self.status(),
            duration_seconds: self.duration.as_secs_f64(),
            error: self.error().map(str::to_string),
        }
    }

    /// Split into the report and the payload, if any
    pub fn into_parts(self) -> (StepReport, Option<T>) {
        let report = self.report();
        let payload = match self.outcome {
            StepOutcome::Success(payload) => Some(payload),
            StepOutcome::Failure(_) => None,
        };
        (report, payload)
    }
}

/// Per-step entry in a workflow result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub step: StepName,
    pub execution_id: String,
    pub status: StepStatus,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs steps and records each attempt in the execution log and metrics sink
#[derive(Clone)]
pub struct StepExecutor {
    log: Arc<dyn ExecutionLog>,
    metrics: Arc<dyn MetricsSink>,
}

impl StepExecutor {
    /// Create a new step executor
    pub fn new(log: Arc<dyn ExecutionLog>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self { log, metrics }
    }

    /// Run one step.
    ///
    /// Never returns an error: collaborator failures and panics become
    /// [`StepOutcome::Failure`].
    pub fn run_step<T, F>(
        &self,
        ctx: &RunContext,
        step: StepName,
        params: &StepParameters,
        call: F,
    ) -> StepResult<T>
    where
        T: Serialize,
        F: FnOnce(&StepParameters) -> CollaboratorResult<T>,
    {
        let mut entry =
            ExecutionLogEntry::running(ctx.workflow_id(), step, Value::Object(params.clone()));

        let _span = info_span!(
            "workflow_step",
            workflow_id = %ctx.workflow_id(),
            step = step.as_str(),
            execution_id = %entry.execution_id
        )
        .entered();

        info!(step = step.as_str(), "Starting step");
        if let Err(e) = self.log.append(&entry) {
            warn!(step = step.as_str(), error = %e, "Failed to append execution log entry");
        }

        let start = Instant::now();
        let result = catch_unwind(AssertUnwindSafe(|| call(params)))
            .unwrap_or_else(|panic| Err(CollaboratorError::Panicked(panic_message(panic))));
        let duration = start.elapsed();

        let outcome = match result {
            Ok(payload) => {
                let snapshot = match serde_json::to_value(&payload) {
                    Ok(value) => normalize_payload(value),
                    Err(e) => {
                        warn!(step = step.as_str(), error = %e, "Step output is not serializable");
                        Value::Null
                    }
                };
                entry.complete(snapshot, duration);
                info!(
                    step = step.as_str(),
                    duration_ms = duration.as_millis() as u64,
                    "Step completed"
                );
                StepOutcome::Success(payload)
            }
            Err(e) => {
                let message = e.to_string();
                entry.fail(&message, duration);
                error!(
                    step = step.as_str(),
                    duration_ms = duration.as_millis() as u64,
                    error = %message,
                    "Step failed"
                );
                StepOutcome::Failure(message)
            }
        };

        if let Err(e) = self.log.update(&entry) {
            warn!(step = step.as_str(), error = %e, "Failed to update execution log entry");
        }

        let result = StepResult {
            step,
            execution_id: entry.execution_id,
            outcome,
            duration,
        };
        self.record_metrics(&result);
        result
    }

    fn record_metrics<T>(&self, result: &StepResult<T>) {
        let metrics = StepMetric::for_attempt(
            result.step,
            &result.execution_id,
            result.duration.as_secs_f64(),
            result.status(),
        );
        for metric in &metrics {
            if let Err(e) = self.metrics.record(metric) {
                warn!(
                    step = result.step.as_str(),
                    metric = metric.kind.as_str(),
                    error = %e,
                    "Failed to record step metric"
                );
            }
        }
        debug!(step = result.step.as_str(), "Recorded step metrics");
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
