//! Per-step metric observations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StoreResult;
use crate::workflow::types::{StepName, StepStatus};

/// Kind of metric observed for a step attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricKind {
    /// Wall-clock duration in seconds
    ExecutionTime,
    /// 1 on success, 0 on failure
    SuccessRate,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecutionTime => "EXECUTION_TIME",
            Self::SuccessRate => "SUCCESS_RATE",
        }
    }

    /// Unit the value is expressed in
    pub fn unit(&self) -> &'static str {
        match self {
            Self::ExecutionTime => "SECONDS",
            Self::SuccessRate => "BOOLEAN",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXECUTION_TIME" => Ok(Self::ExecutionTime),
            "SUCCESS_RATE" => Ok(Self::SuccessRate),
            _ => Err(format!("Unknown metric type: {}", s)),
        }
    }
}

/// A single metric observation, tagged by step and execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetric {
    pub step_name: StepName,
    pub execution_id: String,
    pub kind: MetricKind,
    pub value: f64,
    pub outcome: StepStatus,
    pub recorded_at: DateTime<Utc>,
}

impl StepMetric {
    /// The two observations emitted for every step attempt
    pub fn for_attempt(
        step_name: StepName,
        execution_id: &str,
        duration_seconds: f64,
        outcome: StepStatus,
    ) -> [StepMetric; 2] {
        let recorded_at = Utc::now();
        let success = match outcome {
            StepStatus::Success => 1.0,
            StepStatus::Failure => 0.0,
        };
        [
            StepMetric {
                step_name,
                execution_id: execution_id.to_string(),
                kind: MetricKind::ExecutionTime,
                value: duration_seconds,
                outcome,
                recorded_at,
            },
            StepMetric {
                step_name,
                execution_id: execution_id.to_string(),
                kind: MetricKind::SuccessRate,
                value: success,
                outcome,
                recorded_at,
            },
        ]
    }
}

/// Best-effort sink for metric observations
pub trait MetricsSink: Send + Sync {
    fn record(&self, metric: &StepMetric) -> StoreResult<()>;
}
