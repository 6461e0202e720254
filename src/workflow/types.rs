//! Workflow variants, step names and status enumerations

use serde::{Deserialize, Serialize};

/// A processing step within a workflow plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepName {
    /// Profile the source data (schema, statistics, PII, quality)
    Profiling,
    /// Generate DDL and enrich the data dictionary
    Dictionary,
    /// Generate field mappings and transformation artifacts
    Mapping,
}

impl StepName {
    /// Get step name as stored in the execution log
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profiling => "PROFILING",
            Self::Dictionary => "DICTIONARY",
            Self::Mapping => "MAPPING",
        }
    }

    /// Key used for the step's sub-result in workflow output
    pub fn result_key(&self) -> &'static str {
        match self {
            Self::Profiling => "profiling",
            Self::Dictionary => "dictionary",
            Self::Mapping => "mapping",
        }
    }

    /// Name of the remote stage procedure backing this step
    pub fn procedure(&self) -> &'static str {
        match self {
            Self::Profiling => "SP_AGENT_PROFILE",
            Self::Dictionary => "SP_AGENT_DICTIONARY",
            Self::Mapping => "SP_AGENT_MAPPING",
        }
    }

    /// Get step description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Profiling => "Profile source data",
            Self::Dictionary => "Generate DDL and data dictionary entries",
            Self::Mapping => "Generate field mappings",
        }
    }
}

impl std::fmt::Display for StepName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StepName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PROFILING" => Ok(Self::Profiling),
            "DICTIONARY" => Ok(Self::Dictionary),
            "MAPPING" => Ok(Self::Mapping),
            _ => Err(format!("Unknown step: {}", s)),
        }
    }
}

/// Supported workflow variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowType {
    /// Profiling, dictionary and mapping in sequence
    Onboarding,
    /// Profiling only
    ProfilingOnly,
    /// Mapping against previously generated dictionary output
    MappingOnly,
}

/// Fixed step plan per workflow variant.
///
/// Adding a variant means adding a row here; the controller never branches
/// on the variant itself.
const STEP_PLANS: &[(WorkflowType, &[StepName])] = &[
    (
        WorkflowType::Onboarding,
        &[StepName::Profiling, StepName::Dictionary, StepName::Mapping],
    ),
    (WorkflowType::ProfilingOnly, &[StepName::Profiling]),
    (WorkflowType::MappingOnly, &[StepName::Mapping]),
];

/// Variants the controller refuses to start
const UNSUPPORTED: &[(WorkflowType, &str)] = &[(
    WorkflowType::MappingOnly,
    "MAPPING_ONLY workflow requires existing dictionary results and no lookup contract for them is defined",
)];

impl WorkflowType {
    /// Get all workflow variants
    pub fn all() -> Vec<Self> {
        vec![Self::Onboarding, Self::ProfilingOnly, Self::MappingOnly]
    }

    /// Get workflow type as stored in the workflow table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Onboarding => "ONBOARDING",
            Self::ProfilingOnly => "PROFILING_ONLY",
            Self::MappingOnly => "MAPPING_ONLY",
        }
    }

    /// Ordered step plan for this variant
    pub fn plan(&self) -> &'static [StepName] {
        STEP_PLANS
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, plan)| *plan)
            .unwrap_or(&[])
    }

    /// Reason this variant cannot be started, if any
    pub fn unsupported_reason(&self) -> Option<&'static str> {
        UNSUPPORTED
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, reason)| *reason)
    }

    /// Check whether the controller can run this variant
    pub fn is_supported(&self) -> bool {
        self.unsupported_reason().is_none()
    }

    /// Check whether a step sequence is a prefix of this variant's plan
    pub fn is_plan_prefix(&self, steps: &[StepName]) -> bool {
        let plan = self.plan();
        steps.len() <= plan.len() && plan.iter().zip(steps).all(|(a, b)| a == b)
    }
}

impl std::fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "ONBOARDING" => Ok(Self::Onboarding),
            "PROFILING_ONLY" => Ok(Self::ProfilingOnly),
            "MAPPING_ONLY" => Ok(Self::MappingOnly),
            _ => Err(format!("Unknown workflow type: {}", s)),
        }
    }
}

/// Workflow lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Record created, no step started
    Initiated,
    /// Steps are executing
    InProgress,
    /// Every planned step succeeded
    Completed,
    /// A step failed and the run was aborted
    Failed,
}

impl WorkflowStatus {
    /// Get status as stored in the workflow table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "INITIATED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Terminal statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Check if moving to `next` is a legal transition
    pub fn can_transition_to(&self, next: WorkflowStatus) -> bool {
        matches!(
            (self, next),
            (Self::Initiated, Self::InProgress)
                | (Self::Initiated, Self::Failed)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "INITIATED" => Ok(Self::Initiated),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid workflow status: {}", s)),
        }
    }
}

/// Status of a single step execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid execution status: {}", s)),
        }
    }
}

/// Normalized outcome flag reported by the step executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Success,
    Failure,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StepStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            _ => Err(format!("Invalid step status: {}", s)),
        }
    }
}
