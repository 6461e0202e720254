//! Onboarding Orchestrator - workflow execution for data onboarding pipelines
//!
//! Provides:
//! - Workflow controller with fixed per-variant step plans and fail-fast semantics
//! - Step executor with best-effort execution logging and metrics
//! - Persistent workflow store (in-memory, or DuckDB via `duckdb-backend`)
//! - Stage collaborator interfaces and an HTTP procedure client (`api-backend`)
//! - Summary synthesis through an optional completion backend

pub mod collaborators;
pub mod llm;
pub mod store;
pub mod workflow;

// Re-export commonly used types
pub use collaborators::{
    CollaboratorError, DictionaryGenerator, DictionaryResult, Mapper, MappingResult,
    ProfileResult, Profiler,
};
#[cfg(feature = "api-backend")]
pub use collaborators::ProcedureClient;
pub use llm::{CompletionClient, LlmError};
pub use store::{
    ExecutionLog, ExecutionLogEntry, MemoryStore, MetricsSink, StoreError, WorkflowStore,
};
#[cfg(feature = "duckdb-backend")]
pub use store::DuckDbStore;
pub use workflow::{
    Collaborators, OrchestratorConfig, OrchestratorResult, StepName, WorkflowController,
    WorkflowError, WorkflowRecord, WorkflowRequest, WorkflowResult, WorkflowStatus, WorkflowType,
};
