//! Workflow execution and step sequencing
//!
//! This module runs data-onboarding workflows: a fixed plan of steps per
//! workflow variant, executed strictly in order with fail-fast semantics.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use onboarding_orchestrator::collaborators::ProcedureClient;
//! use onboarding_orchestrator::store::MemoryStore;
//! use onboarding_orchestrator::workflow::{
//!     Collaborators, OrchestratorConfig, WorkflowController,
//! };
//!
//! let client = Arc::new(ProcedureClient::new("http://localhost:8080"));
//! let controller = WorkflowController::new(
//!     OrchestratorConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Collaborators::shared(client),
//! );
//!
//! let result = controller.run("ONBOARDING", "@RAW_DATA_STAGE/customers.csv", "CURATED")?;
//! println!("{} finished in {:.1}s", result.workflow_id, result.total_duration_seconds);
//! ```
//!
//! # Plans
//!
//! | Variant          | Steps                            |
//! |------------------|----------------------------------|
//! | `ONBOARDING`     | PROFILING, DICTIONARY, MAPPING   |
//! | `PROFILING_ONLY` | PROFILING                        |
//! | `MAPPING_ONLY`   | not available                    |
//!
//! # Status lifecycle
//!
//! INITIATED → IN_PROGRESS → COMPLETED | FAILED. Terminal records never
//! change again.

mod config;
mod context;
mod controller;
mod error;
mod executor;
mod record;
mod summary;
pub(crate) mod types;

pub use config::{LlmSettings, OrchestratorConfig, ProcedureSettings};
pub use context::RunContext;
pub use controller::{Collaborators, WorkflowController, WorkflowRequest, WorkflowResult};
pub use error::{OrchestratorResult, WorkflowError};
pub use executor::{StepExecutor, StepOutcome, StepReport, StepResult};
pub use record::WorkflowRecord;
pub use summary::{SummaryInput, fallback_summary, summary_prompt, synthesize_summary};
pub use types::{ExecutionStatus, StepName, StepStatus, WorkflowStatus, WorkflowType};
