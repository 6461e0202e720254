//! CLI command handlers

pub mod maintenance;
pub mod query;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use onboarding_orchestrator::collaborators::ProcedureClient;
use onboarding_orchestrator::llm;
use onboarding_orchestrator::store::DuckDbStore;
use onboarding_orchestrator::workflow::{Collaborators, OrchestratorConfig, WorkflowController};
use tracing::debug;

use crate::error::CliError;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Configuration file (TOML)
    pub config: Option<PathBuf>,
    /// Workflow database, overriding the configuration
    pub database: Option<PathBuf>,
    /// Print JSON instead of text
    pub json: bool,
}

/// Load the configuration file, if any, and apply command-line overrides
pub fn load_config(global: &GlobalArgs) -> Result<OrchestratorConfig, CliError> {
    let mut config = match &global.config {
        Some(path) => {
            if !path.exists() {
                return Err(CliError::FileReadError(
                    path.clone(),
                    "file does not exist".to_string(),
                ));
            }
            OrchestratorConfig::load(path)?
        }
        None => OrchestratorConfig::default(),
    };
    if let Some(database) = &global.database {
        config = config.with_database(database.clone());
    }
    debug!(database = %config.database.display(), "Loaded configuration");
    Ok(config)
}

/// Open the workflow database and wire the procedure client and summary backend
pub fn build_controller(config: OrchestratorConfig) -> Result<WorkflowController, CliError> {
    let store = Arc::new(DuckDbStore::open_initialized(&config.database)?);
    let client = Arc::new(
        ProcedureClient::new(&config.procedures.base_url)
            .with_timeout(config.procedures.timeout_seconds),
    );
    let completion = llm::client_from_settings(&config.llm)?;

    Ok(
        WorkflowController::new(config, store, Collaborators::shared(client))
            .with_completion_client(completion),
    )
}
