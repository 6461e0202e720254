//! CLI commands for database setup and upkeep

use chrono::Duration;
use onboarding_orchestrator::store::DuckDbStore;

use super::{GlobalArgs, build_controller, load_config};
use crate::error::CliError;
use crate::output::print_json;

/// Arguments for the `init` command
pub struct InitArgs {
    /// Drop and recreate existing tables
    pub force: bool,
}

/// Arguments for the `reconcile` command
pub struct ReconcileArgs {
    /// Age in minutes after which a non-terminal workflow is closed;
    /// the configured `orphan_timeout_minutes` when absent
    pub older_than_minutes: Option<u64>,
}

/// Handle the `init` command
pub fn handle_init(global: &GlobalArgs, args: &InitArgs) -> Result<(), CliError> {
    let config = load_config(global)?;
    let db_path = config.database.display().to_string();
    let store = DuckDbStore::open(&config.database)?;

    if store.is_initialized()? && !args.force {
        println!("Database already initialized at: {}", db_path);
        println!("Schema version: {}", store.schema_version()?);
        return Ok(());
    }

    store.init(args.force)?;
    println!("Workflow database initialized at: {}", db_path);
    println!("Schema version: {}", store.schema_version()?);
    Ok(())
}

/// Handle the `reconcile` command
pub fn handle_reconcile(global: &GlobalArgs, args: &ReconcileArgs) -> Result<(), CliError> {
    let config = load_config(global)?;
    let minutes = args
        .older_than_minutes
        .unwrap_or(config.orphan_timeout_minutes);
    let minutes = i64::try_from(minutes).map_err(|_| {
        CliError::InvalidArgument(format!("--older-than-minutes is too large: {minutes}"))
    })?;

    let controller = build_controller(config)?;
    let closed = controller.reconcile_orphaned(Duration::minutes(minutes))?;

    if global.json {
        return print_json(&closed);
    }
    if closed.is_empty() {
        println!("No orphaned workflows older than {} minutes.", minutes);
    } else {
        println!("Marked {} orphaned workflow(s) as FAILED:", closed.len());
        for workflow_id in &closed {
            println!("  - {}", workflow_id);
        }
    }
    Ok(())
}
