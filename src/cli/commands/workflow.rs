//! CLI command for running onboarding workflows

use tracing::info;

use super::{GlobalArgs, build_controller, load_config};
use crate::error::CliError;
use crate::output::{format_result, print_json};

/// Arguments for the `run` command
pub struct RunArgs {
    /// Stage path of the file to onboard (e.g. `@RAW_STAGE/customers.csv`)
    pub source: String,
    /// Schema the mapping step writes into
    pub target_schema: Option<String>,
    /// Table the mapping step writes into; derived by the mapper when absent
    pub target_table: Option<String>,
    /// Workflow type name
    pub workflow_type: String,
    /// Override the profiling sample size
    pub sample_size: Option<u64>,
    /// Override the profiling file format
    pub file_format: Option<String>,
    /// Override the dictionary target database
    pub target_database: Option<String>,
}

/// Handle the `run` command
pub fn handle_run(global: &GlobalArgs, args: &RunArgs) -> Result<(), CliError> {
    if args.source.trim().is_empty() {
        return Err(CliError::InvalidArgument(
            "source path must not be empty".to_string(),
        ));
    }

    let mut config = load_config(global)?;
    if let Some(sample_size) = args.sample_size {
        config = config.with_sample_size(sample_size);
    }
    if let Some(format) = &args.file_format {
        config = config.with_file_format(format.clone());
    }
    if let Some(database) = &args.target_database {
        config = config.with_target_database(database.clone());
    }
    config.validate()?;

    let controller = build_controller(config)?;

    if !global.json {
        eprintln!("Running {} workflow for {}", args.workflow_type, args.source);
    }
    info!(source = %args.source, workflow_type = %args.workflow_type, "Starting workflow from CLI");

    let result = controller.start_workflow(
        &args.source,
        args.target_schema.as_deref(),
        args.target_table.as_deref(),
        &args.workflow_type,
    )?;

    if global.json {
        print_json(&result)?;
    } else {
        print!("{}", format_result(&result));
    }

    if result.is_success() {
        Ok(())
    } else {
        Err(CliError::WorkflowFailed {
            workflow_id: result.workflow_id.clone(),
            message: result.error.clone().unwrap_or_default(),
        })
    }
}
