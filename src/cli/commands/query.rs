//! CLI commands for inspecting workflow history

use chrono::{DateTime, Duration, Utc};
use onboarding_orchestrator::workflow::WorkflowStatus;

use super::{GlobalArgs, build_controller, load_config};
use crate::error::CliError;
use crate::output::{format_executions, format_record, format_records, format_stats, print_json};

/// Arguments for the `status` command
pub struct StatusArgs {
    pub workflow_id: String,
}

/// Arguments for the `list` command
pub struct ListArgs {
    /// Maximum number of workflows to show
    pub limit: usize,
    /// Only show workflows in these statuses
    pub statuses: Vec<String>,
    /// Only show workflows started within this many days
    pub days: Option<u32>,
}

/// Arguments for the `executions` command
pub struct ExecutionsArgs {
    pub workflow_id: String,
}

/// Arguments for the `stats` command
pub struct StatsArgs {
    /// Window in days; all time when absent
    pub days: Option<u32>,
}

fn since_days(days: Option<u32>) -> Option<DateTime<Utc>> {
    days.map(|d| Utc::now() - Duration::days(i64::from(d)))
}

fn parse_statuses(values: &[String]) -> Result<Vec<WorkflowStatus>, CliError> {
    values
        .iter()
        .map(|value| value.parse().map_err(CliError::InvalidArgument))
        .collect()
}

/// Handle the `status` command
pub fn handle_status(global: &GlobalArgs, args: &StatusArgs) -> Result<(), CliError> {
    let controller = build_controller(load_config(global)?)?;
    let record = controller.get_workflow_status(&args.workflow_id)?;

    if global.json {
        print_json(&record)
    } else {
        print!("{}", format_record(&record));
        Ok(())
    }
}

/// Handle the `list` command
pub fn handle_list(global: &GlobalArgs, args: &ListArgs) -> Result<(), CliError> {
    if args.limit == 0 {
        return Err(CliError::InvalidArgument(
            "--limit must be greater than zero".to_string(),
        ));
    }
    let statuses = parse_statuses(&args.statuses)?;

    let controller = build_controller(load_config(global)?)?;
    let records = if statuses.is_empty() && args.days.is_none() {
        controller.list_recent_workflows(args.limit)?
    } else {
        controller.list_workflows_filtered(&statuses, since_days(args.days), args.limit)?
    };

    if global.json {
        print_json(&records)
    } else {
        print!("{}", format_records(&records));
        Ok(())
    }
}

/// Handle the `executions` command
pub fn handle_executions(global: &GlobalArgs, args: &ExecutionsArgs) -> Result<(), CliError> {
    let controller = build_controller(load_config(global)?)?;
    let entries = controller.list_executions(&args.workflow_id)?;

    if global.json {
        print_json(&entries)
    } else {
        println!("Executions for workflow {}", args.workflow_id);
        println!();
        print!("{}", format_executions(&entries));
        Ok(())
    }
}

/// Handle the `stats` command
pub fn handle_stats(global: &GlobalArgs, args: &StatsArgs) -> Result<(), CliError> {
    let controller = build_controller(load_config(global)?)?;
    let stats = controller.workflow_stats(since_days(args.days))?;

    if global.json {
        print_json(&stats)
    } else {
        print!("{}", format_stats(&stats, args.days));
        Ok(())
    }
}
