//! Output formatting for CLI

use chrono::{DateTime, Utc};
use onboarding_orchestrator::store::{ExecutionLogEntry, WorkflowStats};
use onboarding_orchestrator::workflow::{WorkflowRecord, WorkflowResult};
use serde::Serialize;

use crate::error::CliError;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn timestamp(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn seconds(duration: Option<f64>) -> String {
    duration
        .map(|d| format!("{d:.2}s"))
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let kept: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

/// Format the outcome of a run
pub fn format_result(result: &WorkflowResult) -> String {
    let mut output = String::new();
    output.push_str(&format!("Workflow:  {}\n", result.workflow_id));
    output.push_str(&format!("Type:      {}\n", result.workflow_type));
    output.push_str(&format!("Status:    {}\n", result.status));
    output.push_str(&format!(
        "Duration:  {:.2}s\n",
        result.total_duration_seconds
    ));

    if !result.step_results.is_empty() {
        output.push_str("\nSteps:\n");
        for step in &result.step_results {
            output.push_str(&format!(
                "  {:<12} {:<8} {:>8.2}s",
                step.step.as_str(),
                step.status.to_string(),
                step.duration_seconds
            ));
            if let Some(error) = &step.error {
                output.push_str(&format!("  {error}"));
            }
            output.push('\n');
        }
    }

    if let Some(summary) = &result.summary {
        output.push_str(&format!("\nSummary:\n  {summary}\n"));
    }
    if let Some(error) = &result.error {
        output.push_str(&format!("\nError: {error}\n"));
    }
    output
}

/// Format a single workflow record
pub fn format_record(record: &WorkflowRecord) -> String {
    let steps: Vec<&str> = record.step_sequence.iter().map(|s| s.as_str()).collect();
    let mut output = String::new();
    output.push_str(&format!("Workflow:     {}\n", record.workflow_id));
    output.push_str(&format!("Type:         {}\n", record.workflow_type));
    output.push_str(&format!("Status:       {}\n", record.status));
    output.push_str(&format!("Source:       {}\n", record.source_reference));
    output.push_str(&format!("Target:       {}\n", record.target_reference));
    if let Some(table) = &record.target_table {
        output.push_str(&format!("Target table: {table}\n"));
    }
    if let Some(user) = &record.initiated_by {
        output.push_str(&format!("Initiated by: {user}\n"));
    }
    output.push_str(&format!("Started:      {}\n", timestamp(&record.start_time)));
    if let Some(end) = &record.end_time {
        output.push_str(&format!("Ended:        {}\n", timestamp(end)));
    }
    output.push_str(&format!("Duration:     {}\n", seconds(record.duration_seconds)));
    output.push_str(&format!("Steps:        {}\n", steps.join(" -> ")));
    if let Some(error) = &record.error_message {
        output.push_str(&format!("Error:        {error}\n"));
    }
    output
}

/// Format workflow records as a table
pub fn format_records(records: &[WorkflowRecord]) -> String {
    if records.is_empty() {
        return "No workflows found.\n".to_string();
    }
    let mut output = format!(
        "{:<36}  {:<16}  {:<12}  {:<19}  {:>9}  {}\n",
        "WORKFLOW ID", "TYPE", "STATUS", "STARTED", "DURATION", "SOURCE"
    );
    for record in records {
        output.push_str(&format!(
            "{:<36}  {:<16}  {:<12}  {:<19}  {:>9}  {}\n",
            record.workflow_id,
            record.workflow_type.to_string(),
            record.status.to_string(),
            timestamp(&record.start_time),
            seconds(record.duration_seconds),
            truncate(&record.source_reference, 48)
        ));
    }
    output
}

/// Format execution log entries as a table
pub fn format_executions(entries: &[ExecutionLogEntry]) -> String {
    if entries.is_empty() {
        return "No executions recorded.\n".to_string();
    }
    let mut output = format!(
        "{:<36}  {:<12}  {:<9}  {:<19}  {:>9}  {}\n",
        "EXECUTION ID", "STEP", "STATUS", "STARTED", "DURATION", "ERROR"
    );
    for entry in entries {
        output.push_str(&format!(
            "{:<36}  {:<12}  {:<9}  {:<19}  {:>9}  {}\n",
            entry.execution_id,
            entry.step_name.as_str(),
            entry.status.to_string(),
            timestamp(&entry.start_time),
            seconds(entry.duration_seconds),
            entry
                .error_message
                .as_deref()
                .map(|e| truncate(e, 60))
                .unwrap_or_default()
        ));
    }
    output
}

/// Format aggregate workflow counts
pub fn format_stats(stats: &WorkflowStats, window_days: Option<u32>) -> String {
    let mut output = String::new();
    output.push_str("Workflow Statistics\n");
    output.push_str("===================\n");
    match window_days {
        Some(days) => output.push_str(&format!("Window:        last {days} days\n")),
        None => output.push_str("Window:        all time\n"),
    }
    output.push_str(&format!("Total:         {}\n", stats.total));
    output.push_str(&format!("Completed:     {}\n", stats.completed));
    output.push_str(&format!("Failed:        {}\n", stats.failed));
    output.push_str(&format!("In progress:   {}\n", stats.in_progress));
    output.push_str(&format!(
        "Avg duration:  {}\n",
        seconds(stats.average_duration_seconds)
    ));
    output.push_str(&format!("Success rate:  {:.1}%\n", stats.success_rate));
    output
}
