//! Human-readable summaries for completed workflows

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, warn};

use crate::llm::CompletionClient;

/// Per-step summaries and totals a workflow summary is built from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryInput<'a> {
    pub profiling: Option<&'a str>,
    pub dictionary: Option<&'a str>,
    pub mapping: Option<&'a str>,
    pub steps_executed: usize,
    pub total_duration_seconds: f64,
}

/// Prompt sent to the completion backend
pub fn summary_prompt(input: &SummaryInput<'_>) -> String {
    format!(
        "Summarize this data onboarding workflow in 3-4 sentences:\n\n\
         Profiling: {}\n\
         Dictionary: {}\n\
         Mapping: {}\n\n\
         Total duration: {:.2} seconds\n\n\
         Provide next steps for the data engineer.",
        input.profiling.unwrap_or(""),
        input.dictionary.unwrap_or(""),
        input.mapping.unwrap_or(""),
        input.total_duration_seconds,
    )
}

/// Deterministic summary used when no model is available
pub fn fallback_summary(steps_executed: usize) -> String {
    format!("Workflow completed with {steps_executed} steps executed.")
}

/// Generate a summary, falling back to the template on any backend failure.
///
/// A panicking backend counts as a failure.
pub fn synthesize_summary(client: Option<&dyn CompletionClient>, input: &SummaryInput<'_>) -> String {
    let Some(client) = client else {
        return fallback_summary(input.steps_executed);
    };

    let prompt = summary_prompt(input);
    let Ok(completion) = catch_unwind(AssertUnwindSafe(|| client.complete(&prompt))) else {
        warn!(model = client.model_name(), "Summary backend panicked, using template");
        return fallback_summary(input.steps_executed);
    };

    match completion {
        Ok(text) if !text.trim().is_empty() => {
            debug!(model = client.model_name(), "Generated workflow summary");
            text.trim().to_string()
        }
        Ok(_) => {
            warn!(model = client.model_name(), "Empty summary from model, using template");
            fallback_summary(input.steps_executed)
        }
        Err(e) => {
            warn!(model = client.model_name(), error = %e, "Summary generation failed, using template");
            fallback_summary(input.steps_executed)
        }
    }
}
