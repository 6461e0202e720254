//! Completion backends for workflow summaries
//!
//! A completed workflow gets a short human-readable summary. When a
//! [`CompletionClient`] is configured the summary is generated by a model;
//! otherwise, or when the model call fails, a templated summary is used.
//!
//! # Feature Flags
//!
//! - `api-backend`: Enable [`OllamaClient`] for online completions
//!
//! Without the feature, configuring an online mode yields
//! [`LlmError::BackendDisabled`].

mod client;
mod error;
#[cfg(feature = "api-backend")]
mod ollama;

use std::sync::Arc;

#[cfg(test)]
pub use client::MockCompletionClient;
pub use client::CompletionClient;
pub use error::{LlmError, LlmResult};
#[cfg(feature = "api-backend")]
pub use ollama::OllamaClient;

use crate::workflow::LlmSettings;

/// Build the completion client described by the settings.
///
/// Returns `None` when the mode is `none`.
pub fn client_from_settings(settings: &LlmSettings) -> LlmResult<Option<Arc<dyn CompletionClient>>> {
    match settings.mode.to_lowercase().as_str() {
        "none" | "" => Ok(None),
        #[cfg(feature = "api-backend")]
        "online" | "ollama" => Ok(Some(Arc::new(OllamaClient::from_settings(settings)))),
        #[cfg(not(feature = "api-backend"))]
        mode @ ("online" | "ollama") => Err(LlmError::BackendDisabled {
            mode: mode.to_string(),
            feature: "api-backend",
        }),
        other => Err(LlmError::UnknownMode(other.to_string())),
    }
}
