//! Model-backed summaries over the Ollama generate API

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::CompletionClient;
use super::error::{LlmError, LlmResult};
use crate::workflow::LlmSettings;

const GENERATE_PATH: &str = "/api/generate";

/// Summary completion client for a local or remote Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    endpoint: String,
    model: String,
    timeout: Duration,
    temperature: f32,
    http: reqwest::blocking::Client,
}

#[derive(Serialize)]
struct SummaryRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Serialize)]
struct SamplingOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct SummaryResponse {
    response: String,
    /// Nanoseconds spent by the server
    #[serde(default)]
    total_duration: Option<u64>,
}

impl OllamaClient {
    /// Client for `model` served at `base_url`
    pub fn new(base_url: impl AsRef<str>, model: impl Into<String>) -> Self {
        Self {
            endpoint: format!("{}{GENERATE_PATH}", base_url.as_ref().trim_end_matches('/')),
            model: model.into(),
            timeout: Duration::from_secs(120),
            temperature: 0.3,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// Client configured from the `[llm]` section
    pub fn from_settings(settings: &LlmSettings) -> Self {
        Self::new(&settings.url, &settings.model)
            .with_timeout(settings.timeout_seconds)
            .with_temperature(settings.temperature)
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Duration::from_secs(seconds);
        self
    }

    /// Sampling temperature, clamped to the range Ollama accepts
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout.as_secs())
        } else {
            LlmError::Unreachable {
                url: self.endpoint.clone(),
                message: err.to_string(),
            }
        }
    }
}

impl CompletionClient for OllamaClient {
    fn complete(&self, prompt: &str) -> LlmResult<String> {
        let body = SummaryRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: SamplingOptions {
                temperature: self.temperature,
            },
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Requesting workflow summary");
        let response = self
            .http
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Http {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }

        let text = response.text().map_err(|e| self.send_error(e))?;
        let parsed: SummaryResponse = serde_json::from_str(&text)?;
        if let Some(nanos) = parsed.total_duration {
            debug!(server_ms = nanos / 1_000_000, "Summary generated");
        }

        match parsed.response.trim() {
            "" => Err(LlmError::EmptyCompletion(self.model.clone())),
            summary => Ok(summary.to_string()),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_and_settings() {
        let settings = LlmSettings {
            mode: "online".to_string(),
            url: "http://models:11434/".to_string(),
            model: "mistral".to_string(),
            timeout_seconds: 15,
            temperature: 9.0,
        };
        let client = OllamaClient::from_settings(&settings);

        assert_eq!(client.endpoint(), "http://models:11434/api/generate");
        assert_eq!(client.model_name(), "mistral");
        assert_eq!(client.timeout, Duration::from_secs(15));
        assert_eq!(client.temperature, 2.0);
    }

    #[test]
    fn test_unreachable_server() {
        // Port 9 (discard) is not expected to serve HTTP
        let client = OllamaClient::new("http://127.0.0.1:9", "llama3.2").with_timeout(2);
        let err = client.complete("summarize").unwrap_err();
        assert!(matches!(
            err,
            LlmError::Unreachable { .. } | LlmError::Timeout(_)
        ));
    }
}
