//! HTTP client for remote stage procedures
//!
//! Each step maps to one procedure (`SP_AGENT_PROFILE`, `SP_AGENT_DICTIONARY`,
//! `SP_AGENT_MAPPING`), invoked as `POST {base_url}/procedures/{name}` with
//! the step parameters as the JSON body.
//!
//! # Example
//!
//! ```ignore
//! use onboarding_orchestrator::collaborators::{ProcedureClient, Profiler};
//!
//! let client = ProcedureClient::new("http://localhost:8080").with_timeout(300);
//! let profile = client.profile("@RAW_DATA_STAGE/customers.csv", 10000, "CSV_FORMAT")?;
//! ```

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{CollaboratorError, CollaboratorResult};
use super::types::{
    DictionaryResult, MappingResult, MappingTarget, ProfileResult, StepParameters,
    TargetLocation, dictionary_parameters, mapping_parameters, profiling_parameters,
};
use super::{DictionaryGenerator, Mapper, Profiler, normalize_payload};
use crate::workflow::StepName;

/// Client for the stage procedures behind each workflow step
#[derive(Debug, Clone)]
pub struct ProcedureClient {
    /// Base URL of the procedure service
    base_url: String,
    /// Per-request timeout in seconds
    timeout_seconds: u64,
    client: reqwest::blocking::Client,
}

impl ProcedureClient {
    /// Create a new client with a 300 second per-step timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_seconds: 300,
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Set the per-step timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the procedure endpoint for a step
    pub fn endpoint(&self, step: StepName) -> String {
        format!("{}/procedures/{}", self.base_url, step.procedure())
    }

    /// Invoke the procedure for a step and decode its result
    fn call<T: DeserializeOwned>(&self, step: StepName, params: &StepParameters) -> CollaboratorResult<T> {
        let procedure = step.procedure();
        let url = self.endpoint(step);

        tracing::debug!(procedure, %url, "Calling stage procedure");

        let response = self
            .client
            .post(&url)
            .json(params)
            .timeout(Duration::from_secs(self.timeout_seconds))
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    CollaboratorError::Timeout {
                        procedure: procedure.to_string(),
                        seconds: self.timeout_seconds,
                    }
                } else {
                    CollaboratorError::Connection {
                        procedure: procedure.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(CollaboratorError::procedure(
                procedure,
                format!("HTTP {status}: {error_text}"),
            ));
        }

        let body: Value = response
            .json()
            .map_err(|e| CollaboratorError::invalid_response(procedure, e.to_string()))?;

        decode_result(procedure, body)
    }
}

/// Decode a procedure result, honouring in-band failure reports
fn decode_result<T: DeserializeOwned>(procedure: &str, body: Value) -> CollaboratorResult<T> {
    let payload = normalize_payload(body);

    if payload.get("status").and_then(Value::as_str) == Some("FAILED") {
        let message = payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("procedure reported FAILED without an error message");
        return Err(CollaboratorError::procedure(procedure, message));
    }
    if !payload.is_object() {
        return Err(CollaboratorError::invalid_response(
            procedure,
            format!("expected a JSON object, got {payload}"),
        ));
    }

    serde_json::from_value(payload)
        .map_err(|e| CollaboratorError::invalid_response(procedure, e.to_string()))
}

impl Profiler for ProcedureClient {
    fn profile(
        &self,
        source_reference: &str,
        sample_size: u64,
        file_format: &str,
    ) -> CollaboratorResult<ProfileResult> {
        let params = profiling_parameters(source_reference, sample_size, file_format);
        self.call(StepName::Profiling, &params)
    }
}

impl DictionaryGenerator for ProcedureClient {
    fn generate_ddl(
        &self,
        profile: &ProfileResult,
        target: &TargetLocation,
    ) -> CollaboratorResult<DictionaryResult> {
        let params = dictionary_parameters(profile, target)?;
        self.call(StepName::Dictionary, &params)
    }
}

impl Mapper for ProcedureClient {
    fn generate_mappings(
        &self,
        dictionary: &DictionaryResult,
        target: &MappingTarget,
    ) -> CollaboratorResult<MappingResult> {
        let params = mapping_parameters(dictionary, target)?;
        self.call(StepName::Mapping, &params)
    }
}
