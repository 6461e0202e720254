//! Orchestrator configuration types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{OrchestratorResult, WorkflowError};

/// Main orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Workflow database path
    pub database: PathBuf,
    /// Rows sampled by the profiling step
    pub sample_size: u64,
    /// File format name passed to the profiling step
    pub file_format: String,
    /// Database the dictionary step writes DDL into
    pub target_database: String,
    /// Schema the dictionary step writes DDL into
    pub staging_schema: String,
    /// Mapping target schema when a run names none
    pub default_target_schema: String,
    /// Operator identity stored on workflow records
    pub initiated_by: Option<String>,
    /// Remote stage procedures
    pub procedures: ProcedureSettings,
    /// Completion backend for summaries
    pub llm: LlmSettings,
    /// Age after which non-terminal workflows count as orphaned
    pub orphan_timeout_minutes: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("workflows.duckdb"),
            sample_size: 10_000,
            file_format: "CSV_FORMAT".to_string(),
            target_database: "ANALYTICS".to_string(),
            staging_schema: "STAGING".to_string(),
            default_target_schema: "CURATED".to_string(),
            initiated_by: None,
            procedures: ProcedureSettings::default(),
            llm: LlmSettings::default(),
            orphan_timeout_minutes: 60,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new orchestrator config
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration file (TOML)
    pub fn load(path: impl AsRef<Path>) -> OrchestratorResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            WorkflowError::ConfigError(format!("Cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml(&text)
    }

    /// Parse a TOML configuration
    pub fn from_toml(text: &str) -> OrchestratorResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| WorkflowError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> OrchestratorResult<String> {
        toml::to_string_pretty(self).map_err(|e| WorkflowError::ConfigError(e.to_string()))
    }

    /// Set the database path
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = path.into();
        self
    }

    /// Set the profiling sample size
    pub fn with_sample_size(mut self, sample_size: u64) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Set the profiling file format
    pub fn with_file_format(mut self, format: impl Into<String>) -> Self {
        self.file_format = format.into();
        self
    }

    /// Set the dictionary target database
    pub fn with_target_database(mut self, database: impl Into<String>) -> Self {
        self.target_database = database.into();
        self
    }

    /// Set the operator identity
    pub fn with_initiated_by(mut self, user: impl Into<String>) -> Self {
        self.initiated_by = Some(user.into());
        self
    }

    /// Set the procedure settings
    pub fn with_procedures(mut self, procedures: ProcedureSettings) -> Self {
        self.procedures = procedures;
        self
    }

    /// Set LLM configuration
    pub fn with_llm(mut self, llm: LlmSettings) -> Self {
        self.llm = llm;
        self
    }

    /// Operator identity, falling back to `$USER`
    pub fn effective_initiated_by(&self) -> Option<String> {
        self.initiated_by
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|user| !user.is_empty())
    }

    /// Validate the configuration
    pub fn validate(&self) -> OrchestratorResult<()> {
        if self.sample_size == 0 {
            return Err(WorkflowError::ConfigError(
                "sample_size must be greater than zero".to_string(),
            ));
        }
        for (name, value) in [
            ("file_format", &self.file_format),
            ("target_database", &self.target_database),
            ("staging_schema", &self.staging_schema),
            ("default_target_schema", &self.default_target_schema),
        ] {
            if value.trim().is_empty() {
                return Err(WorkflowError::ConfigError(format!("{name} must not be empty")));
            }
        }
        if self.procedures.timeout_seconds == 0 {
            return Err(WorkflowError::ConfigError(
                "procedures.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Connection settings for the stage procedure service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcedureSettings {
    /// Base URL of the procedure service
    pub base_url: String,
    /// Per-step timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ProcedureSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_seconds: 300,
        }
    }
}

/// LLM configuration for summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// LLM mode (none, online)
    pub mode: String,
    /// Ollama URL for online mode
    pub url: String,
    /// Model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            mode: "none".to_string(),
            url: "http://localhost:11434".to_string(),
            model: "llama3.2".to_string(),
            temperature: 0.3,
            timeout_seconds: 120,
        }
    }
}

impl LlmSettings {
    /// Check if LLM is enabled
    pub fn is_enabled(&self) -> bool {
        self.mode != "none"
    }

    /// Create online LLM config
    pub fn online(model: impl Into<String>) -> Self {
        Self {
            mode: "online".to_string(),
            model: model.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.sample_size, 10_000);
        assert_eq!(config.file_format, "CSV_FORMAT");
        assert_eq!(config.staging_schema, "STAGING");
        assert_eq!(config.orphan_timeout_minutes, 60);
        assert!(!config.llm.is_enabled());
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = OrchestratorConfig::from_toml(
            r#"
            target_database = "RAW_DB"

            [llm]
            mode = "online"
            model = "mistral"
            "#,
        )
        .unwrap();
        assert_eq!(config.target_database, "RAW_DB");
        assert_eq!(config.sample_size, 10_000);
        assert!(config.llm.is_enabled());
        assert_eq!(config.llm.url, "http://localhost:11434");
        assert_eq!(config.procedures.timeout_seconds, 300);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = OrchestratorConfig::from_toml("sample_size = 0").unwrap_err();
        assert!(matches!(err, WorkflowError::ConfigError(_)));
        assert!(OrchestratorConfig::from_toml("sample_size = \"many\"").is_err());
    }

    #[test]
    fn test_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("orchestrator.toml");
        let config = OrchestratorConfig::new()
            .with_sample_size(500)
            .with_initiated_by("ops")
            .with_llm(LlmSettings::online("llama3.2"));
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();

        let loaded = OrchestratorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.effective_initiated_by().as_deref(), Some("ops"));
    }
}
