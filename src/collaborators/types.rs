//! Stage result types and step parameter bundles

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::CollaboratorResult;

/// Named parameters a step was invoked with
pub type StepParameters = serde_json::Map<String, Value>;

/// Mapping target table used when none is given
pub const AUTO_TABLE: &str = "AUTO";

/// Output of the profiling stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileResult {
    pub profile_id: Option<String>,
    /// Inferred column schema
    #[serde(alias = "inferred_schema")]
    pub schema: Value,
    /// Per-column statistics
    pub statistics: Value,
    #[serde(alias = "pii_detected")]
    pub pii_findings: Vec<Value>,
    #[serde(alias = "data_quality_issues")]
    pub quality_issues: Vec<Value>,
    #[serde(alias = "profiling_summary")]
    pub summary: Option<String>,
}

/// Output of the dictionary stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryResult {
    pub dictionary_id: Option<String>,
    /// Production DDL statement
    #[serde(alias = "production_ddl")]
    pub ddl_text: String,
    pub table_name: Option<String>,
    /// Whether data dictionary entries were written
    #[serde(alias = "dictionary_enriched")]
    pub enrichment_status: bool,
    #[serde(alias = "proposal_summary")]
    pub summary: Option<String>,
}

/// Output of the mapping stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingResult {
    pub mapping_id: Option<String>,
    pub field_mappings: Vec<Value>,
    /// Generated transformation models
    #[serde(alias = "dbt_models")]
    pub generated_artifacts: Vec<Value>,
    #[serde(alias = "mapping_confidence_score")]
    pub confidence_score: Option<f64>,
    #[serde(alias = "mapping_summary")]
    pub summary: Option<String>,
}

/// Where the dictionary stage writes DDL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLocation {
    pub database: String,
    pub schema: String,
}

/// Where the mapping stage maps to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingTarget {
    pub schema: String,
    /// Target table, or [`AUTO_TABLE`] to let the mapper choose
    pub table: String,
}

impl MappingTarget {
    pub fn new(schema: impl Into<String>, table: Option<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.unwrap_or_else(|| AUTO_TABLE.to_string()),
        }
    }
}

/// Parameters for the profiling step
pub fn profiling_parameters(stage_path: &str, sample_size: u64, file_format: &str) -> StepParameters {
    let mut params = StepParameters::new();
    params.insert("stage_path".into(), Value::from(stage_path));
    params.insert("sample_size".into(), Value::from(sample_size));
    params.insert("file_format".into(), Value::from(file_format));
    params
}

/// Parameters for the dictionary step; the profile travels as a JSON string
pub fn dictionary_parameters(
    profile: &ProfileResult,
    target: &TargetLocation,
) -> CollaboratorResult<StepParameters> {
    let mut params = StepParameters::new();
    params.insert(
        "profiling_results_json".into(),
        Value::String(serde_json::to_string(profile)?),
    );
    params.insert("target_database".into(), Value::from(target.database.as_str()));
    params.insert("target_schema".into(), Value::from(target.schema.as_str()));
    Ok(params)
}

/// Parameters for the mapping step; the dictionary travels as a JSON string
pub fn mapping_parameters(
    dictionary: &DictionaryResult,
    target: &MappingTarget,
) -> CollaboratorResult<StepParameters> {
    let mut params = StepParameters::new();
    params.insert(
        "dictionary_results_json".into(),
        Value::String(serde_json::to_string(dictionary)?),
    );
    params.insert("target_schema_name".into(), Value::from(target.schema.as_str()));
    params.insert("target_table_name".into(), Value::from(target.table.as_str()));
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_profile_accepts_stage_field_names() {
        let profile: ProfileResult = serde_json::from_value(json!({
            "profile_id": "p-1",
            "inferred_schema": {"columns": [{"column_name": "EMAIL"}]},
            "pii_detected": [{"column_name": "EMAIL", "pii_type": "EMAIL"}],
            "data_quality_issues": [],
            "profiling_summary": "1 column, 1 PII finding",
            "execution_time_seconds": 1.2
        }))
        .unwrap();
        assert_eq!(profile.profile_id.as_deref(), Some("p-1"));
        assert_eq!(profile.pii_findings.len(), 1);
        assert_eq!(profile.summary.as_deref(), Some("1 column, 1 PII finding"));
    }

    #[test]
    fn test_mapping_target_defaults_to_auto() {
        let target = MappingTarget::new("CURATED", None);
        assert_eq!(target.table, AUTO_TABLE);
        let params = mapping_parameters(&DictionaryResult::default(), &target).unwrap();
        assert_eq!(params["target_table_name"], "AUTO");
        assert_eq!(params["target_schema_name"], "CURATED");
        assert!(params["dictionary_results_json"].is_string());
    }

    #[test]
    fn test_profiling_parameters() {
        let params = profiling_parameters("@RAW/customers.csv", 10000, "CSV_FORMAT");
        assert_eq!(params["stage_path"], "@RAW/customers.csv");
        assert_eq!(params["sample_size"], 10000);
        assert_eq!(params["file_format"], "CSV_FORMAT");
    }

    #[test]
    fn test_dictionary_parameters_embed_profile() {
        let profile = ProfileResult {
            summary: Some("ok".to_string()),
            ..Default::default()
        };
        let target = TargetLocation {
            database: "ANALYTICS".to_string(),
            schema: "STAGING".to_string(),
        };
        let params = dictionary_parameters(&profile, &target).unwrap();
        let embedded: ProfileResult =
            serde_json::from_str(params["profiling_results_json"].as_str().unwrap()).unwrap();
        assert_eq!(embedded, profile);
        assert_eq!(params["target_schema"], "STAGING");
    }
}
