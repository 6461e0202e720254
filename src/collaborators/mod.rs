//! Stage collaborators: profiling, dictionary and mapping
//!
//! The controller only depends on the three traits below. Each collaborator
//! owns its own fallbacks and reports either a typed result or a
//! [`CollaboratorError`]; the controller never inspects anything else.
//!
//! With the `api-backend` feature, [`ProcedureClient`] implements all three
//! by calling remote stage procedures over HTTP.

mod error;
#[cfg(feature = "api-backend")]
mod procedure;
mod types;

pub use error::{CollaboratorError, CollaboratorResult};
#[cfg(feature = "api-backend")]
pub use procedure::ProcedureClient;
pub use types::{
    AUTO_TABLE, DictionaryResult, MappingResult, MappingTarget, ProfileResult, StepParameters,
    TargetLocation, dictionary_parameters, mapping_parameters, profiling_parameters,
};

use serde_json::Value;

/// Profiles source data
pub trait Profiler: Send + Sync {
    fn profile(
        &self,
        source_reference: &str,
        sample_size: u64,
        file_format: &str,
    ) -> CollaboratorResult<ProfileResult>;
}

/// Generates DDL and data dictionary entries from a profile
pub trait DictionaryGenerator: Send + Sync {
    fn generate_ddl(
        &self,
        profile: &ProfileResult,
        target: &TargetLocation,
    ) -> CollaboratorResult<DictionaryResult>;
}

/// Generates field mappings from a data dictionary
pub trait Mapper: Send + Sync {
    fn generate_mappings(
        &self,
        dictionary: &DictionaryResult,
        target: &MappingTarget,
    ) -> CollaboratorResult<MappingResult>;
}

/// Replace a string holding a serialized JSON object or array with the
/// parsed value. Anything else is returned unchanged.
pub fn normalize_payload(value: Value) -> Value {
    if let Value::String(text) = &value {
        let trimmed = text.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                return parsed;
            }
        }
    }
    value
}
