//! Transition validation.
//!
//! [`ConfigValidator`] gates a candidate status against the configured
//! status graph, then validates the candidate payload against the target
//! status's JSON Schema when one is configured. All schemas are compiled
//! once, up front; validation itself is pure and never touches storage.

use std::collections::HashMap;
use std::sync::Arc;

use procflow_config::{yaml_to_json, ProcessRegistry};
use serde_json::Value;

use crate::error::{SchemaError, ValidationError};
use crate::payload::Payload;
use crate::process::Process;

/// Decides whether a process may move to a candidate status.
pub trait StatusValidator: Send + Sync {
    fn validate(
        &self,
        process: &Process,
        status: &str,
        payload: &Payload,
    ) -> Result<(), ValidationError>;
}

/// Validator driven by a [`ProcessRegistry`].
pub struct ConfigValidator {
    registry: Arc<ProcessRegistry>,
    /// Compiled payload schemas keyed by `(process type, status)`.
    schemas: HashMap<(String, String), jsonschema::Validator>,
}

impl std::fmt::Debug for ConfigValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigValidator")
            .field("process_types", &self.registry.len())
            .field("schemas", &self.schemas.len())
            .finish()
    }
}

impl ConfigValidator {
    /// Compile every configured schema. Fails on the first schema that is
    /// unreadable or not a valid JSON Schema.
    pub fn new(registry: Arc<ProcessRegistry>) -> Result<Self, SchemaError> {
        let mut schemas = HashMap::new();
        for process in registry.iter() {
            for status in &process.statuses {
                let Some(text) = status.schema.as_deref() else {
                    continue;
                };
                let schema = parse_schema(text).map_err(|message| SchemaError::Parse {
                    process_type: process.name.clone(),
                    status: status.name.clone(),
                    message,
                })?;
                let validator =
                    jsonschema::validator_for(&schema).map_err(|e| SchemaError::Invalid {
                        process_type: process.name.clone(),
                        status: status.name.clone(),
                        message: e.to_string(),
                    })?;
                schemas.insert((process.name.clone(), status.name.clone()), validator);
            }
        }
        Ok(ConfigValidator { registry, schemas })
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Number of compiled payload schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    fn check_payload(
        &self,
        process_type: &str,
        status: &str,
        payload: &Payload,
    ) -> Result<(), ValidationError> {
        let Some(validator) = self
            .schemas
            .get(&(process_type.to_string(), status.to_string()))
        else {
            return Ok(());
        };
        let errors: Vec<String> = validator
            .iter_errors(payload.as_value())
            .map(|e| e.to_string())
            .collect();
        if errors.is_empty() {
            return Ok(());
        }
        Err(ValidationError::PayloadValidation {
            status: status.to_string(),
            message: errors.join("; ").replace('\n', ""),
        })
    }
}

impl StatusValidator for ConfigValidator {
    fn validate(
        &self,
        process: &Process,
        status: &str,
        payload: &Payload,
    ) -> Result<(), ValidationError> {
        let process_type = process.process_type.as_str();
        let unknown = |status: &str| ValidationError::UnknownStatus {
            process_type: process_type.to_string(),
            status: status.to_string(),
        };

        self.registry
            .status(process_type, status)
            .ok_or_else(|| unknown(status))?;

        match process.current_status_name() {
            Some(current) => {
                let from = self
                    .registry
                    .status(process_type, current)
                    .ok_or_else(|| unknown(current))?;
                if !from.allows(status) {
                    return Err(ValidationError::NotAllowedStatus {
                        process_type: process_type.to_string(),
                        from: Some(current.to_string()),
                        to: status.to_string(),
                    });
                }
            }
            None => {
                if !self.registry.is_initial(process_type, status) {
                    return Err(ValidationError::NotAllowedStatus {
                        process_type: process_type.to_string(),
                        from: None,
                        to: status.to_string(),
                    });
                }
            }
        }

        self.check_payload(process_type, status, payload)
    }
}

/// Read schema text as JSON, falling back to YAML.
fn parse_schema(text: &str) -> Result<Value, String> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
    yaml_to_json(yaml).map_err(|e| e.to_string())
}
