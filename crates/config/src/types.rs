//! Typed structs for process type definitions.
//!
//! `Config` mirrors the on-disk document. `ProcessRegistry` is the frozen,
//! checked form handed to the workflow engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// Top-level config document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub processes: Vec<ProcessTypeConfig>,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Check the process definitions and freeze them into a registry.
    pub fn into_registry(self) -> Result<ProcessRegistry, ConfigError> {
        ProcessRegistry::new(self.processes)
    }
}

/// Settings for the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

/// One process type and its status graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessTypeConfig {
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<StatusConfig>,
}

impl ProcessTypeConfig {
    pub fn status(&self, name: &str) -> Option<&StatusConfig> {
        self.statuses.iter().find(|s| s.name == name)
    }

    /// Statuses a process without history may enter.
    ///
    /// These are the statuses flagged `initial`. When none is flagged, the
    /// first declared status is the only start status.
    pub fn initial_statuses(&self) -> Vec<&StatusConfig> {
        let flagged: Vec<&StatusConfig> = self.statuses.iter().filter(|s| s.initial).collect();
        if flagged.is_empty() {
            self.statuses.first().into_iter().collect()
        } else {
            flagged
        }
    }

    pub fn is_initial(&self, status: &str) -> bool {
        self.initial_statuses().iter().any(|s| s.name == status)
    }
}

/// One status of a process type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusConfig {
    pub name: String,
    /// Statuses directly reachable from this one. `null` reads as none.
    #[serde(
        default,
        skip_serializing_if = "BTreeSet::is_empty",
        deserialize_with = "deserialize_next"
    )]
    pub next: BTreeSet<String>,
    /// JSON Schema text for the payload of a transition into this status.
    ///
    /// Accepted on disk either as a string holding the schema or as an
    /// inline object, which is kept in its serialized form.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_schema_text"
    )]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub initial: bool,
}

impl StatusConfig {
    pub fn allows(&self, next: &str) -> bool {
        self.next.contains(next)
    }

    pub fn is_terminal(&self) -> bool {
        self.next.is_empty()
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

fn deserialize_next<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

fn deserialize_schema_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(text)) if text.trim().is_empty() => Ok(None),
        Some(serde_json::Value::String(text)) => Ok(Some(text)),
        Some(inline) => serde_json::to_string(&inline)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Immutable lookup table `process type -> definition`.
#[derive(Debug, Clone, Default)]
pub struct ProcessRegistry {
    types: BTreeMap<String, ProcessTypeConfig>,
}

impl ProcessRegistry {
    /// Build the registry, rejecting duplicate names and dangling `next` edges.
    pub fn new(processes: Vec<ProcessTypeConfig>) -> Result<Self, ConfigError> {
        let mut types = BTreeMap::new();
        for process in processes {
            check_process_type(&process)?;
            if types.contains_key(&process.name) {
                return Err(ConfigError::DuplicateProcessType(process.name));
            }
            types.insert(process.name.clone(), process);
        }
        Ok(Self { types })
    }

    pub fn process(&self, process_type: &str) -> Option<&ProcessTypeConfig> {
        self.types.get(process_type)
    }

    pub fn status(&self, process_type: &str, status: &str) -> Option<&StatusConfig> {
        self.process(process_type)?.status(status)
    }

    /// Whether `status` is a start status of `process_type`.
    pub fn is_initial(&self, process_type: &str, status: &str) -> bool {
        self.process(process_type)
            .map(|p| p.is_initial(status))
            .unwrap_or(false)
    }

    /// Process type names in sorted order.
    pub fn process_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessTypeConfig> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn check_process_type(process: &ProcessTypeConfig) -> Result<(), ConfigError> {
    let mut declared = BTreeSet::new();
    for status in &process.statuses {
        if !declared.insert(status.name.as_str()) {
            return Err(ConfigError::DuplicateStatus {
                process_type: process.name.clone(),
                status: status.name.clone(),
            });
        }
    }
    for status in &process.statuses {
        if let Some(next) = status.next.iter().find(|n| !declared.contains(n.as_str())) {
            return Err(ConfigError::UndeclaredNextStatus {
                process_type: process.name.clone(),
                status: status.name.clone(),
                next: next.clone(),
            });
        }
    }
    Ok(())
}
