use std::path::PathBuf;

use crate::normalize::NormalizeError;

/// Errors raised while loading a config file or building the registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config file {0} is empty")]
    Empty(PathBuf),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The YAML parsed but does not have the shape of a config document.
    #[error("invalid YAML config: {0}")]
    YamlShape(#[source] serde_json::Error),

    #[error("cannot normalize YAML config: {0}")]
    Normalize(#[from] NormalizeError),

    /// Two process types share a name.
    #[error("process type '{0}' is declared more than once")]
    DuplicateProcessType(String),

    /// Two statuses of one process type share a name.
    #[error("status '{status}' is declared more than once in process type '{process_type}'")]
    DuplicateStatus {
        process_type: String,
        status: String,
    },

    /// A `next` entry names a status the process type does not declare.
    #[error("status '{status}' of process type '{process_type}' lists undeclared next status '{next}'")]
    UndeclaredNextStatus {
        process_type: String,
        status: String,
        next: String,
    },
}
