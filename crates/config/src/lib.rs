//! procflow-config: process type definitions and their loader.
//!
//! A process type names a finite set of statuses and, for each status, the
//! statuses directly reachable from it plus an optional JSON Schema for the
//! payload of a transition into it. Definitions are loaded once at startup
//! ([`ConfigLoader`]) and frozen into a [`ProcessRegistry`] that the workflow
//! engine consults by `(process type, status)`.

pub mod error;
pub mod load;
pub mod normalize;
pub mod types;

pub use error::ConfigError;
pub use load::{ConfigFormat, ConfigLoader, FileReader, OsFileReader};
pub use normalize::{yaml_to_json, NormalizeError};
pub use types::*;

/// Page used when a listing request asks for page zero or less.
pub const DEFAULT_PAGE: i64 = 1;

/// Page size used when a listing request asks for zero or less.
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Config file read when neither `--config` nor `PROCFLOW_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Environment variable overriding the config file path.
pub const CONFIG_PATH_ENV: &str = "PROCFLOW_CONFIG";
