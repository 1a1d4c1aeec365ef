//! Loading a [`Config`] from disk.
//!
//! The loader reads through a [`FileReader`] so tests can hand it bytes
//! without touching the filesystem. JSON and YAML are supported; the format
//! is picked from the file extension.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::normalize::yaml_to_json;
use crate::types::Config;
use crate::{CONFIG_PATH_ENV, DEFAULT_CONFIG_PATH};

/// Source of raw config bytes.
pub trait FileReader {
    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileReader;

impl FileReader for OsFileReader {
    fn read_file(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// On-disk encoding of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.yaml` and `.yml` are YAML, everything else is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            _ => ConfigFormat::Json,
        }
    }

    /// Decode a config document in this format.
    pub fn parse(self, content: &[u8]) -> Result<Config, ConfigError> {
        match self {
            ConfigFormat::Json => Ok(serde_json::from_slice(content)?),
            ConfigFormat::Yaml => {
                let raw: serde_yaml::Value = serde_yaml::from_slice(content)?;
                let json = yaml_to_json(raw)?;
                serde_json::from_value(json).map_err(ConfigError::YamlShape)
            }
        }
    }
}

/// Builder locating and decoding the config file.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    path: PathBuf,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Start from `PROCFLOW_CONFIG` when it is set and non-empty.
    pub fn from_env() -> Self {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::new().with_path(path),
            _ => Self::new(),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        self.load_with(&OsFileReader)
    }

    pub fn load_with(&self, reader: &dyn FileReader) -> Result<Config, ConfigError> {
        let content = reader
            .read_file(&self.path)
            .map_err(|source| ConfigError::Io {
                path: self.path.clone(),
                source,
            })?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Err(ConfigError::Empty(self.path.clone()));
        }
        ConfigFormat::from_path(&self.path).parse(&content)
    }
}
