//! Configuration types for gres

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{GresError, GresResult};

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GresConfig {
    /// Device entries, one per `[[gres]]` table
    #[serde(default)]
    pub gres: Vec<GresConfEntry>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GresConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> GresResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GresError::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> GresResult<Self> {
        toml::from_str(content)
            .map_err(|e| GresError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// A single generic resource entry as handed over by the config loader.
///
/// `file` and `identifier` are optional; an entry missing either is not an
/// OpenCL device record and is ignored when building the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GresConfEntry {
    /// Resource name, e.g. "opencl" or "gpu"
    pub name: String,
    /// Device file path
    #[serde(default)]
    pub file: Option<String>,
    /// Device identifier expression, e.g. "GPU-x:0-3"
    #[serde(default)]
    pub identifier: Option<String>,
}

impl GresConfEntry {
    /// Create a fully specified entry
    pub fn new(name: &str, file: &str, identifier: &str) -> Self {
        Self {
            name: name.to_string(),
            file: Some(file.to_string()),
            identifier: Some(identifier.to_string()),
        }
    }

    /// Whether an explicit device file was configured
    pub fn has_file(&self) -> bool {
        self.file.as_deref().is_some_and(|f| !f.is_empty())
    }

    /// Whether an explicit identifier was configured
    pub fn has_identifier(&self) -> bool {
        self.identifier.is_some()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}
