//! Gate configuration loaded from YAML.
//!
//! Command-line flags override file values; file values override defaults.
//! Files are checked against schema/gate-config.schema.json before they are
//! deserialized, so unknown keys and wrong types are reported by path.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "deploygate.yaml";

/// Default number of entries listed per failure list in summaries.
pub const DEFAULT_MAX_LISTED_FAILURES: usize = 50;

const CONFIG_SCHEMA: &str = include_str!("../../../schema/gate-config.schema.json");

/// Errors that can occur when loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to interpret config: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    SchemaViolation(Vec<String>),

    #[error("Config schema is unusable: {0}")]
    SchemaUnavailable(String),
}

/// Every schema violation in `value`, as `/instance/path: message`.
fn schema_violations(value: &serde_json::Value) -> Result<Vec<String>, ConfigError> {
    let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA)
        .map_err(|e| ConfigError::SchemaUnavailable(e.to_string()))?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| ConfigError::SchemaUnavailable(e.to_string()))?;

    Ok(validator
        .iter_errors(value)
        .map(|e| {
            let path = e.instance_path.to_string();
            let path = if path.is_empty() { "(root)" } else { path.as_str() };
            format!("{path}: {e}")
        })
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// Serialized verdict
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub max_listed_failures: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            max_listed_failures: DEFAULT_MAX_LISTED_FAILURES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Strip colour codes and warnings around the JSON document
    pub strip_noise: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory receiving per-run report, summary and verdict files
    pub dir: Option<PathBuf>,
}

/// Gate configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub output: OutputConfig,
    pub input: InputConfig,
    pub archive: ArchiveConfig,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub format: Option<OutputFormat>,
    pub max_listed_failures: Option<usize>,
    pub strip_noise: bool,
    pub archive_dir: Option<PathBuf>,
}

impl GateConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: serde_json::Value = serde_yaml::from_str(yaml)?;
        if value.is_null() {
            return Ok(Self::default());
        }

        let violations = schema_violations(&value)?;
        if !violations.is_empty() {
            return Err(ConfigError::SchemaViolation(violations));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Parse configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load the explicit file, else `deploygate.yaml` in `dir` if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_yaml_file(path);
        }

        let implicit = dir.join(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            tracing::debug!(path = %implicit.display(), "loading implicit config");
            return Self::from_yaml_file(implicit);
        }

        Ok(Self::default())
    }

    /// Apply command-line overrides.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(format) = overrides.format {
            self.output.format = format;
        }
        if let Some(max) = overrides.max_listed_failures {
            self.output.max_listed_failures = max;
        }
        if overrides.strip_noise {
            self.input.strip_noise = true;
        }
        if overrides.archive_dir.is_some() {
            self.archive.dir = overrides.archive_dir;
        }
        self
    }
}
