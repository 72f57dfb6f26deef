//! Engine settings
//!
//! Loaded from a YAML file; `DUCKBRIDGE_*` environment variables override
//! file values.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::options::{EngineExtension, EngineSecret};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Memory limit applied per connection, in megabytes.
    #[serde(default)]
    pub memory_limit_mb: Option<u64>,

    /// Worker threads per connection.
    #[serde(default)]
    pub threads: Option<u64>,

    #[serde(default)]
    pub extensions: Vec<EngineExtension>,

    #[serde(default)]
    pub secrets: Vec<EngineSecret>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self { memory_limit_mb: None, threads: None, extensions: Vec::new(), secrets: Vec::new() }
    }
}

impl EngineSettings {
    /// Load settings from a YAML file with environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let contents = std::fs::read_to_string(path)?;
        let mut settings: EngineSettings = serde_yaml::from_str(&contents)?;

        if let Ok(limit) = std::env::var("DUCKBRIDGE_MEMORY_LIMIT_MB") {
            if let Ok(parsed) = limit.parse() {
                settings.memory_limit_mb = Some(parsed);
            }
        }
        if let Ok(threads) = std::env::var("DUCKBRIDGE_THREADS") {
            if let Ok(parsed) = threads.parse() {
                settings.threads = Some(parsed);
            }
        }

        Ok(settings)
    }
}
