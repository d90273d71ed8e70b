//! Configuration for TypeState.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration shared by the CLI and the analysis server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Classifier artifact (JSON linear window model)
    pub model_path: PathBuf,

    /// Scaler artifact (JSON feature names, means, scales)
    pub scaler_path: PathBuf,

    /// Where `build` writes the training table
    pub training_output: PathBuf,

    /// Port for the analysis server
    pub port: u16,

    /// Upper bound on inferences running at once
    pub max_concurrent_inferences: usize,

    /// `tracing` filter directive (e.g. `info`, `typestate=debug`)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typestate");

        Self {
            model_path: data_dir.join("typestate_model.json"),
            scaler_path: data_dir.join("typestate_scaler.json"),
            training_output: PathBuf::from("typestate_training_data.csv"),
            port: 8000,
            max_concurrent_inferences: 4,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("typestate")
            .join("config.json")
    }

    pub fn resolved_model_path(&self) -> PathBuf {
        resolve_artifact_path(&self.model_path)
    }

    pub fn resolved_scaler_path(&self) -> PathBuf {
        resolve_artifact_path(&self.scaler_path)
    }
}

/// Find an artifact: the configured path, else its file name in the working
/// directory, else in the parent directory. Falls back to the configured
/// path so the load error names it.
pub fn resolve_artifact_path(configured: &Path) -> PathBuf {
    if configured.exists() {
        return configured.to_path_buf();
    }

    if let Some(name) = configured.file_name() {
        for dir in [Path::new("."), Path::new("..")] {
            let candidate = dir.join(name);
            if candidate.exists() {
                tracing::debug!(
                    configured = %configured.display(),
                    found = %candidate.display(),
                    "Using fallback artifact location"
                );
                return candidate;
            }
        }
    }

    configured.to_path_buf()
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}
