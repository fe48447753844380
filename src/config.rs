//! Service configuration loaded from `symptomcheck.toml`.
//!
//! Every key is optional. Missing files fall back to defaults so a fresh
//! checkout serves straight from the training output directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app_dirs::{self, AppDirError};
use crate::artifact::{ArtifactPaths, DISEASES_FILE_NAME, MODEL_FILE_NAME, SYMPTOMS_FILE_NAME};

pub const CONFIG_FILE_NAME: &str = "symptomcheck.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Unable to resolve config directory: {0}")]
    AppDir(#[from] AppDirError),
    #[error("Invalid age range {min}..={max}")]
    InvalidAgeRange { min: f32, max: f32 },
}

/// Accepted request ages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgePolicy {
    pub min: f32,
    pub max: f32,
}

impl Default for AgePolicy {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 120.0,
        }
    }
}

impl AgePolicy {
    /// Accept finite ages within `min..=max`; no clamping.
    pub fn accepts(&self, age: f32) -> bool {
        age.is_finite() && age >= self.min && age <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Socket address the HTTP listener binds.
    pub bind_addr: String,
    /// Directory holding the training output.
    pub artifact_dir: PathBuf,
    pub model_file: String,
    pub symptoms_file: String,
    pub diseases_file: String,
    /// Advice table; a missing file falls back to the built-in default advice.
    pub advice_file: PathBuf,
    /// Static client files served under `/`; skipped when the directory is absent.
    pub static_dir: Option<PathBuf>,
    pub age: AgePolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            artifact_dir: PathBuf::from("."),
            model_file: MODEL_FILE_NAME.to_string(),
            symptoms_file: SYMPTOMS_FILE_NAME.to_string(),
            diseases_file: DISEASES_FILE_NAME.to_string(),
            advice_file: PathBuf::from("static/advice.json"),
            static_dir: Some(PathBuf::from("static")),
            age: AgePolicy::default(),
        }
    }
}

impl ServiceConfig {
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.artifact_dir.join(&self.model_file),
            symptoms: self.artifact_dir.join(&self.symptoms_file),
            diseases: self.artifact_dir.join(&self.diseases_file),
        }
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let AgePolicy { min, max } = self.age;
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(ConfigError::InvalidAgeRange { min, max });
        }
        Ok(self)
    }
}

/// Path of the config file inside the app directory.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dirs::app_root_dir()?.join(CONFIG_FILE_NAME))
}

/// Load an explicit config file; it must exist.
pub fn load_from(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ServiceConfig = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })?;
    config.validated()
}

/// Load the app-directory config, returning defaults if it is missing.
pub fn load_or_default() -> Result<ServiceConfig, ConfigError> {
    let path = default_config_path()?;
    if !path.exists() {
        tracing::info!("No config at {}; using defaults", path.display());
        return Ok(ServiceConfig::default());
    }
    load_from(&path)
}
