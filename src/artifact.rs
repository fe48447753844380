//! Persisted training output: the model artifact and the two lookup lists.
//!
//! Everything is JSON so the files can be inspected by hand. The artifact is
//! validated on load; a service must never start with a model whose column
//! layout disagrees with its classifier.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::{FeatureSchema, SchemaError};
use crate::ml::forest::{ForestError, RandomForestModel};
use crate::ml::label_encoder::LabelEncoder;

/// Current on-disk format of [`ModelArtifact`].
pub const ARTIFACT_FORMAT_VERSION: i64 = 1;
pub const MODEL_FILE_NAME: &str = "model.json";
pub const SYMPTOMS_FILE_NAME: &str = "symptoms_list.json";
pub const DISEASES_FILE_NAME: &str = "diseases_list.json";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid JSON in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unsupported artifact format_version {found} (expected {})", ARTIFACT_FORMAT_VERSION)]
    UnsupportedVersion { found: i64 },
    #[error("Classifier is invalid: {0}")]
    Classifier(#[from] ForestError),
    #[error("Disease encoder is invalid: {0}")]
    Encoder(String),
    #[error("Feature schema is invalid: {0}")]
    Schema(#[from] SchemaError),
    #[error("{0}")]
    Mismatch(String),
}

/// Everything the predictor needs from training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: i64,
    pub classifier: RandomForestModel,
    pub disease_encoder: LabelEncoder,
    /// Column order the classifier was trained on.
    pub feature_columns: Vec<String>,
    /// Subset of `feature_columns` that are symptom indicators.
    pub symptom_columns: Vec<String>,
}

impl ModelArtifact {
    /// Check that classifier, encoder and column lists agree.
    pub fn validate(&self) -> Result<(), ArtifactError> {
        let found = self.format_version;
        if found != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion { found });
        }
        self.classifier.validate()?;
        self.disease_encoder
            .validate()
            .map_err(ArtifactError::Encoder)?;
        if self.disease_encoder.len() != self.classifier.n_classes {
            return Err(ArtifactError::Mismatch(format!(
                "Encoder has {} diseases but classifier predicts {} classes",
                self.disease_encoder.len(),
                self.classifier.n_classes
            )));
        }
        if self.feature_columns.len() != self.classifier.feature_len {
            return Err(ArtifactError::Mismatch(format!(
                "{} feature columns but classifier expects {}",
                self.feature_columns.len(),
                self.classifier.feature_len
            )));
        }
        self.schema()?;
        Ok(())
    }

    /// Compile the request-time feature layout.
    pub fn schema(&self) -> Result<FeatureSchema, SchemaError> {
        FeatureSchema::compile(&self.feature_columns, &self.symptom_columns)
    }

    /// Sorted symptom names for the client picker.
    pub fn symptom_list(&self) -> Vec<String> {
        let mut symptoms = self.symptom_columns.clone();
        symptoms.sort();
        symptoms
    }

    /// Sorted disease names.
    pub fn disease_list(&self) -> Vec<String> {
        self.disease_encoder.classes().to_vec()
    }

    pub fn load_json(path: &Path) -> Result<Self, ArtifactError> {
        let artifact: Self = read_json(path)?;
        artifact.validate()?;
        Ok(artifact)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), ArtifactError> {
        write_json(path, self)
    }
}

/// File locations of one training run's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub symptoms: PathBuf,
    pub diseases: PathBuf,
}

impl ArtifactPaths {
    /// Default file names inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            model: dir.join(MODEL_FILE_NAME),
            symptoms: dir.join(SYMPTOMS_FILE_NAME),
            diseases: dir.join(DISEASES_FILE_NAME),
        }
    }
}

/// Write a sorted lookup list as a JSON array.
pub fn write_lookup_list(path: &Path, values: &[String]) -> Result<(), ArtifactError> {
    write_json(path, &values)
}

pub fn read_lookup_list(path: &Path) -> Result<Vec<String>, ArtifactError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), ArtifactError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ArtifactError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| ArtifactError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, bytes).map_err(|source| ArtifactError::Write {
        path: path.to_path_buf(),
        source,
    })
}
