use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Key of the entry used for diseases without specific advice.
pub const DEFAULT_ADVICE_KEY: &str = "default";
/// Advice used when no advice file is installed.
pub const BUILTIN_DEFAULT_ADVICE: &str =
    "Rest, stay hydrated, monitor symptoms. Seek medical help if symptoms worsen.";

#[derive(Debug, Error)]
pub enum AdviceError {
    #[error("Failed to read advice table {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Advice table {path} is not a JSON object of strings: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Advice table {path} has no \"default\" entry")]
    MissingDefault { path: PathBuf },
}

/// Home-care guidance keyed by disease name.
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceTable {
    entries: BTreeMap<String, String>,
}

impl Default for AdviceTable {
    fn default() -> Self {
        Self {
            entries: BTreeMap::from([(
                DEFAULT_ADVICE_KEY.to_string(),
                BUILTIN_DEFAULT_ADVICE.to_string(),
            )]),
        }
    }
}

impl AdviceTable {
    /// Build from entries; `None` when the `default` entry is missing.
    pub fn from_entries(entries: BTreeMap<String, String>) -> Option<Self> {
        entries
            .contains_key(DEFAULT_ADVICE_KEY)
            .then_some(Self { entries })
    }

    /// Load `path`, or fall back to the built-in table when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, AdviceError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "No advice table at {}; using built-in default advice",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(AdviceError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let entries: BTreeMap<String, String> =
            serde_json::from_slice(&bytes).map_err(|source| AdviceError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_entries(entries).ok_or_else(|| AdviceError::MissingDefault {
            path: path.to_path_buf(),
        })
    }

    /// Number of entries, `default` included.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Advice for `disease`, or the default entry.
    pub fn lookup(&self, disease: Option<&str>) -> &str {
        disease
            .and_then(|name| self.entries.get(name))
            .or_else(|| self.entries.get(DEFAULT_ADVICE_KEY))
            .map(String::as_str)
            .unwrap_or(BUILTIN_DEFAULT_ADVICE)
    }

    /// The sentence returned to clients.
    pub fn home_care(&self, disease: Option<&str>) -> String {
        format!(
            "Safe suggestions for {}: {}",
            disease.unwrap_or("your symptoms"),
            self.lookup(disease)
        )
    }
}
