//! Tabular symptom datasets used for training.

pub mod loader;

pub use loader::{DatasetError, PatientRecord, SymptomTable, load_csv, read_csv};
