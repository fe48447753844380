//! CSV loader producing encoded patient rows.

use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::features::{
    AGE_COLUMN, DISEASE_COLUMN, GENDER_COLUMN, Gender, ID_COLUMNS, feature_column_order,
};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open dataset {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Dataset has no \"Disease\" column")]
    MissingDiseaseColumn,
    #[error("Duplicate column {0:?}")]
    DuplicateColumn(String),
    #[error("Row {row}: Age value {value:?} is not a finite number")]
    InvalidAge { row: usize, value: String },
}

/// One cleaned dataset row.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientRecord {
    pub disease: String,
    /// Values in [`SymptomTable::feature_columns`] order.
    pub features: Vec<f32>,
}

/// A dataset after cleaning and encoding.
#[derive(Debug, Clone)]
pub struct SymptomTable {
    /// Symptom indicator columns, sorted.
    pub symptom_columns: Vec<String>,
    /// Full feature order: symptoms, then `Age`, then `Gender` when present.
    pub feature_columns: Vec<String>,
    pub records: Vec<PatientRecord>,
    /// Rows skipped for lacking a disease label.
    pub dropped_rows: usize,
}

/// Load and encode a CSV file.
pub fn load_csv(path: &Path) -> Result<SymptomTable, DatasetError> {
    let reader = csv::Reader::from_path(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let table = encode(reader)?;
    tracing::info!(
        "Loaded {} rows from {} ({} symptoms, {} dropped without label)",
        table.records.len(),
        path.display(),
        table.symptom_columns.len(),
        table.dropped_rows
    );
    Ok(table)
}

/// Encode CSV data from any reader; the first record is the header.
pub fn read_csv<R: Read>(reader: R) -> Result<SymptomTable, DatasetError> {
    encode(csv::Reader::from_reader(reader))
}

struct ColumnLayout {
    disease: usize,
    age: Option<usize>,
    gender: Option<usize>,
    /// `(name, csv index)` sorted by name.
    symptoms: Vec<(String, usize)>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, DatasetError> {
        let names: Vec<&str> = headers.iter().map(str::trim).collect();
        let mut seen = HashSet::new();
        if let Some(dup) = names.iter().find(|name| !seen.insert(**name)) {
            return Err(DatasetError::DuplicateColumn(dup.to_string()));
        }
        let position = |column: &str| names.iter().position(|name| *name == column);
        let disease = position(DISEASE_COLUMN).ok_or(DatasetError::MissingDiseaseColumn)?;

        let mut symptoms: Vec<(String, usize)> = names
            .iter()
            .enumerate()
            .filter(|(_, name)| !is_reserved(name))
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();
        symptoms.sort();
        Ok(Self {
            disease,
            age: position(AGE_COLUMN),
            gender: position(GENDER_COLUMN),
            symptoms,
        })
    }

    fn symptom_names(&self) -> Vec<String> {
        self.symptoms.iter().map(|(name, _)| name.clone()).collect()
    }

    fn encode_row(&self, row: usize, record: &csv::StringRecord) -> Result<Vec<f32>, DatasetError> {
        let cell = |idx: usize| record.get(idx).map(str::trim).unwrap_or("");
        let mut features: Vec<f32> = self
            .symptoms
            .iter()
            .map(|(_, idx)| if is_present(cell(*idx)) { 1.0 } else { 0.0 })
            .collect();
        if let Some(idx) = self.age {
            features.push(parse_age(row, cell(idx))?);
        }
        if let Some(idx) = self.gender {
            let value = cell(idx);
            let gender = if value.is_empty() {
                Gender::Other
            } else {
                Gender::from_label(value)
            };
            features.push(gender.code());
        }
        Ok(features)
    }
}

fn encode<R: Read>(mut reader: csv::Reader<R>) -> Result<SymptomTable, DatasetError> {
    let layout = ColumnLayout::from_headers(reader.headers()?)?;
    let symptom_columns = layout.symptom_names();
    let feature_columns =
        feature_column_order(&symptom_columns, layout.age.is_some(), layout.gender.is_some());

    let mut records = Vec::new();
    let mut dropped_rows = 0usize;
    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let row = idx + 1;
        let disease = record.get(layout.disease).map(str::trim).unwrap_or("");
        if disease.is_empty() {
            dropped_rows += 1;
            continue;
        }
        records.push(PatientRecord {
            disease: disease.to_string(),
            features: layout.encode_row(row, &record)?,
        });
    }
    if dropped_rows > 0 {
        tracing::warn!("Dropped {dropped_rows} rows without a {DISEASE_COLUMN} label");
    }

    Ok(SymptomTable {
        symptom_columns,
        feature_columns,
        records,
        dropped_rows,
    })
}

fn is_reserved(name: &str) -> bool {
    name == DISEASE_COLUMN || name == AGE_COLUMN || name == GENDER_COLUMN || ID_COLUMNS.contains(&name)
}

/// Any non-empty, non-zero cell counts as present; symptom text such as
/// `"itching"` is presence too.
fn is_present(cell: &str) -> bool {
    if cell.is_empty() {
        return false;
    }
    match cell.parse::<f64>() {
        Ok(value) => value != 0.0 && !value.is_nan(),
        Err(_) => true,
    }
}

fn parse_age(row: usize, cell: &str) -> Result<f32, DatasetError> {
    if cell.is_empty() {
        return Ok(0.0);
    }
    cell.parse::<f32>()
        .ok()
        .filter(|age| age.is_finite())
        .ok_or_else(|| DatasetError::InvalidAge {
            row,
            value: cell.to_string(),
        })
}
