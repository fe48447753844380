use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;

use super::{AGE_COLUMN, GENDER_COLUMN, Gender};

/// Where a feature slot takes its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// 1 when the named symptom is selected, else 0.
    Symptom(String),
    /// The supplied age, or 0 when absent.
    Age,
    /// The fixed [`Gender`] code.
    Gender,
    /// A column no request field feeds; always 0.
    Unused,
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Duplicate feature column {0:?}")]
    DuplicateColumn(String),
    #[error("Symptom column {0:?} is not part of the feature columns")]
    UnknownSymptomColumn(String),
}

/// Feature layout resolved once from the persisted column order.
///
/// Per-request construction is an indexed fill: symptom names map straight
/// to their slot and the demographic slots are remembered by position.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    columns: Vec<(String, ValueSource)>,
    symptom_slots: HashMap<String, usize>,
    age_slot: Option<usize>,
    gender_slot: Option<usize>,
}

impl FeatureSchema {
    pub fn compile(
        feature_columns: &[String],
        symptom_columns: &[String],
    ) -> Result<Self, SchemaError> {
        let symptoms: HashSet<&str> = symptom_columns.iter().map(String::as_str).collect();
        if let Some(missing) = symptom_columns
            .iter()
            .find(|name| !feature_columns.contains(*name))
        {
            return Err(SchemaError::UnknownSymptomColumn(missing.clone()));
        }

        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(feature_columns.len());
        let mut symptom_slots = HashMap::new();
        let mut age_slot = None;
        let mut gender_slot = None;
        for (slot, name) in feature_columns.iter().enumerate() {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateColumn(name.clone()));
            }
            let source = if symptoms.contains(name.as_str()) {
                symptom_slots.insert(name.clone(), slot);
                ValueSource::Symptom(name.clone())
            } else if name == AGE_COLUMN {
                age_slot = Some(slot);
                ValueSource::Age
            } else if name == GENDER_COLUMN {
                gender_slot = Some(slot);
                ValueSource::Gender
            } else {
                ValueSource::Unused
            };
            columns.push((name.clone(), source));
        }

        Ok(Self {
            columns,
            symptom_slots,
            age_slot,
            gender_slot,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[(String, ValueSource)] {
        &self.columns
    }

    /// Build the vector for one request. Unknown symptom names are ignored.
    pub fn encode(&self, symptoms: &BTreeSet<String>, age: Option<f32>, gender: Gender) -> Vec<f32> {
        let mut features = vec![0.0f32; self.columns.len()];
        for symptom in symptoms {
            if let Some(&slot) = self.symptom_slots.get(symptom) {
                features[slot] = 1.0;
            }
        }
        if let (Some(slot), Some(age)) = (self.age_slot, age) {
            features[slot] = age;
        }
        if let Some(slot) = self.gender_slot {
            features[slot] = gender.code();
        }
        features
    }
}
