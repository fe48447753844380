//! Bijection between class names and dense integer indices.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Maps class names to `0..len` in sorted order.
///
/// The same fitted encoder is serialized with the model so training and
/// inference agree on every index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the unique values of `labels`.
    pub fn fit<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_string())
            .collect();
        Self {
            classes: unique.into_iter().collect(),
        }
    }

    /// Index of `label`, if it was seen during fit.
    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(label))
            .ok()
    }

    /// Class name for `index`.
    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Check that classes are strictly ascending, which a deserialized
    /// encoder must satisfy for `transform` to stay a bijection.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(pair) = self.classes.windows(2).find(|pair| pair[0] >= pair[1]) {
            return Err(format!(
                "Label encoder classes are not strictly sorted near {:?}",
                pair[1]
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_sorts_and_dedups() {
        let encoder = LabelEncoder::fit(["Malaria", "Acne", "Malaria", "Dengue"]);
        assert_eq!(encoder.classes(), &["Acne", "Dengue", "Malaria"]);
        assert_eq!(encoder.transform("Dengue"), Some(1));
        assert_eq!(encoder.transform("Flu"), None);
        assert_eq!(encoder.inverse_transform(2), Some("Malaria"));
        assert_eq!(encoder.inverse_transform(3), None);
    }

    #[test]
    fn validate_rejects_unsorted_classes() {
        let encoder: LabelEncoder =
            serde_json::from_str(r#"{"classes":["b","a"]}"#).unwrap();
        assert!(encoder.validate().is_err());
        assert!(LabelEncoder::fit(["a", "b"]).validate().is_ok());
    }
}
