//! Request-time prediction: emergency override, feature encoding, ranking and advice.
//!
//! [`Predictor`] is immutable after construction and is shared across
//! concurrent requests without locking.

mod advice;
mod emergency;
mod ranking;

pub use advice::{AdviceError, AdviceTable, BUILTIN_DEFAULT_ADVICE, DEFAULT_ADVICE_KEY};
pub use emergency::{EMERGENCY_MESSAGE, URGENT_SYMPTOMS, has_urgent_symptom};
pub use ranking::{RELEVANCE_FLOOR_PERCENT, RankedClass, TOP_K, rank_top};

use std::collections::BTreeSet;

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::artifact::{ArtifactError, ModelArtifact};
use crate::features::{FeatureSchema, Gender};
use crate::ml::forest::RandomForestModel;
use crate::ml::label_encoder::LabelEncoder;

pub const DISCLAIMER: &str = "This tool provides general information only and is NOT a medical diagnosis. Always consult a qualified healthcare professional.";
/// Disease name of the placeholder entry returned when nothing clears the floor.
pub const NO_MATCH_DISEASE: &str = "No strong match found";

/// One reported disease with its probability in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPrediction {
    pub disease: String,
    pub probability: f32,
}

impl RankedPrediction {
    fn no_match() -> Self {
        Self {
            disease: NO_MATCH_DISEASE.to_string(),
            probability: 0.0,
        }
    }
}

/// Normal prediction payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// One to three entries; a single [`NO_MATCH_DISEASE`] entry when nothing cleared the floor.
    pub predictions: Vec<RankedPrediction>,
    pub home_care: String,
    pub disclaimer: String,
}

/// Outcome of [`Predictor::predict`].
///
/// Serializes to `{"emergency": true, "message": ...}` or
/// `{"emergency": false, "predictions": ..., "home_care": ..., "disclaimer": ...}`.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Emergency { message: String },
    Assessment(Assessment),
}

impl PredictionResult {
    pub fn emergency() -> Self {
        Self::Emergency {
            message: EMERGENCY_MESSAGE.to_string(),
        }
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Emergency { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("emergency", &true)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
            Self::Assessment(assessment) => {
                let mut map = serializer.serialize_map(Some(4))?;
                map.serialize_entry("emergency", &false)?;
                map.serialize_entry("predictions", &assessment.predictions)?;
                map.serialize_entry("home_care", &assessment.home_care)?;
                map.serialize_entry("disclaimer", &assessment.disclaimer)?;
                map.end()
            }
        }
    }
}

/// Loaded model plus everything needed to answer a request.
#[derive(Debug, Clone)]
pub struct Predictor {
    classifier: RandomForestModel,
    diseases: LabelEncoder,
    schema: FeatureSchema,
    advice: AdviceTable,
}

impl Predictor {
    /// Validate the artifact and compile its feature schema.
    pub fn new(artifact: ModelArtifact, advice: AdviceTable) -> Result<Self, ArtifactError> {
        artifact.validate()?;
        let schema = artifact.schema()?;
        Ok(Self {
            classifier: artifact.classifier,
            diseases: artifact.disease_encoder,
            schema,
            advice,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn diseases(&self) -> &LabelEncoder {
        &self.diseases
    }

    /// Feature vector for a request, in the persisted column order.
    pub fn feature_vector(
        &self,
        symptoms: &BTreeSet<String>,
        age: Option<f32>,
        gender: Option<&str>,
    ) -> Vec<f32> {
        self.schema
            .encode(symptoms, age, Gender::from_optional(gender))
    }

    /// Predict the most likely diseases for a patient.
    ///
    /// Urgent symptoms short-circuit before any feature is built.
    pub fn predict(
        &self,
        symptoms: &BTreeSet<String>,
        age: Option<f32>,
        gender: Option<&str>,
    ) -> PredictionResult {
        if has_urgent_symptom(symptoms) {
            tracing::debug!(
                emergency = true,
                symptoms = symptoms.len(),
                "Urgent symptom selected; skipping classifier"
            );
            return PredictionResult::emergency();
        }

        let features = self.feature_vector(symptoms, age, gender);
        let proba = self.classifier.predict_proba(&features);
        let mut predictions: Vec<RankedPrediction> = rank_top(&proba)
            .into_iter()
            .filter_map(|ranked| {
                let disease = self.diseases.inverse_transform(ranked.class_index)?;
                Some(RankedPrediction {
                    disease: disease.to_string(),
                    probability: ranked.percent,
                })
            })
            .collect();

        let top_disease = predictions.first().map(|p| p.disease.clone());
        if predictions.is_empty() {
            predictions.push(RankedPrediction::no_match());
        }
        tracing::debug!(
            emergency = false,
            symptoms = symptoms.len(),
            top = top_disease.as_deref().unwrap_or(NO_MATCH_DISEASE),
            "Prediction complete"
        );

        PredictionResult::Assessment(Assessment {
            predictions,
            home_care: self.advice.home_care(top_disease.as_deref()),
            disclaimer: DISCLAIMER.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ARTIFACT_FORMAT_VERSION;
    use crate::ml::forest::{DecisionTree, TreeNode};
    use std::collections::BTreeMap;

    fn selected(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// Two trees over `[cough, fever, Age, Gender]`:
    /// fever routes to Malaria, otherwise the mass goes to Cold.
    fn predictor() -> Predictor {
        let fever_tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature_index: 1,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    proba: vec![(0, 0.9), (1, 0.095), (2, 0.005)],
                },
                TreeNode::Leaf {
                    proba: vec![(2, 0.8), (1, 0.2)],
                },
            ],
        };
        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            classifier: RandomForestModel {
                model_version: 1,
                feature_len: 4,
                n_classes: 3,
                seed: 42,
                trees: vec![fever_tree.clone(), fever_tree],
            },
            disease_encoder: LabelEncoder::fit(["Cold", "Flu", "Malaria"]),
            feature_columns: vec![
                "cough".into(),
                "fever".into(),
                "Age".into(),
                "Gender".into(),
            ],
            symptom_columns: vec!["cough".into(), "fever".into()],
        };
        let advice = AdviceTable::from_entries(BTreeMap::from([
            ("default".to_string(), "Rest.".to_string()),
            ("Malaria".to_string(), "Use a mosquito net.".to_string()),
        ]))
        .unwrap();
        Predictor::new(artifact, advice).unwrap()
    }

    fn assessment(result: PredictionResult) -> Assessment {
        match result {
            PredictionResult::Assessment(assessment) => assessment,
            other => panic!("expected assessment, got {other:?}"),
        }
    }

    #[test]
    fn urgent_symptom_short_circuits() {
        let result = predictor().predict(&selected(&["fever", "chest_pain"]), Some(-5.0), Some("x"));
        assert_eq!(result, PredictionResult::emergency());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"emergency": true, "message": EMERGENCY_MESSAGE})
        );
    }

    #[test]
    fn ranks_and_filters_predictions() {
        let result = assessment(predictor().predict(&selected(&["fever"]), Some(30.0), None));
        assert_eq!(
            result.predictions,
            vec![
                RankedPrediction {
                    disease: "Malaria".into(),
                    probability: 80.0,
                },
                RankedPrediction {
                    disease: "Flu".into(),
                    probability: 20.0,
                },
            ]
        );
        assert_eq!(result.home_care, "Safe suggestions for Malaria: Use a mosquito net.");
        assert_eq!(result.disclaimer, DISCLAIMER);
    }

    #[test]
    fn low_probability_classes_are_dropped() {
        let result = assessment(predictor().predict(&selected(&["cough"]), None, None));
        let diseases: Vec<&str> = result.predictions.iter().map(|p| p.disease.as_str()).collect();
        assert_eq!(diseases, vec!["Cold", "Flu"]);
        assert_eq!(result.predictions[1].probability, 9.5);
        assert_eq!(result.home_care, "Safe suggestions for Cold: Rest.");
    }

    #[test]
    fn flat_distribution_falls_back_to_no_match() {
        let classes: Vec<String> = (0..200).map(|i| format!("Disease {i:03}")).collect();
        let artifact = ModelArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            classifier: RandomForestModel {
                model_version: 1,
                feature_len: 1,
                n_classes: 200,
                seed: 0,
                trees: vec![DecisionTree {
                    nodes: vec![TreeNode::Leaf {
                        proba: (0..200u16).map(|class| (class, 0.005)).collect(),
                    }],
                }],
            },
            disease_encoder: LabelEncoder::fit(&classes),
            feature_columns: vec!["itching".into()],
            symptom_columns: vec!["itching".into()],
        };
        let predictor = Predictor::new(artifact, AdviceTable::default()).unwrap();
        let result = predictor.predict(&selected(&[]), None, None);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["emergency"], false);
        assert_eq!(
            json["predictions"],
            serde_json::json!([{"disease": NO_MATCH_DISEASE, "probability": 0.0}])
        );
        assert_eq!(
            json["home_care"],
            format!("Safe suggestions for your symptoms: {BUILTIN_DEFAULT_ADVICE}")
        );
    }

    #[test]
    fn feature_vector_uses_fixed_gender_codes() {
        let predictor = predictor();
        let symptoms = selected(&["fever", "sneezing"]);
        assert_eq!(
            predictor.feature_vector(&symptoms, Some(41.0), Some("Female")),
            vec![0.0, 1.0, 41.0, 1.0]
        );
        assert_eq!(
            predictor.feature_vector(&symptoms, None, Some("Male")),
            vec![0.0, 1.0, 0.0, 0.0]
        );
        assert_eq!(
            predictor.feature_vector(&symptoms, None, None),
            vec![0.0, 1.0, 0.0, 2.0]
        );
    }

    #[test]
    fn identical_requests_give_identical_results() {
        let predictor = predictor();
        let symptoms = selected(&["cough", "fever"]);
        let first = predictor.predict(&symptoms, Some(50.0), Some("Other"));
        let second = predictor.predict(&symptoms, Some(50.0), Some("Other"));
        assert_eq!(first, second);
    }
}
