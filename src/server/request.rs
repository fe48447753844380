use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::value::RawValue;

use super::error::RequestError;
use crate::config::AgePolicy;
use crate::predict::has_urgent_symptom;

/// `/predict` body as received.
///
/// `symptoms` is typed so a malformed list fails parsing outright; `age` and
/// `gender` are kept as raw JSON text and only decoded after the emergency
/// check, so their contents can never reject an urgent request.
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub age: Option<Box<RawValue>>,
    #[serde(default)]
    pub gender: Option<Box<RawValue>>,
}

/// Validated request fields.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientInput {
    pub symptoms: BTreeSet<String>,
    pub age: Option<f32>,
    pub gender: Option<String>,
}

impl PredictRequest {
    pub fn parse(body: &[u8]) -> Result<Self, RequestError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn is_urgent(&self) -> bool {
        has_urgent_symptom(&self.symptoms)
    }

    pub fn into_input(self, policy: &AgePolicy) -> Result<PatientInput, RequestError> {
        let age = match self.age {
            None => None,
            Some(raw) => {
                let age: f64 =
                    serde_json::from_str(raw.get()).map_err(|_| RequestError::AgeNotNumber)?;
                if !policy.accepts(age as f32) {
                    return Err(RequestError::AgeOutOfRange {
                        age,
                        min: policy.min,
                        max: policy.max,
                    });
                }
                Some(age as f32)
            }
        };
        let gender = match self.gender {
            None => None,
            Some(raw) => Some(
                serde_json::from_str::<String>(raw.get())
                    .map_err(|_| RequestError::GenderNotString)?,
            ),
        };
        Ok(PatientInput {
            symptoms: self.symptoms.into_iter().collect(),
            age,
            gender,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(body: &str) -> Result<PatientInput, RequestError> {
        PredictRequest::parse(body.as_bytes())?.into_input(&AgePolicy::default())
    }

    #[test]
    fn accepts_full_and_minimal_bodies() {
        let full = input(r#"{"symptoms":["fever","fever","cough"],"age":42,"gender":"Female"}"#)
            .unwrap();
        assert_eq!(full.symptoms.len(), 2);
        assert_eq!(full.age, Some(42.0));
        assert_eq!(full.gender.as_deref(), Some("Female"));

        let minimal = input(r#"{"symptoms":[],"age":null}"#).unwrap();
        assert!(minimal.symptoms.is_empty());
        assert_eq!(minimal.age, None);
        assert_eq!(minimal.gender, None);
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(matches!(input(r#"{"age":3}"#), Err(RequestError::Shape(_))));
        assert!(matches!(input(r#"{"symptoms":"fever"}"#), Err(RequestError::Shape(_))));
        assert!(matches!(input(r#"{"symptoms":[1,2]}"#), Err(RequestError::Shape(_))));
        assert!(matches!(input("not json"), Err(RequestError::Shape(_))));
        assert!(matches!(
            input(r#"{"symptoms":[],"age":"forty"}"#),
            Err(RequestError::AgeNotNumber)
        ));
        assert!(matches!(
            input(r#"{"symptoms":[],"gender":1}"#),
            Err(RequestError::GenderNotString)
        ));
        assert!(matches!(
            input(r#"{"symptoms":[],"age":130}"#),
            Err(RequestError::AgeOutOfRange { .. })
        ));
    }

    #[test]
    fn urgency_is_known_before_validation() {
        let request =
            PredictRequest::parse(br#"{"symptoms":["chest_pain"],"age":"old"}"#).unwrap();
        assert!(request.is_urgent());
    }

    #[test]
    fn undecodable_demographics_fail_only_at_validation() {
        let nested = format!("{}1{}", "[".repeat(200), "]".repeat(200));
        for body in [
            r#"{"symptoms":["chest_pain"],"age":1e400}"#.to_string(),
            format!(r#"{{"symptoms":["chest_pain"],"age":{nested}}}"#),
            format!(r#"{{"symptoms":["chest_pain"],"gender":{nested}}}"#),
        ] {
            let request = PredictRequest::parse(body.as_bytes()).unwrap();
            assert!(request.is_urgent(), "body {body}");
        }

        assert!(matches!(
            input(r#"{"symptoms":["fever"],"age":1e400}"#),
            Err(RequestError::AgeNotNumber)
        ));
        assert!(matches!(
            input(&format!(r#"{{"symptoms":["fever"],"gender":{nested}}}"#)),
            Err(RequestError::GenderNotString)
        ));
    }
}
