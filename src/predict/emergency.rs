/// Symptoms that bypass prediction and trigger the urgent-care response.
pub const URGENT_SYMPTOMS: &[&str] = &[
    "chest_pain",
    "shortness_of_breath",
    "difficulty_in_breathing",
    "severe_chest_pain",
    "sudden_chest_pain",
    "loss_of_consciousness",
];

pub const EMERGENCY_MESSAGE: &str = "⚠️ SEEK IMMEDIATE EMERGENCY MEDICAL HELP! Possible serious condition (e.g., heart or breathing issue). Call emergency services now.";

/// True when any selected symptom is urgent.
pub fn has_urgent_symptom<S: AsRef<str>>(symptoms: impl IntoIterator<Item = S>) -> bool {
    symptoms
        .into_iter()
        .any(|symptom| URGENT_SYMPTOMS.contains(&symptom.as_ref()))
}
