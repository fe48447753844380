use serde::{Deserialize, Serialize};

/// Patient gender with its fixed numeric code.
///
/// `Male = 0`, `Female = 1`, everything else (including missing) is `Other = 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Other,
}

impl Gender {
    /// Map a free-form label. Exact `"Male"`/`"Female"` match; anything else is `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Male" => Self::Male,
            "Female" => Self::Female,
            _ => Self::Other,
        }
    }

    /// Map an optional label, treating absence as `Other`.
    pub fn from_optional(label: Option<&str>) -> Self {
        label.map(Self::from_label).unwrap_or_default()
    }

    pub fn code(self) -> f32 {
        match self {
            Self::Male => 0.0,
            Self::Female => 1.0,
            Self::Other => 2.0,
        }
    }
}
