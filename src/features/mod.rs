//! Feature encoding shared by the trainer and the predictor.
//!
//! Both sides go through the same column names and the same [`Gender`]
//! mapping so a vector built from a request lines up with the training rows.

mod gender;
mod schema;

pub use gender::Gender;
pub use schema::{FeatureSchema, SchemaError, ValueSource};

/// Column holding the class label.
pub const DISEASE_COLUMN: &str = "Disease";
/// Optional numeric age column.
pub const AGE_COLUMN: &str = "Age";
/// Optional categorical gender column.
pub const GENDER_COLUMN: &str = "Gender";
/// Identifier columns that never become features.
pub const ID_COLUMNS: &[&str] = &["Patient_ID", "ID"];

/// Assemble the persisted feature order: sorted symptoms, then `Age`, then `Gender`.
pub fn feature_column_order(symptoms: &[String], has_age: bool, has_gender: bool) -> Vec<String> {
    let mut columns = symptoms.to_vec();
    columns.sort();
    if has_age {
        columns.push(AGE_COLUMN.to_string());
    }
    if has_gender {
        columns.push(GENDER_COLUMN.to_string());
    }
    columns
}
