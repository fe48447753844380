use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

/// Reasons a `/predict` body is rejected.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("Request body must be a JSON object with a \"symptoms\" array of strings: {0}")]
    Shape(#[from] serde_json::Error),
    #[error("\"age\" must be a finite number")]
    AgeNotNumber,
    #[error("\"age\" must be between {min} and {max}, got {age}")]
    AgeOutOfRange { age: f64, min: f32, max: f32 },
    #[error("\"gender\" must be a string")]
    GenderNotString,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for RequestError {
    fn into_response(self) -> Response {
        tracing::warn!("Rejected prediction request: {self}");
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
