//! HTTP surface of the prediction service.
//!
//! Artifacts are loaded once by [`load_state`] before the listener binds and
//! handed to every handler as read-only shared state.

mod error;
mod request;

pub use error::RequestError;
pub use request::{PatientInput, PredictRequest};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;

use crate::artifact::{ArtifactError, ModelArtifact, read_lookup_list};
use crate::config::{AgePolicy, ServiceConfig};
use crate::predict::{AdviceError, AdviceTable, PredictionResult, Predictor};

/// Fatal problems that keep the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Advice(#[from] AdviceError),
    #[error("Invalid bind address {addr:?}: {source}")]
    BindAddr {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// Read-only state shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub predictor: Predictor,
    pub symptoms: Vec<String>,
    pub diseases: Vec<String>,
    pub age_policy: AgePolicy,
}

impl AppState {
    /// Build state from an in-memory artifact, deriving the lookup lists from it.
    pub fn from_artifact(
        artifact: ModelArtifact,
        advice: AdviceTable,
        age_policy: AgePolicy,
    ) -> Result<Self, ArtifactError> {
        let symptoms = artifact.symptom_list();
        let diseases = artifact.disease_list();
        Ok(Self {
            predictor: Predictor::new(artifact, advice)?,
            symptoms,
            diseases,
            age_policy,
        })
    }
}

/// Load the model, lookup lists and advice table named by `config`.
pub fn load_state(config: &ServiceConfig) -> Result<AppState, StartupError> {
    let paths = config.artifact_paths();
    let artifact = ModelArtifact::load_json(&paths.model)?;
    let symptoms = read_lookup_list(&paths.symptoms)?;
    let diseases = read_lookup_list(&paths.diseases)?;
    if symptoms != artifact.symptom_list() || diseases != artifact.disease_list() {
        return Err(ArtifactError::Mismatch(format!(
            "Lookup lists in {} do not match model {}",
            config.artifact_dir.display(),
            paths.model.display()
        ))
        .into());
    }
    let advice = AdviceTable::load_or_default(&config.advice_file)?;
    tracing::info!(
        "Loaded model {} ({} symptoms, {} diseases, {} advice entries)",
        paths.model.display(),
        symptoms.len(),
        diseases.len(),
        advice.entry_count()
    );

    Ok(AppState {
        predictor: Predictor::new(artifact, advice)?,
        symptoms,
        diseases,
        age_policy: config.age,
    })
}

/// Build the router. Static files are served from `static_dir` when it exists.
pub fn router(state: Arc<AppState>, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/symptoms", get(symptoms))
        .route("/diseases", get(diseases))
        .route("/predict", post(predict))
        .with_state(state);
    if let Some(dir) = static_dir.filter(|dir| dir.is_dir()) {
        app = app.fallback_service(ServeDir::new(dir));
    }
    app.layer(cors)
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: &ServiceConfig, state: AppState) -> Result<(), StartupError> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|source| StartupError::BindAddr {
            addr: config.bind_addr.clone(),
            source,
        })?;
    let static_dir: Option<PathBuf> = config.static_dir.clone();
    let app = router(Arc::new(state), static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!("symptomcheck listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    classes: usize,
    features: usize,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        classes: state.predictor.diseases().len(),
        features: state.predictor.schema().len(),
    })
}

async fn symptoms(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.symptoms.clone())
}

async fn diseases(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.diseases.clone())
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionResult>, RequestError> {
    let request = PredictRequest::parse(&body)?;
    if request.is_urgent() {
        tracing::debug!(
            emergency = true,
            symptoms = request.symptoms.len(),
            "Urgent symptom selected; skipping validation and classifier"
        );
        return Ok(Json(PredictionResult::emergency()));
    }
    let input = request.into_input(&state.age_policy)?;
    Ok(Json(state.predictor.predict(
        &input.symptoms,
        input.age,
        input.gender.as_deref(),
    )))
}
