//! Library exports for the prediction service, the trainer binary, tests and benchmarks.
/// Per-user application directory resolution.
pub mod app_dirs;
/// Persisted model artifact and lookup lists.
pub mod artifact;
/// Service configuration.
pub mod config;
/// CSV dataset loading.
pub mod dataset;
/// Feature column layout and encoding.
pub mod features;
/// Stdout and file logging setup.
pub mod logging;
/// Classifier, label encoding and evaluation metrics.
pub mod ml;
/// Prediction pipeline.
pub mod predict;
/// HTTP service.
pub mod server;
/// Training pipeline.
pub mod trainer;
