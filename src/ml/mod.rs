//! Machine learning building blocks for training and inference.
//!
//! Everything here is deterministic given a seed and exports to JSON, so a
//! model trained by `symptomcheck-train` loads bit-for-bit in the service.

pub mod forest;
pub mod label_encoder;
pub mod metrics;
