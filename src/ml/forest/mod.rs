//! Random forest classifier built from CART decision trees.
//!
//! Supports:
//! - Multi-class classification with per-class probability output.
//! - Bootstrap sampling and per-node feature subsampling, seeded for reproducibility.
//! - JSON model export/load with structural validation.

mod model;
mod train;

pub use model::{DecisionTree, ForestError, RandomForestModel, TreeNode};
pub use train::{TrainDataset, TrainOptions, train_random_forest};
