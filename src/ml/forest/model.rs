use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Current on-disk format of [`RandomForestModel`].
pub const FOREST_MODEL_VERSION: i64 = 1;

/// Errors raised while training, validating or loading a forest.
#[derive(Debug, Error)]
pub enum ForestError {
    #[error("Mismatched X/Y lengths ({x} rows, {y} labels)")]
    MismatchedLengths { x: usize, y: usize },
    #[error("Empty dataset")]
    EmptyDataset,
    #[error("Dataset has no classes")]
    NoClasses,
    #[error("Label {label} out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },
    #[error("Row {row} has {len} features but expected {expected}")]
    RowLength {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("Invalid model: {0}")]
    Invalid(String),
    #[error("Failed to read model {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse model {path}: {source}")]
    Parse {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
}

/// A node of a decision tree stored in a flat arena.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal node routing `feature <= threshold` left, otherwise right.
    Split {
        feature_index: u16,
        threshold: f32,
        left: u32,
        right: u32,
    },
    /// Terminal node holding the non-zero class fractions of its training samples.
    Leaf { proba: Vec<(u16, f32)> },
}

/// Decision tree whose root is `nodes[0]`; children always follow their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Walk to the leaf reached by `features`.
    ///
    /// Missing feature values read as `0.0`.
    pub fn leaf_proba(&self, features: &[f32]) -> &[(u16, f32)] {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = features
                        .get(*feature_index as usize)
                        .copied()
                        .unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right } as usize;
                }
                Some(TreeNode::Leaf { proba }) => return proba,
                None => return &[],
            }
        }
    }

    fn validate(&self, tree_idx: usize, feature_len: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err(format!("Tree {tree_idx} has no nodes"));
        }
        for (node_idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature_index,
                    left,
                    right,
                    ..
                } => {
                    if *feature_index as usize >= feature_len {
                        return Err(format!(
                            "Tree {tree_idx} node {node_idx} splits on feature {feature_index} of {feature_len}"
                        ));
                    }
                    for child in [*left as usize, *right as usize] {
                        // Children must point forward so traversal always terminates.
                        if child <= node_idx || child >= self.nodes.len() {
                            return Err(format!(
                                "Tree {tree_idx} node {node_idx} has invalid child {child}"
                            ));
                        }
                    }
                }
                TreeNode::Leaf { proba } => {
                    if let Some((class, _)) =
                        proba.iter().find(|(class, _)| *class as usize >= n_classes)
                    {
                        return Err(format!(
                            "Tree {tree_idx} leaf {node_idx} references class {class} of {n_classes}"
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Random forest model for multi-class classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    /// Model format version.
    pub model_version: i64,
    /// Number of `f32` values per feature vector.
    pub feature_len: usize,
    /// Number of classes the probabilities are spread over.
    pub n_classes: usize,
    /// Seed the forest was trained with.
    pub seed: u64,
    pub trees: Vec<DecisionTree>,
}

impl RandomForestModel {
    /// Validate structural invariants of the model.
    pub fn validate(&self) -> Result<(), ForestError> {
        if self.model_version != FOREST_MODEL_VERSION {
            return Err(ForestError::Invalid(format!(
                "Unsupported model_version {} (expected {FOREST_MODEL_VERSION})",
                self.model_version
            )));
        }
        if self.n_classes == 0 {
            return Err(ForestError::NoClasses);
        }
        if self.trees.is_empty() {
            return Err(ForestError::Invalid("Forest has no trees".to_string()));
        }
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            tree.validate(tree_idx, self.feature_len, self.n_classes)
                .map_err(ForestError::Invalid)?;
        }
        Ok(())
    }

    /// Load a model from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, ForestError> {
        let bytes = std::fs::read(path).map_err(|source| ForestError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let model: Self = serde_json::from_slice(&bytes).map_err(|source| ForestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        model.validate()?;
        Ok(model)
    }

    /// Predict class probabilities for a feature vector.
    ///
    /// The result is the mean of the leaf distributions across all trees.
    pub fn predict_proba(&self, features: &[f32]) -> Vec<f32> {
        let mut proba = vec![0.0f32; self.n_classes];
        if self.trees.is_empty() {
            return proba;
        }
        for tree in &self.trees {
            for &(class, p) in tree.leaf_proba(features) {
                if let Some(slot) = proba.get_mut(class as usize) {
                    *slot += p;
                }
            }
        }
        let scale = 1.0 / self.trees.len() as f32;
        for p in &mut proba {
            *p *= scale;
        }
        proba
    }

    /// Predict the most likely class index for a feature vector.
    pub fn predict_class_index(&self, features: &[f32]) -> usize {
        argmax(&self.predict_proba(features))
    }
}

fn argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (idx, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = idx;
        }
    }
    best_idx
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_split_tree() -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature_index: 0,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf {
                    proba: vec![(0, 1.0)],
                },
                TreeNode::Leaf {
                    proba: vec![(1, 0.75), (2, 0.25)],
                },
            ],
        }
    }

    fn forest(trees: Vec<DecisionTree>) -> RandomForestModel {
        RandomForestModel {
            model_version: FOREST_MODEL_VERSION,
            feature_len: 1,
            n_classes: 3,
            seed: 0,
            trees,
        }
    }

    #[test]
    fn tree_routes_on_threshold() {
        let tree = one_split_tree();
        assert_eq!(tree.leaf_proba(&[0.5]), &[(0, 1.0)]);
        assert_eq!(tree.leaf_proba(&[1.0]), &[(1, 0.75), (2, 0.25)]);
        assert_eq!(tree.leaf_proba(&[]), &[(0, 1.0)]);
    }

    #[test]
    fn forest_averages_leaf_distributions() {
        let constant = DecisionTree {
            nodes: vec![TreeNode::Leaf {
                proba: vec![(2, 1.0)],
            }],
        };
        let model = forest(vec![one_split_tree(), constant]);
        let proba = model.predict_proba(&[1.0]);
        assert_eq!(proba, vec![0.0, 0.375, 0.625]);
        assert_eq!(model.predict_class_index(&[1.0]), 2);
        assert_eq!(model.predict_class_index(&[0.0]), 0);
    }

    #[test]
    fn validate_rejects_backward_children() {
        let tree = DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature_index: 0,
                    threshold: 0.5,
                    left: 0,
                    right: 1,
                },
                TreeNode::Leaf { proba: vec![] },
            ],
        };
        assert!(matches!(
            forest(vec![tree]).validate(),
            Err(ForestError::Invalid(_))
        ));
    }

    #[test]
    fn validate_rejects_unknown_class_and_feature() {
        let bad_class = DecisionTree {
            nodes: vec![TreeNode::Leaf {
                proba: vec![(3, 1.0)],
            }],
        };
        assert!(forest(vec![bad_class]).validate().is_err());

        let mut bad_feature = one_split_tree();
        if let TreeNode::Split { feature_index, .. } = &mut bad_feature.nodes[0] {
            *feature_index = 4;
        }
        assert!(forest(vec![bad_feature]).validate().is_err());
        assert!(forest(vec![one_split_tree()]).validate().is_ok());
    }

    #[test]
    fn json_round_trip_preserves_model() {
        let model = forest(vec![one_split_tree()]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forest.json");
        std::fs::write(&path, serde_json::to_vec(&model).unwrap()).unwrap();
        assert_eq!(RandomForestModel::load_json(&path).unwrap(), model);
    }
}
