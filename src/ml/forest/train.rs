use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::model::{DecisionTree, FOREST_MODEL_VERSION, ForestError, RandomForestModel, TreeNode};

/// Training hyperparameters for the forest.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of trees.
    pub n_estimators: usize,
    /// Features considered per split; `None` means `round(sqrt(n_features))`.
    pub max_features: Option<usize>,
    /// Minimum samples a node needs before it may split.
    pub min_samples_split: usize,
    /// Maximum tree depth; `None` grows until leaves are pure.
    pub max_depth: Option<usize>,
    /// Seed for bootstrap and feature sampling.
    pub seed: u64,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_features: None,
            min_samples_split: 2,
            max_depth: None,
            seed: 42,
        }
    }
}

/// In-memory dataset used for training and evaluation.
#[derive(Debug, Clone)]
pub struct TrainDataset {
    /// Number of `f32` values in each feature vector.
    pub feature_len: usize,
    /// Number of distinct classes; labels are `0..n_classes`.
    pub n_classes: usize,
    /// Feature matrix, row-major.
    pub x: Vec<Vec<f32>>,
    /// Class indices aligned with `x`.
    pub y: Vec<usize>,
}

impl TrainDataset {
    fn check(&self) -> Result<(), ForestError> {
        if self.x.len() != self.y.len() {
            return Err(ForestError::MismatchedLengths {
                x: self.x.len(),
                y: self.y.len(),
            });
        }
        if self.x.is_empty() {
            return Err(ForestError::EmptyDataset);
        }
        if self.n_classes == 0 {
            return Err(ForestError::NoClasses);
        }
        // Nodes store feature and class indices as u16.
        if self.feature_len > u16::MAX as usize || self.n_classes > u16::MAX as usize {
            return Err(ForestError::Invalid(format!(
                "{} features / {} classes exceed the model's index range",
                self.feature_len, self.n_classes
            )));
        }
        if let Some(&label) = self.y.iter().find(|&&label| label >= self.n_classes) {
            return Err(ForestError::LabelOutOfRange {
                label,
                n_classes: self.n_classes,
            });
        }
        if let Some((row, values)) = self
            .x
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != self.feature_len)
        {
            return Err(ForestError::RowLength {
                row,
                len: values.len(),
                expected: self.feature_len,
            });
        }
        Ok(())
    }
}

/// Train a random forest of Gini-split CART trees on bootstrap samples.
pub fn train_random_forest(
    dataset: &TrainDataset,
    options: &TrainOptions,
) -> Result<RandomForestModel, ForestError> {
    dataset.check()?;
    let n = dataset.x.len();
    let max_features = options
        .max_features
        .unwrap_or_else(|| (dataset.feature_len as f64).sqrt().round() as usize)
        .clamp(1, dataset.feature_len.max(1));

    let mut seeder = StdRng::seed_from_u64(options.seed);
    let mut trees = Vec::with_capacity(options.n_estimators.max(1));
    for _ in 0..options.n_estimators.max(1) {
        let mut rng = StdRng::seed_from_u64(seeder.random::<u64>());
        let mut samples: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
        let builder = TreeBuilder {
            x: &dataset.x,
            y: &dataset.y,
            n_classes: dataset.n_classes,
            feature_len: dataset.feature_len,
            max_features,
            min_samples_split: options.min_samples_split.max(2),
            max_depth: options.max_depth,
            nodes: Vec::new(),
        };
        trees.push(builder.build(&mut samples, &mut rng));
    }

    Ok(RandomForestModel {
        model_version: FOREST_MODEL_VERSION,
        feature_len: dataset.feature_len,
        n_classes: dataset.n_classes,
        seed: options.seed,
        trees,
    })
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f32>],
    y: &'a [usize],
    n_classes: usize,
    feature_len: usize,
    max_features: usize,
    min_samples_split: usize,
    max_depth: Option<usize>,
    nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature_index: usize,
    threshold: f32,
    score: f64,
}

impl TreeBuilder<'_> {
    fn build(mut self, samples: &mut [usize], rng: &mut StdRng) -> DecisionTree {
        self.grow(samples, 0, rng);
        DecisionTree { nodes: self.nodes }
    }

    fn grow(&mut self, samples: &mut [usize], depth: usize, rng: &mut StdRng) -> u32 {
        let node_idx = self.nodes.len() as u32;
        let counts = self.class_counts(samples);
        let is_pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if is_pure || depth_reached || samples.len() < self.min_samples_split {
            self.nodes.push(leaf(&counts, samples.len()));
            return node_idx;
        }
        let Some(split) = self.best_split(samples, &counts, rng) else {
            self.nodes.push(leaf(&counts, samples.len()));
            return node_idx;
        };

        // Placeholder until both children have been allocated.
        self.nodes.push(TreeNode::Leaf { proba: Vec::new() });
        let mid = partition(samples, |&i| self.x[i][split.feature_index] <= split.threshold);
        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.grow(left_samples, depth + 1, rng);
        let right = self.grow(right_samples, depth + 1, rng);
        self.nodes[node_idx as usize] = TreeNode::Split {
            feature_index: split.feature_index as u16,
            threshold: split.threshold,
            left,
            right,
        };
        node_idx
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<u32> {
        let mut counts = vec![0u32; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Search `max_features` random features, drawing more while none of them
    /// can separate the node.
    fn best_split(&self, samples: &[usize], counts: &[u32], rng: &mut StdRng) -> Option<Split> {
        let mut features: Vec<usize> = (0..self.feature_len).collect();
        features.shuffle(rng);

        let mut best: Option<Split> = None;
        for (visited, &feature_index) in features.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }
            let Some(split) = self.best_split_for_feature(samples, counts, feature_index) else {
                continue;
            };
            if best.is_none_or(|current| split.score < current.score) {
                best = Some(split);
            }
        }
        best
    }

    fn best_split_for_feature(
        &self,
        samples: &[usize],
        counts: &[u32],
        feature_index: usize,
    ) -> Option<Split> {
        let mut column: Vec<(f32, usize)> = samples
            .iter()
            .map(|&i| (self.x[i][feature_index], self.y[i]))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));
        if column.first()?.0 == column.last()?.0 {
            return None;
        }

        let total = column.len();
        let mut left = vec![0u32; self.n_classes];
        let mut right = counts.to_vec();
        let mut best: Option<Split> = None;
        for pos in 0..total - 1 {
            let (value, label) = column[pos];
            left[label] += 1;
            right[label] -= 1;
            let next = column[pos + 1].0;
            if value == next {
                continue;
            }
            let n_left = (pos + 1) as f64;
            let n_right = (total - pos - 1) as f64;
            let score = weighted_gini(&left, n_left) + weighted_gini(&right, n_right);
            if best.is_none_or(|current| score < current.score) {
                let mut threshold = value + (next - value) / 2.0;
                // Guard against midpoints rounding up onto `next`.
                if threshold >= next {
                    threshold = value;
                }
                best = Some(Split {
                    feature_index,
                    threshold,
                    score,
                });
            }
        }
        best
    }
}

/// `n * gini(counts)`, i.e. `n - sum(c^2) / n`.
fn weighted_gini(counts: &[u32], n: f64) -> f64 {
    if n == 0.0 {
        return 0.0;
    }
    let sum_sq: f64 = counts.iter().map(|&c| (c as f64) * (c as f64)).sum();
    n - sum_sq / n
}

fn leaf(counts: &[u32], total: usize) -> TreeNode {
    let total = total.max(1) as f32;
    let proba = counts
        .iter()
        .enumerate()
        .filter(|(_, c)| **c > 0)
        .map(|(class, &c)| (class as u16, c as f32 / total))
        .collect();
    TreeNode::Leaf { proba }
}

/// Reorder `items` so everything matching `pred` comes first; returns the split point.
fn partition<T, F: Fn(&T) -> bool>(items: &mut [T], pred: F) -> usize {
    let mut mid = 0usize;
    for idx in 0..items.len() {
        if pred(&items[idx]) {
            items.swap(mid, idx);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_free_dataset() -> TrainDataset {
        // Class 0 when feature 0 is set, class 1 when feature 1 is set, class 2 otherwise.
        let mut x = Vec::new();
        let mut y = Vec::new();
        for _ in 0..20 {
            x.push(vec![1.0, 0.0, 0.0]);
            y.push(0);
            x.push(vec![0.0, 1.0, 0.0]);
            y.push(1);
            x.push(vec![0.0, 0.0, 1.0]);
            y.push(2);
        }
        TrainDataset {
            feature_len: 3,
            n_classes: 3,
            x,
            y,
        }
    }

    fn small_options() -> TrainOptions {
        TrainOptions {
            n_estimators: 15,
            ..TrainOptions::default()
        }
    }

    #[test]
    fn learns_separable_classes() {
        let model = train_random_forest(&xor_free_dataset(), &small_options()).unwrap();
        model.validate().unwrap();
        assert_eq!(model.trees.len(), 15);
        assert_eq!(model.predict_class_index(&[1.0, 0.0, 0.0]), 0);
        assert_eq!(model.predict_class_index(&[0.0, 1.0, 0.0]), 1);
        assert_eq!(model.predict_class_index(&[0.0, 0.0, 1.0]), 2);
    }

    #[test]
    fn probabilities_sum_to_one() {
        let model = train_random_forest(&xor_free_dataset(), &small_options()).unwrap();
        for row in [[0.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 1.0]] {
            let sum: f32 = model.predict_proba(&row).iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "sum was {sum}");
        }
    }

    #[test]
    fn same_seed_gives_identical_forest() {
        let dataset = xor_free_dataset();
        let a = train_random_forest(&dataset, &small_options()).unwrap();
        let b = train_random_forest(&dataset, &small_options()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn splits_continuous_feature_at_midpoint() {
        let dataset = TrainDataset {
            feature_len: 1,
            n_classes: 2,
            x: vec![vec![10.0], vec![20.0], vec![60.0], vec![70.0]],
            y: vec![0, 0, 1, 1],
        };
        let builder = TreeBuilder {
            x: &dataset.x,
            y: &dataset.y,
            n_classes: 2,
            feature_len: 1,
            max_features: 1,
            min_samples_split: 2,
            max_depth: None,
            nodes: Vec::new(),
        };
        let split = builder
            .best_split_for_feature(&[0, 1, 2, 3], &[2, 2], 0)
            .unwrap();
        assert_eq!(split.threshold, 40.0);
        assert_eq!(split.score, 0.0);
    }

    #[test]
    fn rejects_empty_and_mismatched_datasets() {
        let mut dataset = xor_free_dataset();
        dataset.y.pop();
        assert!(matches!(
            train_random_forest(&dataset, &small_options()),
            Err(ForestError::MismatchedLengths { .. })
        ));
        let empty = TrainDataset {
            feature_len: 3,
            n_classes: 3,
            x: Vec::new(),
            y: Vec::new(),
        };
        assert!(matches!(
            train_random_forest(&empty, &small_options()),
            Err(ForestError::EmptyDataset)
        ));
    }

    #[test]
    fn single_class_dataset_yields_constant_leaves() {
        let dataset = TrainDataset {
            feature_len: 2,
            n_classes: 1,
            x: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            y: vec![0, 0],
        };
        let model = train_random_forest(&dataset, &small_options()).unwrap();
        assert_eq!(model.predict_proba(&[0.0, 0.0]), vec![1.0]);
    }
}
