//! CART classification tree
//!
//! Building block for the random forest: Gini-impurity binary splits over
//! midpoint thresholds, with an optional random feature subset per split.

use crate::error::{CinematchError, Result};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        class: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Classification decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Number of features considered per split; None means all
    pub max_features: Option<usize>,
    pub random_state: Option<u64>,
    n_features: usize,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(CinematchError::ShapeError {
                expected: format!("labels length = {n_samples}"),
                actual: format!("labels length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(CinematchError::EmptyResult(
                "cannot fit on empty training data".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(42));
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut rng));
        Ok(self)
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(CinematchError::ModelNotFitted)?;

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let mut node = root;
                loop {
                    match node {
                        TreeNode::Leaf { class, .. } => return *class,
                        TreeNode::Split {
                            feature_idx,
                            threshold,
                            left,
                            right,
                            ..
                        } => {
                            node = if row[*feature_idx] <= *threshold {
                                left
                            } else {
                                right
                            };
                        }
                    }
                }
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let should_stop = n_samples < self.min_samples_split
            || self.max_depth.is_some_and(|d| depth >= d)
            || is_pure(&y_subset);

        if should_stop {
            return TreeNode::Leaf {
                class: majority_class(&y_subset),
                n_samples,
            };
        }

        if let Some((best_feature, best_threshold)) = self.find_best_split(x, y, indices, rng) {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return TreeNode::Leaf {
                    class: majority_class(&y_subset),
                    n_samples,
                };
            }

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, rng));
            let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, rng));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
            }
        } else {
            TreeNode::Leaf {
                class: majority_class(&y_subset),
                n_samples,
            }
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let candidate_features: Vec<usize> = match self.max_features {
            Some(m) if m < n_features => {
                let mut all: Vec<usize> = (0..n_features).collect();
                all.shuffle(rng);
                all.truncate(m);
                all
            }
            _ => (0..n_features).collect(),
        };

        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = gini_impurity(&y_subset);
        let n = indices.len() as f64;

        let mut best: Option<(usize, f64)> = None;
        let mut best_gain = 0.0f64;

        for &feature_idx in &candidate_features {
            let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature_idx]]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            values.dedup();

            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;

                let mut left_counts: HashMap<i64, usize> = HashMap::new();
                let mut right_counts: HashMap<i64, usize> = HashMap::new();
                let mut left_n = 0usize;
                let mut right_n = 0usize;

                for &idx in indices {
                    let class = y[idx].round() as i64;
                    if x[[idx, feature_idx]] <= threshold {
                        left_n += 1;
                        *left_counts.entry(class).or_insert(0) += 1;
                    } else {
                        right_n += 1;
                        *right_counts.entry(class).or_insert(0) += 1;
                    }
                }

                if left_n < self.min_samples_leaf || right_n < self.min_samples_leaf {
                    continue;
                }

                let weighted_impurity = (left_n as f64 * gini_from_counts(left_n, &left_counts)
                    + right_n as f64 * gini_from_counts(right_n, &right_counts))
                    / n;

                let gain = parent_impurity - weighted_impurity;
                if gain > best_gain {
                    best_gain = gain;
                    best = Some((feature_idx, threshold));
                }
            }
        }

        best
    }
}

fn gini_impurity(y: &[f64]) -> f64 {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &val in y {
        *counts.entry(val.round() as i64).or_insert(0) += 1;
    }
    gini_from_counts(y.len(), &counts)
}

fn gini_from_counts(n: usize, counts: &HashMap<i64, usize>) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .values()
        .map(|&c| (c as f64 / n).powi(2))
        .sum::<f64>()
}

fn is_pure(y: &[f64]) -> bool {
    y.first()
        .map(|&first| y.iter().all(|&v| (v - first).abs() < 1e-10))
        .unwrap_or(true)
}

fn majority_class(y: &[f64]) -> f64 {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for &val in y {
        *counts.entry(val.round() as i64).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(class, _)| class as f64)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separable_classes() {
        let x = array![[0.0, 0.0], [0.1, 0.1], [0.2, 0.2], [1.0, 1.0], [1.1, 1.1], [1.2, 1.2]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();

        let predictions = tree.predict(&x).unwrap();
        assert_eq!(predictions, y);
    }

    #[test]
    fn test_max_depth_limits_tree() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 1.0, 0.0, 1.0];

        let mut tree = DecisionTree::new().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        // Depth 1 means at most one split
        match tree.root.as_ref().unwrap() {
            TreeNode::Leaf { .. } => {}
            TreeNode::Split { left, right, .. } => {
                assert!(matches!(**left, TreeNode::Leaf { .. }));
                assert!(matches!(**right, TreeNode::Leaf { .. }));
            }
        }
    }

    #[test]
    fn test_not_fitted() {
        let tree = DecisionTree::new();
        let x = array![[1.0]];
        assert!(matches!(
            tree.predict(&x),
            Err(CinematchError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_pure_labels_give_single_leaf() {
        let x = array![[1.0], [2.0], [3.0]];
        let y = array![1.0, 1.0, 1.0];

        let mut tree = DecisionTree::new();
        tree.fit(&x, &y).unwrap();
        assert!(matches!(
            tree.root.as_ref().unwrap(),
            TreeNode::Leaf { class, .. } if (*class - 1.0).abs() < 1e-10
        ));
    }

    #[test]
    fn test_gini() {
        assert!((gini_impurity(&[0.0, 0.0, 1.0, 1.0]) - 0.5).abs() < 1e-12);
        assert!(gini_impurity(&[1.0, 1.0, 1.0]).abs() < 1e-12);
    }
}
