//! Random forest classifier
//!
//! Bootstrap-bagged CART trees with sqrt-feature subsampling per split and
//! majority voting. Trees are built sequentially with per-tree derived seeds
//! so a run is reproducible from one configured seed.

use crate::error::{CinematchError, Result};
use crate::training::decision_tree::DecisionTree;
use ndarray::{Array1, Array2, Axis};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Random forest classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: Option<u64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: None,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

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

        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);
        let base_seed = self.random_state.unwrap_or(42);

        let mut trees = Vec::with_capacity(self.n_estimators);
        for tree_idx in 0..self.n_estimators {
            let seed = base_seed.wrapping_add(tree_idx as u64);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);

            // Bootstrap sample with replacement
            let sample_indices: Vec<usize> = (0..n_samples)
                .map(|_| (rng.next_u64() as usize) % n_samples)
                .collect();

            let x_boot = x.select(Axis(0), &sample_indices);
            let y_boot: Array1<f64> =
                Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

            let mut tree = DecisionTree::new()
                .with_min_samples_split(self.min_samples_split)
                .with_min_samples_leaf(self.min_samples_leaf)
                .with_max_features(max_features)
                .with_random_state(seed);
            if let Some(d) = self.max_depth {
                tree = tree.with_max_depth(d);
            }
            tree.fit(&x_boot, &y_boot)?;
            trees.push(tree);
        }

        self.trees = trees;
        Ok(self)
    }

    /// Predict by majority vote across trees
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(CinematchError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<_>>()?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let mut votes: HashMap<i64, usize> = HashMap::new();
                for preds in &all_predictions {
                    *votes.entry(preds[i].round() as i64).or_insert(0) += 1;
                }
                votes
                    .into_iter()
                    .max_by_key(|(_, count)| *count)
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Number of fitted trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
