//! K-Nearest Neighbors classifier
//!
//! Brute-force neighbor search over the stored training embeddings with a
//! max-heap partial sort, so prediction is O(n log k) per instance.

use crate::error::{CinematchError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Distance metric between embedding vectors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
    Cosine,
}

/// Neighbor vote weighting
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum WeightScheme {
    #[default]
    Uniform,
    /// Closer neighbors count more (inverse distance)
    Distance,
}

/// KNN hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnConfig {
    pub n_neighbors: usize,
    pub metric: DistanceMetric,
    pub weights: WeightScheme,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            metric: DistanceMetric::Euclidean,
            weights: WeightScheme::Uniform,
        }
    }
}

/// K-Nearest Neighbors classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnClassifier {
    config: KnnConfig,
    x_train: Option<Array2<f64>>,
    y_train: Option<Array1<f64>>,
}

impl KnnClassifier {
    pub fn new(config: KnnConfig) -> Self {
        Self {
            config,
            x_train: None,
            y_train: None,
        }
    }

    /// Default config with the given k
    pub fn with_k(k: usize) -> Self {
        Self::new(KnnConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    /// Fit stores the training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        if x.nrows() != y.len() {
            return Err(CinematchError::ShapeError {
                expected: format!("labels length = {}", x.nrows()),
                actual: format!("labels length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(CinematchError::EmptyResult(
                "cannot fit on empty training data".to_string(),
            ));
        }
        self.x_train = Some(x.clone());
        self.y_train = Some(y.clone());
        Ok(())
    }

    /// Predict class labels for every row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let x_train = self.x_train.as_ref().ok_or(CinematchError::ModelNotFitted)?;
        let y_train = self.y_train.as_ref().ok_or(CinematchError::ModelNotFitted)?;
        let k = self.config.n_neighbors.min(x_train.nrows());

        let predictions: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let point = row.to_vec();
                let neighbors = find_k_nearest(&point, x_train, y_train, k, self.config.metric);
                vote_classify(&neighbors, self.config.weights)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }
}

/// Max-heap entry keeping the k smallest distances
#[derive(PartialEq)]
struct DistLabel(f64, f64);

impl Eq for DistLabel {}
impl PartialOrd for DistLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for DistLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

fn find_k_nearest(
    point: &[f64],
    x_train: &Array2<f64>,
    y_train: &Array1<f64>,
    k: usize,
    metric: DistanceMetric,
) -> Vec<(f64, f64)> {
    let mut heap = BinaryHeap::with_capacity(k + 1);

    for (i, row) in x_train.rows().into_iter().enumerate() {
        let row_vec = row.to_vec();
        let dist = compute_distance(point, &row_vec, metric);
        if heap.len() < k {
            heap.push(DistLabel(dist, y_train[i]));
        } else if let Some(top) = heap.peek() {
            if dist < top.0 {
                heap.pop();
                heap.push(DistLabel(dist, y_train[i]));
            }
        }
    }

    heap.into_iter().map(|dl| (dl.0, dl.1)).collect()
}

fn compute_distance(a: &[f64], b: &[f64], metric: DistanceMetric) -> f64 {
    match metric {
        DistanceMetric::Euclidean => a
            .iter()
            .zip(b.iter())
            .map(|(ai, bi)| {
                let d = ai - bi;
                d * d
            })
            .sum::<f64>()
            .sqrt(),
        DistanceMetric::Manhattan => a.iter().zip(b.iter()).map(|(ai, bi)| (ai - bi).abs()).sum(),
        DistanceMetric::Cosine => {
            let mut dot = 0.0;
            let mut norm_a = 0.0;
            let mut norm_b = 0.0;
            for (ai, bi) in a.iter().zip(b.iter()) {
                dot += ai * bi;
                norm_a += ai * ai;
                norm_b += bi * bi;
            }
            let denom = norm_a.sqrt() * norm_b.sqrt();
            if denom > 0.0 {
                1.0 - (dot / denom)
            } else {
                1.0
            }
        }
    }
}

fn vote_classify(neighbors: &[(f64, f64)], weights: WeightScheme) -> f64 {
    let mut votes: HashMap<i64, f64> = HashMap::new();
    for &(dist, label) in neighbors {
        let weight = match weights {
            WeightScheme::Uniform => 1.0,
            WeightScheme::Distance => 1.0 / (dist + 1e-10),
        };
        *votes.entry(label.round() as i64).or_insert(0.0) += weight;
    }
    votes
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))
        .map(|(label, _)| label as f64)
        .unwrap_or(0.0)
}
