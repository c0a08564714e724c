//! Feed-forward neural network classifier
//!
//! A multi-layer perceptron with ReLU hidden layers and a softmax output,
//! trained by mini-batch gradient descent with momentum on the one-hot
//! cross-entropy loss.

use crate::error::{CinematchError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Hidden-layer activation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Activation {
    #[default]
    ReLU,
    Sigmoid,
    Tanh,
}

/// MLP hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpConfig {
    pub hidden_layers: Vec<usize>,
    pub activation: Activation,
    pub learning_rate: f64,
    pub max_epochs: usize,
    pub batch_size: usize,
    /// L2 regularization strength
    pub alpha: f64,
    pub momentum: f64,
    pub random_state: Option<u64>,
}

impl Default for MlpConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![128, 64],
            activation: Activation::ReLU,
            learning_rate: 0.001,
            max_epochs: 50,
            batch_size: 32,
            alpha: 0.0001,
            momentum: 0.9,
            random_state: Some(42),
        }
    }
}

/// Multi-layer perceptron classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlpClassifier {
    config: MlpConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    classes: Vec<i64>,
    is_fitted: bool,
}

impl MlpClassifier {
    pub fn new(config: MlpConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    /// Fit the network
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
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

        let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
        classes.sort_unstable();
        classes.dedup();
        self.classes = classes;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_state.unwrap_or(42));
        self.initialize_weights(&mut rng);

        let y_onehot = self.to_onehot(y);
        let batch_size = self.config.batch_size.max(1);

        let mut velocities_w: Vec<Array2<f64>> = self
            .weights
            .iter()
            .map(|w| Array2::zeros(w.raw_dim()))
            .collect();
        let mut velocities_b: Vec<Array1<f64>> = self
            .biases
            .iter()
            .map(|b| Array1::zeros(b.len()))
            .collect();

        for _epoch in 0..self.config.max_epochs {
            let mut indices: Vec<usize> = (0..n_samples).collect();
            indices.shuffle(&mut rng);

            for batch_start in (0..n_samples).step_by(batch_size) {
                let batch_end = (batch_start + batch_size).min(n_samples);
                let batch_indices = &indices[batch_start..batch_end];

                let x_batch = gather_rows(x, batch_indices);
                let y_batch = gather_rows(&y_onehot, batch_indices);

                let (activations, z_values) = self.forward(&x_batch);
                let gradients = self.backward(&y_batch, &activations, &z_values);

                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * self.config.momentum
                        - &grad_w * self.config.learning_rate;
                    velocities_b[i] = &velocities_b[i] * self.config.momentum
                        - &grad_b * self.config.learning_rate;

                    self.weights[i] = &self.weights[i] + &velocities_w[i];
                    self.biases[i] = &self.biases[i] + &velocities_b[i];

                    self.weights[i] =
                        &self.weights[i] * (1.0 - self.config.alpha * self.config.learning_rate);
                }
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(CinematchError::ModelNotFitted);
        }

        let (activations, _) = self.forward(x);
        let proba = activations.last().ok_or(CinematchError::ModelNotFitted)?;

        let predictions: Vec<f64> = proba
            .rows()
            .into_iter()
            .map(|row| {
                let max_idx = row
                    .iter()
                    .enumerate()
                    .max_by(|(_, a), (_, b)| {
                        a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                self.classes[max_idx] as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn initialize_weights(&mut self, rng: &mut ChaCha8Rng) {
        self.weights.clear();
        self.biases.clear();

        let mut layer_sizes = vec![self.n_features];
        layer_sizes.extend(&self.config.hidden_layers);
        layer_sizes.push(self.classes.len());

        for pair in layer_sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);

            // Xavier/Glorot initialization
            let scale = (2.0 / (n_in + n_out) as f64).sqrt();
            let weights: Vec<f64> = (0..n_in * n_out)
                .map(|_| rng.gen::<f64>() * 2.0 * scale - scale)
                .collect();

            self.weights.push(
                Array2::from_shape_vec((n_in, n_out), weights)
                    .expect("weight matrix dimensions are consistent by construction"),
            );
            self.biases.push(Array1::zeros(n_out));
        }
    }

    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::new();

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = activations
                .last()
                .expect("activations always seeded with the input")
                .dot(w)
                + b;
            z_values.push(z.clone());

            let a = if i < self.weights.len() - 1 {
                activate(&z, self.config.activation)
            } else {
                softmax(&z)
            };
            activations.push(a);
        }

        (activations, z_values)
    }

    fn backward(
        &self,
        y_onehot: &Array2<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = y_onehot.nrows() as f64;
        let mut gradients = Vec::new();

        // Softmax + cross-entropy gradient
        let last = activations
            .last()
            .expect("activations always seeded with the input");
        let mut delta = (last - y_onehot) / n;

        for i in (0..self.weights.len()).rev() {
            let a_prev = &activations[i];

            let grad_w = a_prev.t().dot(&delta);
            let grad_b = delta.sum_axis(Axis(0));
            gradients.push((grad_w, grad_b));

            if i > 0 {
                let z = &z_values[i - 1];
                delta =
                    delta.dot(&self.weights[i].t()) * activate_derivative(z, self.config.activation);
            }
        }

        gradients.reverse();
        gradients
    }

    fn to_onehot(&self, y: &Array1<f64>) -> Array2<f64> {
        let n = y.len();
        let mut onehot = Array2::zeros((n, self.classes.len()));
        for (i, &label) in y.iter().enumerate() {
            let class_idx = self
                .classes
                .iter()
                .position(|&c| c == label.round() as i64)
                .unwrap_or(0);
            onehot[[i, class_idx]] = 1.0;
        }
        onehot
    }
}

fn activate(z: &Array2<f64>, activation: Activation) -> Array2<f64> {
    match activation {
        Activation::ReLU => z.mapv(|v| v.max(0.0)),
        Activation::Sigmoid => z.mapv(|v| 1.0 / (1.0 + (-v).exp())),
        Activation::Tanh => z.mapv(|v| v.tanh()),
    }
}

fn activate_derivative(z: &Array2<f64>, activation: Activation) -> Array2<f64> {
    match activation {
        Activation::ReLU => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
        Activation::Sigmoid => z.mapv(|v| {
            let s = 1.0 / (1.0 + (-v).exp());
            s * (1.0 - s)
        }),
        Activation::Tanh => z.mapv(|v| {
            let t = v.tanh();
            1.0 - t * t
        }),
    }
}

fn softmax(z: &Array2<f64>) -> Array2<f64> {
    let mut result = z.clone();
    for mut row in result.rows_mut() {
        let max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp_sum: f64 = row.iter().map(|&v| (v - max).exp()).sum();
        for v in row.iter_mut() {
            *v = (*v - max).exp() / exp_sum;
        }
    }
    result
}

fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_classification_data() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_vec((100, 2), (0..200).map(|i| (i as f64) * 0.05).collect())
            .unwrap();
        let y: Array1<f64> = x
            .rows()
            .into_iter()
            .map(|row| if row[0] + row[1] > 5.0 { 1.0 } else { 0.0 })
            .collect();
        (x, y)
    }

    #[test]
    fn test_mlp_classifier_learns() {
        let (x, y) = create_classification_data();

        let config = MlpConfig {
            hidden_layers: vec![32, 16],
            max_epochs: 100,
            learning_rate: 0.01,
            ..Default::default()
        };
        let mut mlp = MlpClassifier::new(config);
        mlp.fit(&x, &y).unwrap();

        let predictions = mlp.predict(&x).unwrap();
        assert_eq!(predictions.len(), 100);

        let correct = y
            .iter()
            .zip(predictions.iter())
            .filter(|(yi, pi)| (*yi - *pi).abs() < 0.5)
            .count();
        let accuracy = correct as f64 / y.len() as f64;
        assert!(accuracy > 0.7, "accuracy ({accuracy}) should be above 70%");
    }

    #[test]
    fn test_mlp_not_fitted() {
        let mlp = MlpClassifier::new(MlpConfig::default());
        let x = Array2::zeros((1, 2));
        assert!(matches!(
            mlp.predict(&x),
            Err(CinematchError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_softmax_rows_sum_to_one() {
        let z = Array2::from_shape_vec((2, 3), vec![-1.0, 0.0, 1.0, -2.0, 0.5, 2.0]).unwrap();
        let s = softmax(&z);
        for row in s.rows() {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_activation_functions() {
        let z = Array2::from_shape_vec((1, 3), vec![-1.0, 0.0, 1.0]).unwrap();
        let relu = activate(&z, Activation::ReLU);
        assert_eq!(relu[[0, 0]], 0.0);
        assert_eq!(relu[[0, 2]], 1.0);

        let sigmoid = activate(&z, Activation::Sigmoid);
        assert!((sigmoid[[0, 1]] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_multiclass_labels_preserved() {
        // Labels 1..5 rather than 0-based: predictions must come from the
        // original label set
        let x = Array2::from_shape_vec((50, 1), (0..50).map(|i| i as f64).collect()).unwrap();
        let y: Array1<f64> = (0..50).map(|i| (i % 5 + 1) as f64).collect();

        let mut mlp = MlpClassifier::new(MlpConfig {
            hidden_layers: vec![8],
            max_epochs: 5,
            ..Default::default()
        });
        mlp.fit(&x, &y).unwrap();
        let predictions = mlp.predict(&x).unwrap();
        for p in predictions.iter() {
            assert!((1.0..=5.0).contains(p));
        }
    }
}
