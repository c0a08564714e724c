//! Content-based classifier adapter
//!
//! Wraps one estimator family behind a single train/test/report lifecycle:
//! one model is trained per cross-validation fold, each fold's predictions
//! are scored, the fold scores are averaged, one fold model is promoted to
//! best, and that model is evaluated once on the held-out test partition.
//! Every metric set is persisted as a JSON file under the results directory.

use crate::config::{ModelKind, PipelineConfig};
use crate::error::{CinematchError, Result};
use crate::training::knn::{KnnClassifier, KnnConfig};
use crate::training::metrics::FoldMetrics;
use crate::training::neural_network::{MlpClassifier, MlpConfig};
use crate::training::random_forest::RandomForest;
use ndarray::{Array1, Array2};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

/// Which evaluation a prediction or metric set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalKind {
    /// A cross-validation fold, evaluated with the most recently trained model
    Fold,
    /// The held-out test partition, evaluated with the best fold model
    Test,
}

/// A trained estimator of one of the supported families
#[derive(Debug, Clone)]
pub enum TrainedModel {
    Knn(KnnClassifier),
    RandomForest(RandomForest),
    NeuralNet(MlpClassifier),
}

impl TrainedModel {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::Knn(m) => m.predict(x),
            TrainedModel::RandomForest(m) => m.predict(x),
            TrainedModel::NeuralNet(m) => m.predict(x),
        }
    }
}

/// Metric file payload
#[derive(Debug, Serialize)]
struct MetricsRecord<'a> {
    model: &'a str,
    classification: &'a str,
    evaluation: &'a str,
    metrics: std::collections::BTreeMap<String, f64>,
}

/// One estimator family's cross-validation lifecycle
#[derive(Debug)]
pub struct ContentBasedClassifier {
    kind: ModelKind,
    classes: Vec<i64>,
    models: Vec<TrainedModel>,
    fold_metrics: Vec<FoldMetrics>,
    avg_metrics: Option<FoldMetrics>,
    test_metrics: Option<FoldMetrics>,
    best_model: Option<usize>,
}

impl ContentBasedClassifier {
    pub fn new(kind: ModelKind, config: &PipelineConfig) -> Self {
        Self {
            kind,
            classes: config.classification.classes(),
            models: Vec::new(),
            fold_metrics: Vec::new(),
            avg_metrics: None,
            test_metrics: None,
            best_model: None,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Train one model on the given fold's training data and append it to the
    /// fold model list.
    pub fn train(
        &mut self,
        config: &PipelineConfig,
        x_train: &Array2<f64>,
        y_train: &Array1<f64>,
    ) -> Result<()> {
        debug!(
            model = self.model_name(),
            rows = x_train.nrows(),
            "training fold model"
        );

        let model = match self.kind {
            ModelKind::Knn => {
                let mut knn = KnnClassifier::new(KnnConfig {
                    n_neighbors: config.knn_neighbors,
                    ..Default::default()
                });
                knn.fit(x_train, y_train)?;
                TrainedModel::Knn(knn)
            }
            ModelKind::Rf => {
                let mut rf = RandomForest::new(config.rf_estimators)
                    .with_random_state(config.random_seed);
                if let Some(depth) = config.rf_max_depth {
                    rf = rf.with_max_depth(depth);
                }
                rf.fit(x_train, y_train)?;
                TrainedModel::RandomForest(rf)
            }
            ModelKind::Dnn => {
                let mut mlp = MlpClassifier::new(MlpConfig {
                    hidden_layers: config.dnn_hidden_layers.clone(),
                    learning_rate: config.dnn_learning_rate,
                    max_epochs: config.dnn_epochs,
                    batch_size: config.dnn_batch_size,
                    random_state: Some(config.random_seed),
                    ..Default::default()
                });
                mlp.fit(x_train, y_train)?;
                TrainedModel::NeuralNet(mlp)
            }
        };

        self.models.push(model);
        Ok(())
    }

    /// Predict labels for an evaluation set.
    ///
    /// `Fold` evaluations use the most recently trained model; `Test` uses the
    /// model promoted by `find_best_model`.
    pub fn test(&self, x: &Array2<f64>, kind: EvalKind) -> Result<Array1<f64>> {
        let model = match kind {
            EvalKind::Fold => self.models.last().ok_or_else(|| {
                CinematchError::EmptyResult("no fold model has been trained".to_string())
            })?,
            EvalKind::Test => {
                let idx = self.best_model.ok_or_else(|| {
                    CinematchError::EmptyResult(
                        "no best model selected; run find_best_model first".to_string(),
                    )
                })?;
                &self.models[idx]
            }
        };
        model.predict(x)
    }

    /// Score predictions and record the metric set under the evaluation kind
    pub fn get_results(
        &mut self,
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        kind: EvalKind,
    ) -> Result<FoldMetrics> {
        let metrics = FoldMetrics::compute(y_true, y_pred, &self.classes)?;
        match kind {
            EvalKind::Fold => self.fold_metrics.push(metrics.clone()),
            EvalKind::Test => self.test_metrics = Some(metrics.clone()),
        }
        Ok(metrics)
    }

    /// Average the recorded fold metric sets and persist the result
    pub fn get_fold_avg_result(&mut self, config: &PipelineConfig) -> Result<FoldMetrics> {
        let avg = FoldMetrics::average(&self.fold_metrics)?;
        self.avg_metrics = Some(avg.clone());
        self.write_metrics_file(config, &avg, "avg", self.avg_file_name(config))?;
        info!(
            model = self.model_name(),
            folds = self.fold_metrics.len(),
            "averaged fold results"
        );
        Ok(avg)
    }

    /// Promote the fold model with the highest optimized metric.
    ///
    /// Ties keep the earliest fold. Errors if no fold has been scored or the
    /// configured metric name is unknown.
    pub fn find_best_model(&mut self, config: &PipelineConfig) -> Result<usize> {
        if self.fold_metrics.is_empty() {
            return Err(CinematchError::EmptyResult(
                "no fold metrics recorded; cannot select a best model".to_string(),
            ));
        }

        let metric_name = config.metric_to_optimize.as_str();
        let mut best_idx = 0usize;
        let mut best_value = f64::NEG_INFINITY;
        for (idx, metrics) in self.fold_metrics.iter().enumerate() {
            let value = metrics.metric(metric_name).ok_or_else(|| {
                CinematchError::ConfigError(format!("unknown metric to optimize: {metric_name}"))
            })?;
            if value > best_value {
                best_value = value;
                best_idx = idx;
            }
        }

        info!(
            model = self.model_name(),
            fold = best_idx,
            metric = metric_name,
            value = best_value,
            "selected best fold model"
        );
        self.best_model = Some(best_idx);
        Ok(best_idx)
    }

    /// Persist the most recent fold's metric set
    pub fn write_fold_results_to_file(&self, config: &PipelineConfig) -> Result<PathBuf> {
        let fold_idx = self.fold_metrics.len().checked_sub(1).ok_or_else(|| {
            CinematchError::EmptyResult("no fold metrics to write".to_string())
        })?;
        let metrics = &self.fold_metrics[fold_idx];
        let file_name = format!(
            "{}_{}_fold_{fold_idx}.json",
            self.model_name(),
            config.classification.as_str()
        );
        self.write_metrics_file(config, metrics, "fold", file_name)
    }

    /// Persist the held-out test metric set
    pub fn write_test_results_to_file(&self, config: &PipelineConfig) -> Result<PathBuf> {
        let metrics = self.test_metrics.as_ref().ok_or_else(|| {
            CinematchError::EmptyResult("no test metrics to write".to_string())
        })?;
        let file_name = format!(
            "{}_{}_test.json",
            self.model_name(),
            config.classification.as_str()
        );
        self.write_metrics_file(config, metrics, "test", file_name)
    }

    pub fn fold_count(&self) -> usize {
        self.fold_metrics.len()
    }

    pub fn avg_metrics(&self) -> Option<&FoldMetrics> {
        self.avg_metrics.as_ref()
    }

    pub fn test_metrics(&self) -> Option<&FoldMetrics> {
        self.test_metrics.as_ref()
    }

    pub fn best_model(&self) -> Option<usize> {
        self.best_model
    }

    fn avg_file_name(&self, config: &PipelineConfig) -> String {
        format!(
            "{}_{}_avg.json",
            self.model_name(),
            config.classification.as_str()
        )
    }

    fn write_metrics_file(
        &self,
        config: &PipelineConfig,
        metrics: &FoldMetrics,
        evaluation: &str,
        file_name: String,
    ) -> Result<PathBuf> {
        let results_dir = config.results_dir();
        fs::create_dir_all(&results_dir)?;

        let record = MetricsRecord {
            model: self.model_name(),
            classification: config.classification.as_str(),
            evaluation,
            metrics: metrics.as_map(),
        };
        let path = results_dir.join(file_name);
        let json = serde_json::to_string_pretty(&record)?;
        fs::write(&path, json)?;
        debug!(path = %path.display(), "wrote metrics file");
        Ok(path)
    }
}
