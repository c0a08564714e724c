//! Typed pipeline configuration
//!
//! Every recognized option from the YAML properties file is an explicit field
//! with a default, so unknown keys and missing values fail at load time rather
//! than mid-run.

use crate::error::{CinematchError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Classification mode: binary like/dislike or five rating buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Binary,
    Multi,
}

impl Classification {
    /// Number of target classes
    pub fn n_classes(&self) -> usize {
        match self {
            Classification::Binary => 2,
            Classification::Multi => 5,
        }
    }

    /// The fixed class label set, in order
    pub fn classes(&self) -> Vec<i64> {
        match self {
            Classification::Binary => vec![0, 1],
            Classification::Multi => vec![1, 2, 3, 4, 5],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Binary => "binary",
            Classification::Multi => "multi",
        }
    }
}

/// Strategy for collapsing per-word embeddings into one vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Avg,
    Max,
}

/// Content-based classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Knn,
    Rf,
    Dnn,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Knn => "knn",
            ModelKind::Rf => "rf",
            ModelKind::Dnn => "dnn",
        }
    }
}

/// Pipeline configuration loaded from a YAML properties file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Base data directory; everything else is resolved against it
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_datasets_folder")]
    pub datasets_folder: String,

    /// Dataset name, e.g. "ml-latest-small"
    pub dataset: String,

    #[serde(default = "default_filenames")]
    pub filenames: Vec<String>,

    #[serde(rename = "dataset-file-extension", default = "default_extension")]
    pub dataset_file_extension: String,

    #[serde(default = "default_output_folder")]
    pub output_folder: String,

    #[serde(default = "default_results_folder")]
    pub results_folder: String,

    #[serde(default = "default_resources_folder")]
    pub resources_folder: String,

    /// GloVe embeddings file inside the resources folder
    pub embeddings_file: String,

    pub classification: Classification,

    #[serde(default = "default_aggregation")]
    pub aggregation: Aggregation,

    /// Number of cross-validation folds
    #[serde(rename = "cross-validation", default = "default_cv_folds")]
    pub cross_validation: usize,

    /// Metric used to pick the best fold model, maximized
    #[serde(rename = "metric-to-optimize", default = "default_metric")]
    pub metric_to_optimize: String,

    /// Which classifiers to run
    #[serde(default = "default_models")]
    pub models: Vec<ModelKind>,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_seed")]
    pub random_seed: u64,

    // Per-model hyperparameters
    #[serde(default = "default_knn_neighbors")]
    pub knn_neighbors: usize,

    #[serde(default = "default_rf_estimators")]
    pub rf_estimators: usize,

    #[serde(default)]
    pub rf_max_depth: Option<usize>,

    #[serde(default = "default_dnn_hidden_layers")]
    pub dnn_hidden_layers: Vec<usize>,

    #[serde(default = "default_dnn_epochs")]
    pub dnn_epochs: usize,

    #[serde(default = "default_dnn_learning_rate")]
    pub dnn_learning_rate: f64,

    #[serde(default = "default_dnn_batch_size")]
    pub dnn_batch_size: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_datasets_folder() -> String {
    "Datasets".to_string()
}
fn default_filenames() -> Vec<String> {
    ["links", "movies", "ratings", "tags"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_extension() -> String {
    ".csv".to_string()
}
fn default_output_folder() -> String {
    "output".to_string()
}
fn default_results_folder() -> String {
    "results".to_string()
}
fn default_resources_folder() -> String {
    "resources".to_string()
}
fn default_aggregation() -> Aggregation {
    Aggregation::Avg
}
fn default_cv_folds() -> usize {
    5
}
fn default_metric() -> String {
    "macro_f1".to_string()
}
fn default_models() -> Vec<ModelKind> {
    vec![ModelKind::Knn, ModelKind::Rf, ModelKind::Dnn]
}
fn default_test_fraction() -> f64 {
    0.2
}
fn default_seed() -> u64 {
    42
}
fn default_knn_neighbors() -> usize {
    5
}
fn default_rf_estimators() -> usize {
    100
}
fn default_dnn_hidden_layers() -> Vec<usize> {
    vec![128, 64]
}
fn default_dnn_epochs() -> usize {
    50
}
fn default_dnn_learning_rate() -> f64 {
    0.001
}
fn default_dnn_batch_size() -> usize {
    32
}

impl PipelineConfig {
    /// Load the configuration from a YAML properties file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CinematchError::ConfigError(format!(
                "cannot read properties file {}: {e}",
                path.display()
            ))
        })?;
        let config: PipelineConfig = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints the type system cannot express
    pub fn validate(&self) -> Result<()> {
        if self.cross_validation < 2 {
            return Err(CinematchError::ConfigError(format!(
                "cross-validation must be at least 2, got {}",
                self.cross_validation
            )));
        }
        if !(0.0..1.0).contains(&self.test_fraction) || self.test_fraction == 0.0 {
            return Err(CinematchError::ConfigError(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.models.is_empty() {
            return Err(CinematchError::ConfigError(
                "at least one model must be configured".to_string(),
            ));
        }
        if self.filenames.is_empty() {
            return Err(CinematchError::ConfigError(
                "filenames must list the dataset CSV files".to_string(),
            ));
        }
        Ok(())
    }

    /// Full path of one dataset CSV file
    pub fn dataset_file(&self, name: &str) -> PathBuf {
        self.data_dir
            .join(&self.datasets_folder)
            .join(&self.dataset)
            .join(format!("{name}{}", self.dataset_file_extension))
    }

    /// Full path of the GloVe embeddings file
    pub fn embeddings_path(&self) -> PathBuf {
        self.data_dir
            .join(&self.resources_folder)
            .join(&self.embeddings_file)
    }

    /// Output directory for persisted artifacts
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir.join(&self.output_folder)
    }

    /// Directory where per-run metric files are written
    pub fn results_dir(&self) -> PathBuf {
        self.output_dir().join(&self.results_folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_yaml(yaml: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(yaml.as_bytes()).unwrap();
        f
    }

    #[test]
    fn test_load_minimal_config() {
        let yaml = r#"
dataset: ml-latest-small
embeddings_file: glove.6B.50d.txt
classification: binary
"#;
        let f = write_yaml(yaml);
        let config = PipelineConfig::from_file(f.path()).unwrap();
        assert_eq!(config.datasets_folder, "Datasets");
        assert_eq!(config.filenames.len(), 4);
        assert_eq!(config.cross_validation, 5);
        assert_eq!(config.metric_to_optimize, "macro_f1");
        assert_eq!(config.classification, Classification::Binary);
        assert_eq!(config.aggregation, Aggregation::Avg);
        assert!((config.test_fraction - 0.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_full_config() {
        let yaml = r#"
dataset: ml-dev
embeddings_file: glove.6B.50d.txt
classification: multi
aggregation: max
cross-validation: 10
metric-to-optimize: accuracy
dataset-file-extension: .csv
models: [knn, rf]
knn_neighbors: 7
rf_estimators: 50
"#;
        let f = write_yaml(yaml);
        let config = PipelineConfig::from_file(f.path()).unwrap();
        assert_eq!(config.cross_validation, 10);
        assert_eq!(config.metric_to_optimize, "accuracy");
        assert_eq!(config.models, vec![ModelKind::Knn, ModelKind::Rf]);
        assert_eq!(config.knn_neighbors, 7);
        assert_eq!(config.rf_estimators, 50);
        assert_eq!(config.classification.n_classes(), 5);
    }

    #[test]
    fn test_invalid_cv_folds() {
        let yaml = r#"
dataset: ml-dev
embeddings_file: glove.6B.50d.txt
classification: binary
cross-validation: 1
"#;
        let f = write_yaml(yaml);
        let result = PipelineConfig::from_file(f.path());
        assert!(matches!(result, Err(CinematchError::ConfigError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = PipelineConfig::from_file(Path::new("/nonexistent/properties.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_dataset_file_path() {
        let yaml = r#"
dataset: ml-dev
embeddings_file: glove.6B.50d.txt
classification: binary
"#;
        let f = write_yaml(yaml);
        let config = PipelineConfig::from_file(f.path()).unwrap();
        let path = config.dataset_file("movies");
        assert!(path.ends_with("Datasets/ml-dev/movies.csv"));
    }
}
