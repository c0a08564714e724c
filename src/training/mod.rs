//! Model training and evaluation

pub mod classifier;
pub mod decision_tree;
pub mod knn;
pub mod metrics;
pub mod neural_network;
pub mod random_forest;

pub use classifier::{ContentBasedClassifier, EvalKind, TrainedModel};
pub use decision_tree::DecisionTree;
pub use knn::{KnnClassifier, KnnConfig};
pub use metrics::{FoldMetrics, METRIC_NAMES};
pub use neural_network::{MlpClassifier, MlpConfig};
pub use random_forest::RandomForest;
