//! Experiment pipeline
//!
//! End-to-end run: load the dataset CSVs and GloVe embeddings, assemble the
//! content-based feature matrix, hold out a test partition, cross-validate
//! every configured classifier family over the training partition, pick each
//! family's best fold model and score it once on the held-out data.

use crate::config::PipelineConfig;
use crate::data::{DatasetLoader, GloveIndex};
use crate::error::{CinematchError, Result};
use crate::preprocessing::content_based::assemble_dataset;
use crate::preprocessing::split::{
    create_cross_validation_data, create_train_test_data, select_labels, select_rows,
};
use crate::training::classifier::{ContentBasedClassifier, EvalKind};
use crate::training::metrics::FoldMetrics;
use tracing::info;

/// One classifier family's final numbers for a run
#[derive(Debug, Clone)]
pub struct ModelReport {
    pub model: String,
    pub best_fold: usize,
    pub avg_metrics: FoldMetrics,
    pub test_metrics: FoldMetrics,
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct ExperimentReport {
    pub dataset: String,
    pub n_instances: usize,
    pub n_features: usize,
    pub reports: Vec<ModelReport>,
}

/// Run the full experiment described by the configuration
pub fn run_experiment(config: &PipelineConfig) -> Result<ExperimentReport> {
    info!(
        dataset = %config.dataset,
        classification = config.classification.as_str(),
        folds = config.cross_validation,
        "starting experiment"
    );

    let datasets = DatasetLoader::load_datasets(config)?;
    let movies = datasets
        .get("movies")
        .ok_or_else(|| CinematchError::DataError("movies dataset not loaded".to_string()))?;
    let tags = datasets
        .get("tags")
        .ok_or_else(|| CinematchError::DataError("tags dataset not loaded".to_string()))?;
    let ratings = datasets
        .get("ratings")
        .ok_or_else(|| CinematchError::DataError("ratings dataset not loaded".to_string()))?;

    let glove = GloveIndex::load(&config.embeddings_path())?;
    let prepared = assemble_dataset(config, movies, tags, ratings, &glove)?;
    let split = create_train_test_data(
        &prepared.input_data,
        &prepared.labels,
        config.test_fraction,
        config.random_seed,
    )?;
    let folds = create_cross_validation_data(&split.input_train, config.cross_validation)?;

    let mut reports = Vec::with_capacity(config.models.len());
    for &kind in &config.models {
        let mut classifier = ContentBasedClassifier::new(kind, config);
        info!(model = classifier.model_name(), "cross-validating");

        for fold in &folds {
            let x_train = select_rows(&split.input_train, &fold.train_indices);
            let y_train = select_labels(&split.labels_train, &fold.train_indices);
            let x_test = select_rows(&split.input_train, &fold.test_indices);
            let y_test = select_labels(&split.labels_train, &fold.test_indices);

            classifier.train(config, &x_train, &y_train)?;
            let predictions = classifier.test(&x_test, EvalKind::Fold)?;
            let metrics = classifier.get_results(&y_test, &predictions, EvalKind::Fold)?;
            classifier.write_fold_results_to_file(config)?;
            info!(
                model = classifier.model_name(),
                fold = fold.fold_idx,
                accuracy = metrics.accuracy,
                macro_f1 = metrics.macro_f1,
                "fold evaluated"
            );
        }

        let avg_metrics = classifier.get_fold_avg_result(config)?;
        let best_fold = classifier.find_best_model(config)?;

        let predictions = classifier.test(&split.input_test, EvalKind::Test)?;
        let test_metrics =
            classifier.get_results(&split.labels_test, &predictions, EvalKind::Test)?;
        classifier.write_test_results_to_file(config)?;
        info!(
            model = classifier.model_name(),
            accuracy = test_metrics.accuracy,
            macro_f1 = test_metrics.macro_f1,
            "held-out evaluation complete"
        );

        reports.push(ModelReport {
            model: classifier.model_name().to_string(),
            best_fold,
            avg_metrics,
            test_metrics,
        });
    }

    Ok(ExperimentReport {
        dataset: config.dataset.clone(),
        n_instances: prepared.input_data.nrows(),
        n_features: prepared.input_data.ncols(),
        reports,
    })
}
