//! End-to-end pipeline tests
//!
//! Exercises the classifier lifecycle over random data and a full experiment
//! run over a small synthetic MovieLens-style dataset.

use cinematch::config::{Classification, ModelKind, PipelineConfig};
use cinematch::preprocessing::content_based::load_ratings_artifact;
use cinematch::preprocessing::split::{create_cross_validation_data, create_train_test_data};
use cinematch::preprocessing::{select_labels, select_rows};
use cinematch::run_experiment;
use cinematch::training::classifier::{ContentBasedClassifier, EvalKind};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

fn random_dataset(n: usize, d: usize, n_classes: i64, seed: u64) -> (Array2<f64>, Array1<f64>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x = Array2::from_shape_fn((n, d), |_| rng.gen::<f64>());
    let y = Array1::from_shape_fn(n, |_| rng.gen_range(1..=n_classes) as f64);
    (x, y)
}

fn base_config(dir: &Path) -> PipelineConfig {
    let yaml = format!(
        r#"
data_dir: {}
dataset: ml-dev
embeddings_file: glove.txt
classification: multi
cross-validation: 5
models: [knn]
knn_neighbors: 3
rf_estimators: 5
dnn_epochs: 3
dnn_hidden_layers: [8]
"#,
        dir.display()
    );
    serde_yaml::from_str(&yaml).unwrap()
}

#[test]
fn test_classifier_cross_validation_lifecycle() {
    let dir = TempDir::new().unwrap();
    let config = base_config(dir.path());
    let (x, y) = random_dataset(100, 10, 5, 42);

    let split = create_train_test_data(&x, &y, config.test_fraction, config.random_seed).unwrap();
    assert_eq!(split.input_train.dim(), (80, 10));
    assert_eq!(split.input_test.dim(), (20, 10));

    let folds = create_cross_validation_data(&split.input_train, config.cross_validation).unwrap();
    assert_eq!(folds.len(), 5);
    for fold in &folds {
        assert_eq!(fold.train_indices.len(), 64);
        assert_eq!(fold.test_indices.len(), 16);
    }

    for &kind in &[ModelKind::Knn, ModelKind::Rf, ModelKind::Dnn] {
        let mut classifier = ContentBasedClassifier::new(kind, &config);

        for fold in &folds {
            let x_train = select_rows(&split.input_train, &fold.train_indices);
            let y_train = select_labels(&split.labels_train, &fold.train_indices);
            let x_test = select_rows(&split.input_train, &fold.test_indices);
            let y_test = select_labels(&split.labels_train, &fold.test_indices);

            classifier.train(&config, &x_train, &y_train).unwrap();
            let predictions = classifier.test(&x_test, EvalKind::Fold).unwrap();
            assert_eq!(predictions.len(), 16);
            classifier
                .get_results(&y_test, &predictions, EvalKind::Fold)
                .unwrap();
            let path = classifier.write_fold_results_to_file(&config).unwrap();
            assert!(path.exists());
        }

        assert_eq!(classifier.fold_count(), 5);

        let avg = classifier.get_fold_avg_result(&config).unwrap();
        assert_eq!(avg.as_map().len(), 6);

        let best = classifier.find_best_model(&config).unwrap();
        assert!(best < 5);

        let predictions = classifier.test(&split.input_test, EvalKind::Test).unwrap();
        let test_metrics = classifier
            .get_results(&split.labels_test, &predictions, EvalKind::Test)
            .unwrap();
        assert_eq!(test_metrics.as_map().len(), 6);
        let path = classifier.write_test_results_to_file(&config).unwrap();
        assert!(path.exists());
    }

    // One fold, avg and test file per model family
    let results: Vec<_> = fs::read_dir(config.results_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(results.len(), 3 * 7);
    assert!(results.contains(&"knn_multi_avg.json".to_string()));
    assert!(results.contains(&"rf_multi_test.json".to_string()));
    assert!(results.contains(&"dnn_multi_fold_4.json".to_string()));
}

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = fs::File::create(path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

fn write_synthetic_movielens(dir: &Path) {
    let dataset_dir = dir.join("Datasets").join("ml-dev");

    let mut movies = String::from("movieId,title,genres\n");
    let mut links = String::from("movieId,imdbId\n");
    let genres = ["Comedy", "Drama", "Action", "Horror"];
    for movie_id in 1usize..=8 {
        movies.push_str(&format!(
            "{movie_id},Movie {movie_id} (199{movie_id}),{}\n",
            genres[(movie_id - 1) % 4]
        ));
        links.push_str(&format!("{movie_id},{}\n", 100000 + movie_id));
    }
    write_file(&dataset_dir.join("movies.csv"), &movies);
    write_file(&dataset_dir.join("links.csv"), &links);

    let mut ratings = String::from("userId,movieId,rating\n");
    for user_id in 1..=5 {
        for movie_id in 1..=8 {
            let rating = ((user_id + movie_id) % 5 + 1) as f64;
            ratings.push_str(&format!("{user_id},{movie_id},{rating:.1}\n"));
        }
    }
    write_file(&dataset_dir.join("ratings.csv"), &ratings);

    write_file(
        &dataset_dir.join("tags.csv"),
        "userId,movieId,tag\n1,1,funny\n2,3,dark\n",
    );

    // Embeddings covering every word the synthetic titles and genres produce
    let mut glove = String::new();
    let words = [
        "movie", "comedy", "drama", "action", "horror", "funny", "dark",
    ];
    for (i, word) in words.iter().enumerate() {
        let v = (i + 1) as f64 * 0.1;
        glove.push_str(&format!("{word} {v:.1} {:.1} {:.1}\n", v + 0.1, v + 0.2));
    }
    write_file(&dir.join("resources").join("glove.txt"), &glove);
}

#[test]
fn test_run_experiment_end_to_end() {
    let dir = TempDir::new().unwrap();
    write_synthetic_movielens(dir.path());

    let yaml = format!(
        r#"
data_dir: {}
dataset: ml-dev
embeddings_file: glove.txt
classification: multi
cross-validation: 2
models: [knn, rf]
knn_neighbors: 3
rf_estimators: 5
test_fraction: 0.25
"#,
        dir.path().display()
    );
    let config: PipelineConfig = serde_yaml::from_str(&yaml).unwrap();
    config.validate().unwrap();

    let report = run_experiment(&config).unwrap();
    assert_eq!(report.dataset, "ml-dev");
    assert_eq!(report.n_instances, 40);
    assert_eq!(report.n_features, 3);
    assert_eq!(report.reports.len(), 2);

    for model in &report.reports {
        assert!(model.best_fold < 2);
        assert!(model.test_metrics.accuracy >= 0.0 && model.test_metrics.accuracy <= 1.0);
        assert_eq!(model.avg_metrics.as_map().len(), 6);
    }

    // Ratings artifact was persisted with every instance's class
    let artifact =
        load_ratings_artifact(&config.output_dir(), "ml-dev", Classification::Multi).unwrap();
    assert_eq!(artifact.ratings.len(), 40);
    assert!(artifact.ratings.iter().all(|&c| (1..=5).contains(&c)));

    // Metric files for both families
    for name in [
        "knn_multi_fold_0.json",
        "knn_multi_fold_1.json",
        "knn_multi_avg.json",
        "knn_multi_test.json",
        "rf_multi_avg.json",
        "rf_multi_test.json",
    ] {
        assert!(
            config.results_dir().join(name).exists(),
            "missing results file {name}"
        );
    }
}

#[test]
fn test_run_experiment_binary_mode() {
    let dir = TempDir::new().unwrap();
    write_synthetic_movielens(dir.path());

    let yaml = format!(
        r#"
data_dir: {}
dataset: ml-dev
embeddings_file: glove.txt
classification: binary
cross-validation: 2
models: [knn]
knn_neighbors: 3
test_fraction: 0.25
"#,
        dir.path().display()
    );
    let config: PipelineConfig = serde_yaml::from_str(&yaml).unwrap();

    let report = run_experiment(&config).unwrap();
    assert_eq!(report.reports.len(), 1);

    let artifact =
        load_ratings_artifact(&config.output_dir(), "ml-dev", Classification::Binary).unwrap();
    assert!(artifact.ratings.iter().all(|&c| c == 0 || c == 1));
}
