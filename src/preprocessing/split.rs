//! Train/test splitting and k-fold cross-validation

use crate::error::{CinematchError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A single train/test index partition within k-fold cross-validation
#[derive(Debug, Clone)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Result of a train/test split
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub input_train: Array2<f64>,
    pub input_test: Array2<f64>,
    pub labels_train: Array1<f64>,
    pub labels_test: Array1<f64>,
}

/// Split features and labels into shuffled train and test partitions.
///
/// The test partition holds `round(test_fraction * n)` rows; the train
/// partition holds the remainder.
pub fn create_train_test_data(
    input_data: &Array2<f64>,
    labels: &Array1<f64>,
    test_fraction: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    let n = input_data.nrows();
    if n != labels.len() {
        return Err(CinematchError::ShapeError {
            expected: format!("labels length = {n}"),
            actual: format!("labels length = {}", labels.len()),
        });
    }
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(CinematchError::ValidationError(format!(
            "test_fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let test_size = ((n as f64) * test_fraction).round() as usize;
    if test_size == 0 || test_size >= n {
        return Err(CinematchError::ValidationError(format!(
            "test_fraction {test_fraction} leaves no data for one partition ({n} rows)"
        )));
    }
    let train_size = n - test_size;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train_idx = &indices[..train_size];
    let test_idx = &indices[train_size..];

    Ok(TrainTestSplit {
        input_train: input_data.select(Axis(0), train_idx),
        input_test: input_data.select(Axis(0), test_idx),
        labels_train: Array1::from_vec(train_idx.iter().map(|&i| labels[i]).collect()),
        labels_test: Array1::from_vec(test_idx.iter().map(|&i| labels[i]).collect()),
    })
}

/// Generate k folds over the training partition.
///
/// Returns an explicit, ordered list. Each fold's test set has `n / k` rows
/// (the remainder is spread over the first folds); fold test sets are disjoint
/// and together cover every index exactly once.
pub fn create_cross_validation_data(input_data: &Array2<f64>, k: usize) -> Result<Vec<Fold>> {
    let n = input_data.nrows();
    if k < 2 {
        return Err(CinematchError::ValidationError(format!(
            "cross-validation fold count must be at least 2, got {k}"
        )));
    }
    if n < k {
        return Err(CinematchError::ValidationError(format!(
            "cannot build {k} folds from {n} rows"
        )));
    }

    let indices: Vec<usize> = (0..n).collect();

    let fold_sizes: Vec<usize> = (0..k)
        .map(|i| {
            let base = n / k;
            let remainder = n % k;
            if i < remainder {
                base + 1
            } else {
                base
            }
        })
        .collect();

    let mut folds = Vec::with_capacity(k);
    let mut current = 0;
    for (fold_idx, &fold_size) in fold_sizes.iter().enumerate() {
        let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
        let train_indices: Vec<usize> = indices[..current]
            .iter()
            .chain(indices[current + fold_size..].iter())
            .copied()
            .collect();
        folds.push(Fold {
            train_indices,
            test_indices,
            fold_idx,
        });
        current += fold_size;
    }

    Ok(folds)
}

/// Gather the rows of `x` named by `indices` into a new matrix
pub fn select_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
    x.select(Axis(0), indices)
}

/// Gather the entries of `y` named by `indices` into a new vector
pub fn select_labels(y: &Array1<f64>, indices: &[usize]) -> Array1<f64> {
    Array1::from_vec(indices.iter().map(|&i| y[i]).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_matrix(rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |(r, c)| (r * cols + c) as f64)
    }

    #[test]
    fn test_create_train_test_data() {
        let x = sample_matrix(5, 2);
        let y = Array1::from_vec((0..5).map(|v| v as f64).collect());

        let split = create_train_test_data(&x, &y, 0.2, 42).unwrap();
        assert_eq!(split.input_train.dim(), (4, 2));
        assert_eq!(split.input_test.dim(), (1, 2));
        assert_eq!(split.labels_train.len(), 4);
        assert_eq!(split.labels_test.len(), 1);
    }

    #[test]
    fn test_split_partitions_sum_to_n() {
        for n in [10usize, 37, 100, 253] {
            let x = sample_matrix(n, 3);
            let y = Array1::zeros(n);
            let split = create_train_test_data(&x, &y, 0.2, 7).unwrap();
            assert_eq!(split.input_train.nrows() + split.input_test.nrows(), n);
            assert_eq!(split.input_test.nrows(), ((n as f64) * 0.2).round() as usize);
        }
    }

    #[test]
    fn test_split_shape_mismatch() {
        let x = sample_matrix(5, 2);
        let y = Array1::zeros(4);
        let result = create_train_test_data(&x, &y, 0.2, 42);
        assert!(matches!(result, Err(CinematchError::ShapeError { .. })));
    }

    #[test]
    fn test_split_reproducible() {
        let x = sample_matrix(20, 2);
        let y = Array1::from_vec((0..20).map(|v| v as f64).collect());
        let a = create_train_test_data(&x, &y, 0.2, 42).unwrap();
        let b = create_train_test_data(&x, &y, 0.2, 42).unwrap();
        assert_eq!(a.labels_test, b.labels_test);
    }

    #[test]
    fn test_cross_validation_fold_shapes() {
        let x = sample_matrix(4, 2);
        let folds = create_cross_validation_data(&x, 2).unwrap();
        assert_eq!(folds.len(), 2);
        for fold in &folds {
            assert_eq!(fold.train_indices.len(), 2);
            assert_eq!(fold.test_indices.len(), 2);
        }
    }

    #[test]
    fn test_cross_validation_partition() {
        let x = sample_matrix(103, 2);
        let folds = create_cross_validation_data(&x, 5).unwrap();
        assert_eq!(folds.len(), 5);

        // Union of test sets covers every index exactly once
        let mut all_test: Vec<usize> = folds
            .iter()
            .flat_map(|f| f.test_indices.iter().copied())
            .collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..103).collect::<Vec<_>>());

        // Train and test sets are disjoint within each fold
        for fold in &folds {
            for idx in &fold.test_indices {
                assert!(!fold.train_indices.contains(idx));
            }
            assert_eq!(fold.train_indices.len() + fold.test_indices.len(), 103);
        }
    }

    #[test]
    fn test_cross_validation_too_few_rows() {
        let x = sample_matrix(3, 2);
        let result = create_cross_validation_data(&x, 5);
        assert!(matches!(result, Err(CinematchError::ValidationError(_))));
    }

    #[test]
    fn test_cross_validation_k_below_two() {
        let x = sample_matrix(10, 2);
        let result = create_cross_validation_data(&x, 1);
        assert!(matches!(result, Err(CinematchError::ValidationError(_))));
    }
}
