//! Classification metrics
//!
//! The fixed six-metric report produced once per fold and for the held-out
//! test set: accuracy, macro precision, macro recall, macro F1, micro F1 and
//! weighted F1. Per-class scores are macro-averaged over the classification's
//! full class set, so a class absent from a fold still contributes a zero.

use crate::error::{CinematchError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric names, in reporting order
pub const METRIC_NAMES: [&str; 6] = [
    "accuracy",
    "macro_precision",
    "macro_recall",
    "macro_f1",
    "micro_f1",
    "weighted_f1",
];

/// One evaluation's metric set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub accuracy: f64,
    pub macro_precision: f64,
    pub macro_recall: f64,
    pub macro_f1: f64,
    pub micro_f1: f64,
    pub weighted_f1: f64,
}

impl FoldMetrics {
    /// Compute the metric set from true and predicted labels over a fixed
    /// class set.
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>, classes: &[i64]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(CinematchError::ShapeError {
                expected: format!("predictions length = {}", y_true.len()),
                actual: format!("predictions length = {}", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(CinematchError::EmptyResult(
                "no instances to evaluate".to_string(),
            ));
        }

        let n = y_true.len() as f64;
        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t.round() as i64 == p.round() as i64)
            .count();
        let accuracy = correct as f64 / n;

        let mut total_tp = 0usize;
        let mut total_fp = 0usize;
        let mut total_fn = 0usize;
        let mut precision_sum = 0.0;
        let mut recall_sum = 0.0;
        let mut f1_sum = 0.0;
        let mut weighted_f1 = 0.0;

        for &class in classes {
            let mut tp = 0usize;
            let mut fp = 0usize;
            let mut fn_ = 0usize;
            let mut support = 0usize;

            for (t, p) in y_true.iter().zip(y_pred.iter()) {
                let t_is = t.round() as i64 == class;
                let p_is = p.round() as i64 == class;
                if t_is {
                    support += 1;
                }
                match (t_is, p_is) {
                    (true, true) => tp += 1,
                    (false, true) => fp += 1,
                    (true, false) => fn_ += 1,
                    (false, false) => {}
                }
            }

            let precision = safe_ratio(tp, tp + fp);
            let recall = safe_ratio(tp, tp + fn_);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            precision_sum += precision;
            recall_sum += recall;
            f1_sum += f1;
            weighted_f1 += (support as f64 / n) * f1;

            total_tp += tp;
            total_fp += fp;
            total_fn += fn_;
        }

        let n_classes = classes.len() as f64;
        let micro_precision = safe_ratio(total_tp, total_tp + total_fp);
        let micro_recall = safe_ratio(total_tp, total_tp + total_fn);
        let micro_f1 = if micro_precision + micro_recall > 0.0 {
            2.0 * micro_precision * micro_recall / (micro_precision + micro_recall)
        } else {
            0.0
        };

        Ok(Self {
            accuracy,
            macro_precision: precision_sum / n_classes,
            macro_recall: recall_sum / n_classes,
            macro_f1: f1_sum / n_classes,
            micro_f1,
            weighted_f1,
        })
    }

    /// Look up a metric by its reporting name
    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "accuracy" => Some(self.accuracy),
            "macro_precision" => Some(self.macro_precision),
            "macro_recall" => Some(self.macro_recall),
            "macro_f1" => Some(self.macro_f1),
            "micro_f1" => Some(self.micro_f1),
            "weighted_f1" => Some(self.weighted_f1),
            _ => None,
        }
    }

    /// Name -> value map with exactly six entries
    pub fn as_map(&self) -> BTreeMap<String, f64> {
        METRIC_NAMES
            .iter()
            .map(|&name| (name.to_string(), self.metric(name).unwrap_or(0.0)))
            .collect()
    }

    /// Arithmetic mean of each metric across fold records
    pub fn average(folds: &[FoldMetrics]) -> Result<FoldMetrics> {
        if folds.is_empty() {
            return Err(CinematchError::EmptyResult(
                "no fold metrics recorded".to_string(),
            ));
        }
        let n = folds.len() as f64;
        Ok(FoldMetrics {
            accuracy: folds.iter().map(|m| m.accuracy).sum::<f64>() / n,
            macro_precision: folds.iter().map(|m| m.macro_precision).sum::<f64>() / n,
            macro_recall: folds.iter().map(|m| m.macro_recall).sum::<f64>() / n,
            macro_f1: folds.iter().map(|m| m.macro_f1).sum::<f64>() / n,
            micro_f1: folds.iter().map(|m| m.micro_f1).sum::<f64>() / n,
            weighted_f1: folds.iter().map(|m| m.weighted_f1).sum::<f64>() / n,
        })
    }
}

fn safe_ratio(num: usize, denom: usize) -> f64 {
    if denom > 0 {
        num as f64 / denom as f64
    } else {
        0.0
    }
}
