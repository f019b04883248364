//! Confusion-matrix metrics with the churned class as positive

use anyhow::Result;
use ndarray::Array2;
use serde::Serialize;

use super::roc::{roc_curve, RocCurve};
use crate::models::{ChurnClassifier, CvScores};

/// Binary confusion matrix; churned is the positive class
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
            match (truth, pred) {
                (true, true) => cm.tp += 1,
                (false, true) => cm.fp += 1,
                (false, false) => cm.tn += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    pub fn accuracy(&self) -> f64 {
        (self.tp + self.tn) as f64 / self.total().max(1) as f64
    }

    /// TP / (TP + FP); 0 when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        if self.tp + self.fp == 0 {
            0.0
        } else {
            self.tp as f64 / (self.tp + self.fp) as f64
        }
    }

    /// TP / (TP + FN), a.k.a. sensitivity
    pub fn recall(&self) -> f64 {
        if self.tp + self.fn_ == 0 {
            0.0
        } else {
            self.tp as f64 / (self.tp + self.fn_) as f64
        }
    }

    /// TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        if self.tn + self.fp == 0 {
            0.0
        } else {
            self.tn as f64 / (self.tn + self.fp) as f64
        }
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Per-model scores on the held-out test partition
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub family: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1: f64,
    pub auc: f64,
    pub cv_auc_mean: f64,
    pub cv_auc_std: f64,
    pub confusion: ConfusionMatrix,
    #[serde(skip)]
    pub roc: Option<RocCurve>,
}

/// Score a fitted model on the test encoding.
pub fn evaluate(
    model: &dyn ChurnClassifier,
    x_test: &Array2<f64>,
    y_test: &[bool],
    cv: &CvScores,
) -> Result<Evaluation> {
    let probabilities = model.predict_proba(x_test);
    let scores: Vec<f64> = probabilities.to_vec();
    let predictions: Vec<bool> = scores.iter().map(|p| *p >= 0.5).collect();

    let confusion = ConfusionMatrix::from_labels(y_test, &predictions);
    let roc = roc_curve(y_test, &scores).ok_or_else(|| {
        anyhow::anyhow!("Test partition contains a single class; ROC is undefined")
    })?;

    Ok(Evaluation {
        family: model.family().to_string(),
        accuracy: confusion.accuracy(),
        precision: confusion.precision(),
        recall: confusion.recall(),
        specificity: confusion.specificity(),
        f1: confusion.f1(),
        auc: roc.auc,
        cv_auc_mean: cv.mean(),
        cv_auc_std: cv.std(),
        confusion,
        roc: Some(roc),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ConfusionMatrix {
        // 6 TP, 2 FP, 9 TN, 3 FN
        let y_true = [
            true, true, true, true, true, true, true, true, true, false, false, false, false,
            false, false, false, false, false, false, false,
        ];
        let y_pred = [
            true, true, true, true, true, true, false, false, false, true, true, false, false,
            false, false, false, false, false, false, false,
        ];
        ConfusionMatrix::from_labels(&y_true, &y_pred)
    }

    #[test]
    fn test_counts() {
        let cm = matrix();
        assert_eq!((cm.tp, cm.fp, cm.tn, cm.fn_), (6, 2, 9, 3));
        assert_eq!(cm.total(), 20);
    }

    #[test]
    fn test_metric_identities_hold_exactly() {
        let cm = matrix();
        assert!((cm.accuracy() - 15.0 / 20.0).abs() < 1e-12);
        assert!((cm.precision() - 6.0 / 8.0).abs() < 1e-12);
        assert!((cm.recall() - 6.0 / 9.0).abs() < 1e-12);
        assert!((cm.specificity() - 9.0 / 11.0).abs() < 1e-12);

        let p = cm.precision();
        let r = cm.recall();
        assert!((cm.f1() - 2.0 * p * r / (p + r)).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_matrices_do_not_divide_by_zero() {
        let cm = ConfusionMatrix::from_labels(&[false, false], &[false, false]);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);
        assert!((cm.specificity() - 1.0).abs() < 1e-12);
    }
}
