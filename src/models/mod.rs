//! Classifier families and the shared training contract
//!
//! Every family consumes the same standardized feature matrix and boolean
//! churn labels, and exposes a churn probability per row. The linear
//! families additionally expose their coefficients for the odds-ratio
//! report.

pub mod discriminant;
pub mod forest;
pub mod logistic;
pub mod svm;

pub use discriminant::QuadraticDiscriminant;
pub use forest::{ForestConfig, RandomForest};
pub use logistic::LogisticModel;
pub use svm::LinearSvm;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::eval::roc::roc_auc;

/// The four compared classifier families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModelFamily {
    /// Linear-probability classifier with interpretable coefficients
    Logistic,
    /// Class-conditional Gaussians with a quadratic decision boundary
    QuadraticDiscriminant,
    /// Maximum-margin separating hyperplane, linear kernel
    LinearSvm,
    /// Bagged decision trees, majority vote
    Forest,
}

impl ModelFamily {
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::Logistic,
        ModelFamily::QuadraticDiscriminant,
        ModelFamily::LinearSvm,
        ModelFamily::Forest,
    ];
}

impl std::fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelFamily::Logistic => write!(f, "logistic regression"),
            ModelFamily::QuadraticDiscriminant => write!(f, "quadratic discriminant"),
            ModelFamily::LinearSvm => write!(f, "linear SVM"),
            ModelFamily::Forest => write!(f, "bagged forest"),
        }
    }
}

/// Training failures; never a silently degenerate model
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("{family} training failed to converge: {detail}")]
    NonConvergence { family: ModelFamily, detail: String },

    #[error("{family} hit a singular matrix: {detail}")]
    SingularMatrix { family: ModelFamily, detail: String },

    #[error("{family} requires both classes in the training data")]
    SingleClass { family: ModelFamily },
}

/// The shared prediction contract of a fitted model
pub trait ChurnClassifier: Send + Sync {
    fn family(&self) -> ModelFamily;

    /// Churn probability per row of `x`
    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64>;

    /// Class labels at the 0.5 probability threshold
    fn predict(&self, x: &Array2<f64>) -> Vec<bool> {
        self.predict_proba(x).iter().map(|p| *p >= 0.5).collect()
    }

    /// (per-column coefficients, intercept), for families with a linear
    /// decision function in the encoded space
    fn coefficients(&self) -> Option<(Vec<f64>, f64)> {
        None
    }
}

/// Knobs shared by the training paths
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub seed: u64,
    /// Trees in the bagged ensemble
    pub trees: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self { seed: 21, trees: 500 }
    }
}

/// Fit one family on the full training encoding.
pub fn train_family(
    family: ModelFamily,
    x: &Array2<f64>,
    y: &[bool],
    cfg: &TrainConfig,
) -> Result<Box<dyn ChurnClassifier>, TrainError> {
    if y.iter().all(|v| *v) || y.iter().all(|v| !*v) {
        return Err(TrainError::SingleClass { family });
    }

    Ok(match family {
        ModelFamily::Logistic => Box::new(logistic::train(x, y)?),
        ModelFamily::QuadraticDiscriminant => Box::new(discriminant::train(x, y)?),
        ModelFamily::LinearSvm => Box::new(svm::train(x, y, cfg.seed)?),
        ModelFamily::Forest => Box::new(forest::train(
            x,
            y,
            &ForestConfig {
                n_trees: cfg.trees,
                seed: cfg.seed,
                ..ForestConfig::default()
            },
        )?),
    })
}

/// Per-fold AUC scores from cross-validation
#[derive(Debug, Clone, Default, Serialize)]
pub struct CvScores {
    pub fold_aucs: Vec<f64>,
}

impl CvScores {
    pub fn mean(&self) -> f64 {
        if self.fold_aucs.is_empty() {
            return f64::NAN;
        }
        self.fold_aucs.iter().sum::<f64>() / self.fold_aucs.len() as f64
    }

    pub fn std(&self) -> f64 {
        if self.fold_aucs.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .fold_aucs
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f64>()
            / (self.fold_aucs.len() - 1) as f64;
        var.sqrt()
    }
}

/// k-fold cross-validation of one family, scored by held-out-fold AUC.
///
/// Rows are shuffled once with the configured seed and dealt into `folds`
/// contiguous chunks; each fold's model trains on the remaining rows with a
/// fold-derived seed. Folds where the held-out slice ends up single-class
/// are skipped (AUC undefined there).
pub fn cross_validate(
    family: ModelFamily,
    x: &Array2<f64>,
    y: &[bool],
    folds: usize,
    cfg: &TrainConfig,
) -> Result<CvScores, TrainError> {
    assert!(folds >= 2, "cross-validation needs at least 2 folds");

    let n = y.len();
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    order.shuffle(&mut rng);

    let mut scores = CvScores::default();

    for fold in 0..folds {
        let valid_idx: Vec<usize> = order
            .iter()
            .skip(fold)
            .step_by(folds)
            .copied()
            .collect();
        let train_idx: Vec<usize> = order
            .iter()
            .enumerate()
            .filter(|(pos, _)| pos % folds != fold)
            .map(|(_, idx)| *idx)
            .collect();

        let x_train = x.select(Axis(0), &train_idx);
        let y_train: Vec<bool> = train_idx.iter().map(|&i| y[i]).collect();
        let x_valid = x.select(Axis(0), &valid_idx);
        let y_valid: Vec<bool> = valid_idx.iter().map(|&i| y[i]).collect();

        let fold_cfg = TrainConfig {
            seed: cfg.seed.wrapping_add(1 + fold as u64),
            ..cfg.clone()
        };
        let model = train_family(family, &x_train, &y_train, &fold_cfg)?;
        let probabilities = model.predict_proba(&x_valid).to_vec();

        if let Some(auc) = roc_auc(&y_valid, &probabilities) {
            scores.fold_aucs.push(auc);
        }
    }

    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::Rng;

    /// Two well-separated Gaussian blobs, deterministic
    pub(crate) fn blobs(n_per_class: usize, seed: u64) -> (Array2<f64>, Vec<bool>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Array2::<f64>::zeros((2 * n_per_class, 2));
        let mut y = Vec::with_capacity(2 * n_per_class);

        for i in 0..(2 * n_per_class) {
            let churned = i < n_per_class;
            let center = if churned { 1.5 } else { -1.5 };
            x[[i, 0]] = center + rng.gen::<f64>() - 0.5;
            x[[i, 1]] = -center + rng.gen::<f64>() - 0.5;
            y.push(churned);
        }
        (x, y)
    }

    #[test]
    fn test_every_family_learns_separable_blobs() {
        let (x, y) = blobs(60, 3);
        let cfg = TrainConfig { trees: 25, ..TrainConfig::default() };

        for family in ModelFamily::ALL {
            let model = train_family(family, &x, &y, &cfg).unwrap();
            let predictions = model.predict(&x);
            let correct = predictions
                .iter()
                .zip(y.iter())
                .filter(|(p, t)| p == t)
                .count();
            assert!(
                correct as f64 / y.len() as f64 > 0.9,
                "{} failed to separate the blobs",
                family
            );
        }
    }

    #[test]
    fn test_single_class_training_is_an_error() {
        let (x, _) = blobs(10, 3);
        let y = vec![true; 20];
        let err = train_family(ModelFamily::Logistic, &x, &y, &TrainConfig::default());
        assert!(matches!(err, Err(TrainError::SingleClass { .. })));
    }

    #[test]
    fn test_cross_validation_scores_every_fold() {
        let (x, y) = blobs(50, 5);
        let cfg = TrainConfig { trees: 25, ..TrainConfig::default() };
        let scores = cross_validate(ModelFamily::Logistic, &x, &y, 5, &cfg).unwrap();

        assert_eq!(scores.fold_aucs.len(), 5);
        assert!(scores.mean() > 0.9);
        assert!(scores.std() >= 0.0);
    }

    #[test]
    fn test_cross_validation_is_deterministic() {
        let (x, y) = blobs(40, 5);
        let cfg = TrainConfig { trees: 10, ..TrainConfig::default() };

        let a = cross_validate(ModelFamily::Forest, &x, &y, 4, &cfg).unwrap();
        let b = cross_validate(ModelFamily::Forest, &x, &y, 4, &cfg).unwrap();
        assert_eq!(a.fold_aucs, b.fold_aucs);
    }
}
