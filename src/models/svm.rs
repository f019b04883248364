//! Linear-margin classifier
//!
//! Maximum-margin separating hyperplane trained with the Pegasos
//! subgradient schedule on the hinge loss. The decision value is squashed
//! through a sigmoid for the shared probability contract; the squash is
//! strictly monotone, so ROC/AUC see the raw margin ranking.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::{ChurnClassifier, ModelFamily, TrainError};

/// Regularization strength of the Pegasos objective
const LAMBDA: f64 = 1e-4;

/// Full passes over the training rows
const EPOCHS: usize = 50;

/// Fitted linear-margin model
pub struct LinearSvm {
    weights: Array1<f64>,
    bias: f64,
}

/// Fit on the standardized encoding with a seeded sample order.
pub fn train(x: &Array2<f64>, y: &[bool], seed: u64) -> Result<LinearSvm, TrainError> {
    let family = ModelFamily::LinearSvm;
    let n = y.len();
    let d = x.ncols();

    let signs: Vec<f64> = y.iter().map(|&v| if v { 1.0 } else { -1.0 }).collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..n).collect();
    let mut weights = Array1::<f64>::zeros(d);
    let mut bias = 0.0;
    let mut t = 0usize;

    for _ in 0..EPOCHS {
        order.shuffle(&mut rng);
        for &i in &order {
            t += 1;
            let eta = 1.0 / (LAMBDA * t as f64);
            let margin = signs[i] * (weights.dot(&x.row(i)) + bias);

            weights *= 1.0 - eta * LAMBDA;
            if margin < 1.0 {
                weights.scaled_add(eta * signs[i], &x.row(i));
                bias += eta * signs[i];
            }
        }
    }

    if weights.iter().any(|w| !w.is_finite()) || !bias.is_finite() {
        return Err(TrainError::NonConvergence {
            family,
            detail: "weights diverged to a non-finite value".to_string(),
        });
    }

    Ok(LinearSvm { weights, bias })
}

impl LinearSvm {
    /// Signed distance-like decision value per row
    pub fn decision_values(&self, x: &Array2<f64>) -> Array1<f64> {
        x.dot(&self.weights) + self.bias
    }
}

impl ChurnClassifier for LinearSvm {
    fn family(&self) -> ModelFamily {
        ModelFamily::LinearSvm
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        self.decision_values(x).mapv(|v| 1.0 / (1.0 + (-v).exp()))
    }
}
