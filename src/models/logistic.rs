//! Linear-probability classifier (logistic regression)
//!
//! Thin wrapper around linfa's logistic regression. The fitted model
//! exposes its parameters; the odds-ratio report reads them.

use linfa::prelude::*;
use linfa::Dataset;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2};

use super::{ChurnClassifier, ModelFamily, TrainError};

/// Fitted logistic-regression model
pub struct LogisticModel {
    fitted: FittedLogisticRegression<f64, bool>,
}

/// Fit on the standardized encoding. `y` must contain both classes.
pub fn train(x: &Array2<f64>, y: &[bool]) -> Result<LogisticModel, TrainError> {
    let dataset = Dataset::new(x.clone(), Array1::from(y.to_vec()));

    let fitted = LogisticRegression::default()
        .max_iterations(500)
        .gradient_tolerance(1e-8)
        .fit(&dataset)
        .map_err(|e| TrainError::NonConvergence {
            family: ModelFamily::Logistic,
            detail: e.to_string(),
        })?;

    Ok(LogisticModel { fitted })
}

impl ChurnClassifier for LogisticModel {
    fn family(&self) -> ModelFamily {
        ModelFamily::Logistic
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        // probability of the positive class; `true` orders above `false`
        self.fitted.predict_probabilities(x)
    }

    fn coefficients(&self) -> Option<(Vec<f64>, f64)> {
        Some((self.fitted.params().to_vec(), self.fitted.intercept()))
    }
}
