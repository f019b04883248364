//! Quadratic discriminant classifier
//!
//! Models each class as a Gaussian with its own mean and full covariance.
//! The decision boundary is quadratic in the features; the churn
//! probability comes from the two class log-densities via Bayes' rule.

use ndarray::{Array1, Array2, ArrayView1, Axis};

use super::{ChurnClassifier, ModelFamily, TrainError};

#[derive(Debug)]
struct ClassGaussian {
    log_prior: f64,
    mean: Array1<f64>,
    inv_cov: Array2<f64>,
    log_det: f64,
}

/// Fitted quadratic discriminant
#[derive(Debug)]
pub struct QuadraticDiscriminant {
    churned: ClassGaussian,
    retained: ClassGaussian,
}

/// Fit class-conditional Gaussians. Fails with a singular-matrix error when
/// a class covariance cannot be inverted (too few rows, or a feature that
/// is constant within a class).
pub fn train(x: &Array2<f64>, y: &[bool]) -> Result<QuadraticDiscriminant, TrainError> {
    let n = y.len() as f64;
    let churned = fit_class(x, y, true, n)?;
    let retained = fit_class(x, y, false, n)?;
    Ok(QuadraticDiscriminant { churned, retained })
}

fn fit_class(
    x: &Array2<f64>,
    y: &[bool],
    class: bool,
    n_total: f64,
) -> Result<ClassGaussian, TrainError> {
    let family = ModelFamily::QuadraticDiscriminant;
    let d = x.ncols();

    let rows: Vec<usize> = (0..y.len()).filter(|&i| y[i] == class).collect();
    if rows.len() <= d {
        return Err(TrainError::SingularMatrix {
            family,
            detail: format!(
                "class with {} rows cannot support a {}-dimensional covariance",
                rows.len(),
                d
            ),
        });
    }

    let subset = x.select(Axis(0), &rows);
    let mean = subset.mean_axis(Axis(0)).expect("non-empty class");

    // unbiased covariance of the centered rows
    let mut cov = Array2::<f64>::zeros((d, d));
    for row in subset.rows() {
        let centered = &row - &mean;
        for i in 0..d {
            for j in i..d {
                cov[[i, j]] += centered[i] * centered[j];
            }
        }
    }
    let denom = (rows.len() - 1) as f64;
    for i in 0..d {
        for j in i..d {
            cov[[i, j]] /= denom;
            cov[[j, i]] = cov[[i, j]];
        }
    }

    let (inv_cov, log_det) = invert(&cov).ok_or_else(|| TrainError::SingularMatrix {
        family,
        detail: "class covariance matrix is singular".to_string(),
    })?;

    Ok(ClassGaussian {
        log_prior: (rows.len() as f64 / n_total).ln(),
        mean,
        inv_cov,
        log_det,
    })
}

/// Gauss-Jordan inverse with partial pivoting; also returns ln|det|.
/// Returns `None` when a pivot collapses below tolerance.
fn invert(m: &Array2<f64>) -> Option<(Array2<f64>, f64)> {
    const PIVOT_TOLERANCE: f64 = 1e-12;

    let d = m.nrows();
    let mut a = m.clone();
    let mut inv = Array2::<f64>::eye(d);
    let mut log_det = 0.0;

    for col in 0..d {
        // largest remaining pivot in this column
        let pivot_row = (col..d)
            .max_by(|&r1, &r2| {
                a[[r1, col]]
                    .abs()
                    .partial_cmp(&a[[r2, col]].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap();

        let pivot = a[[pivot_row, col]];
        if pivot.abs() < PIVOT_TOLERANCE {
            return None;
        }

        if pivot_row != col {
            for k in 0..d {
                a.swap([pivot_row, k], [col, k]);
                inv.swap([pivot_row, k], [col, k]);
            }
        }

        log_det += pivot.abs().ln();
        for k in 0..d {
            a[[col, k]] /= pivot;
            inv[[col, k]] /= pivot;
        }

        for row in 0..d {
            if row == col {
                continue;
            }
            let factor = a[[row, col]];
            if factor == 0.0 {
                continue;
            }
            for k in 0..d {
                a[[row, k]] -= factor * a[[col, k]];
                inv[[row, k]] -= factor * inv[[col, k]];
            }
        }
    }

    Some((inv, log_det))
}

impl ClassGaussian {
    /// Log discriminant score, constant terms shared by both classes dropped
    fn score(&self, x: ArrayView1<f64>) -> f64 {
        let centered = &x - &self.mean;
        let quad = centered.dot(&self.inv_cov.dot(&centered));
        self.log_prior - 0.5 * self.log_det - 0.5 * quad
    }
}

impl ChurnClassifier for QuadraticDiscriminant {
    fn family(&self) -> ModelFamily {
        ModelFamily::QuadraticDiscriminant
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        Array1::from_iter(x.rows().into_iter().map(|row| {
            let churn = self.churned.score(row);
            let retain = self.retained.score(row);
            1.0 / (1.0 + (retain - churn).exp())
        }))
    }
}
