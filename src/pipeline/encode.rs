//! Feature-matrix encoding: dummy expansion and standardization
//!
//! Every model family consumes the same encoding: numeric attributes pass
//! through as single columns, categorical attributes expand to one dummy
//! column per non-baseline level (baseline = first level in sort order).
//! All encoded columns are standardized with statistics fit on the
//! (resampled) training partition and reused verbatim at prediction time.

use anyhow::{Context, Result};
use ndarray::Array2;
use polars::prelude::*;

use super::loader::{column_as_f64, column_as_strings};

/// Zero-mean/unit-variance scaler with train-side statistics
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit per-column mean and standard deviation. Constant columns get a
    /// unit scale so transforming them is a no-op shift.
    pub fn fit(x: &Array2<f64>) -> Self {
        let n = x.nrows().max(1) as f64;
        let mut means = Vec::with_capacity(x.ncols());
        let mut stds = Vec::with_capacity(x.ncols());

        for col in x.columns() {
            let mean = col.sum() / n;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            means.push(mean);
            stds.push(if std > 0.0 { std } else { 1.0 });
        }

        Self { means, stds }
    }

    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut out = x.clone();
        for (j, mut col) in out.columns_mut().into_iter().enumerate() {
            col.mapv_inplace(|v| (v - self.means[j]) / self.stds[j]);
        }
        out
    }

    pub fn mean(&self) -> &[f64] {
        &self.means
    }

    pub fn std(&self) -> &[f64] {
        &self.stds
    }
}

/// One encoded matrix column and the schema attribute it came from
#[derive(Debug, Clone)]
pub struct EncodedColumn {
    /// Matrix column name, e.g. `tenure` or `Contract=OneYear`
    pub name: String,
    /// Source attribute, e.g. `Contract`
    pub source: String,
}

enum FeatureSpec {
    Numeric {
        name: String,
    },
    Categorical {
        name: String,
        /// Levels beyond the baseline, in sort order; one dummy each
        levels: Vec<String>,
        baseline: String,
    },
}

/// Fitted encoder: feature layout plus the train-side scaler
pub struct Encoder {
    specs: Vec<FeatureSpec>,
    columns: Vec<EncodedColumn>,
    scaler: StandardScaler,
}

impl Encoder {
    /// Fit the encoding layout and scaler on `df` over the given features,
    /// in the given order.
    pub fn fit(df: &DataFrame, features: &[String]) -> Result<Self> {
        let mut specs = Vec::with_capacity(features.len());
        let mut columns = Vec::new();

        for name in features {
            let column = df
                .column(name)
                .with_context(|| format!("Feature column '{}' not found", name))?;

            if column.dtype().is_primitive_numeric() {
                columns.push(EncodedColumn {
                    name: name.clone(),
                    source: name.clone(),
                });
                specs.push(FeatureSpec::Numeric { name: name.clone() });
            } else {
                let mut levels: Vec<String> = column_as_strings(df, name)?;
                levels.sort();
                levels.dedup();
                if levels.len() < 2 {
                    anyhow::bail!(
                        "Categorical feature '{}' has a single level and carries no signal",
                        name
                    );
                }
                let baseline = levels.remove(0);
                for level in &levels {
                    columns.push(EncodedColumn {
                        name: format!("{}={}", name, level),
                        source: name.clone(),
                    });
                }
                specs.push(FeatureSpec::Categorical {
                    name: name.clone(),
                    levels,
                    baseline,
                });
            }
        }

        let mut encoder = Self {
            specs,
            columns,
            scaler: StandardScaler {
                means: vec![],
                stds: vec![],
            },
        };
        let raw = encoder.raw_encode(df)?;
        encoder.scaler = StandardScaler::fit(&raw);
        Ok(encoder)
    }

    /// Encode `df` and apply the train-side standardization.
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        Ok(self.scaler.transform(&self.raw_encode(df)?))
    }

    fn raw_encode(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let n = df.height();
        let mut out = Array2::<f64>::zeros((n, self.columns.len()));
        let mut offset = 0;

        for spec in &self.specs {
            match spec {
                FeatureSpec::Numeric { name } => {
                    let values = column_as_f64(df, name)?;
                    for (i, v) in values.into_iter().enumerate() {
                        out[[i, offset]] = v;
                    }
                    offset += 1;
                }
                FeatureSpec::Categorical { name, levels, .. } => {
                    let values = column_as_strings(df, name)?;
                    for (i, v) in values.iter().enumerate() {
                        if let Some(j) = levels.iter().position(|l| l == v) {
                            out[[i, offset + j]] = 1.0;
                        }
                        // baseline and unseen levels encode as all-zero
                    }
                    offset += levels.len();
                }
            }
        }

        Ok(out)
    }

    /// Encoded column layout, aligned with matrix columns.
    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    /// Encoded column names, aligned with matrix columns.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Matrix column indices grouped by source attribute, in feature order.
    pub fn source_groups(&self) -> Vec<(String, Vec<usize>)> {
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (idx, column) in self.columns.iter().enumerate() {
            match groups.last_mut() {
                Some((source, indices)) if *source == column.source => indices.push(idx),
                _ => groups.push((column.source.clone(), vec![idx])),
            }
        }
        groups
    }

    /// The fitted scaler (train-side statistics).
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}
