//! Synthetic minority oversampling and majority undersampling
//!
//! Rebalances the training partition: every minority row spawns `over`
//! synthetic rows interpolated toward one of its nearest minority
//! neighbours, then the majority class is randomly thinned to
//! `under x synthetic_count` rows. The test partition is never touched.

use anyhow::Result;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use thiserror::Error;

use super::loader::{column_as_f64, column_as_strings};

/// Rebalancing parameters
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    /// Synthetic rows generated per minority row
    pub over: usize,
    /// Majority rows kept per synthetic row
    pub under: f64,
    /// Nearest same-class neighbours considered per minority row
    pub neighbors: usize,
    /// Seed for neighbour picks, interpolation gaps, and undersampling
    pub seed: u64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            over: 1,
            under: 2.0,
            neighbors: 5,
            seed: 21,
        }
    }
}

/// Rebalancing failures
#[derive(Debug, Error)]
pub enum BalanceError {
    /// The minority class cannot seed interpolation
    #[error("insufficient minority samples for synthetic oversampling: found {found}, need at least 2")]
    InsufficientMinority { found: usize },

    /// The target is not a two-class column
    #[error("target column has {0} distinct classes, expected exactly 2")]
    NotBinary(usize),
}

/// What the rebalancing pass produced
#[derive(Debug)]
pub struct BalanceOutcome {
    pub df: DataFrame,
    pub minority_label: String,
    pub synthetic_rows: usize,
    pub removed_majority_rows: usize,
    /// Neighbour count actually used (reduced for small minority classes)
    pub neighbors_used: usize,
}

/// SMOTE-style rebalancing of `train` on the binary `target` column.
///
/// Distance between rows is Euclidean over standardized numeric attributes
/// plus a unit penalty per mismatched categorical attribute. Numeric
/// attributes of a synthetic row are interpolated between the seed row and
/// a randomly chosen neighbour; categorical attributes take the majority
/// vote among the neighbours, ties resolved by the nearest neighbour.
pub fn smote_resample(
    train: &DataFrame,
    target: &str,
    cfg: &BalanceConfig,
) -> Result<BalanceOutcome> {
    let labels = column_as_strings(train, target)?;

    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in &labels {
        *class_counts.entry(label.clone()).or_insert(0) += 1;
    }
    if class_counts.len() != 2 {
        return Err(BalanceError::NotBinary(class_counts.len()).into());
    }

    // BTreeMap iteration order breaks count ties deterministically
    let minority_label = class_counts
        .iter()
        .min_by_key(|(_, count)| **count)
        .map(|(label, _)| label.clone())
        .expect("two classes present");

    let minority_idx: Vec<usize> = (0..labels.len())
        .filter(|&i| labels[i] == minority_label)
        .collect();
    let majority_idx: Vec<usize> = (0..labels.len())
        .filter(|&i| labels[i] != minority_label)
        .collect();

    if minority_idx.len() < 2 {
        return Err(BalanceError::InsufficientMinority {
            found: minority_idx.len(),
        }
        .into());
    }
    let neighbors_used = cfg.neighbors.min(minority_idx.len() - 1);

    // Row-major views of the feature columns, split by kind
    let mut num_names: Vec<String> = Vec::new();
    let mut cat_names: Vec<String> = Vec::new();
    for column in train.get_columns() {
        let name = column.name().to_string();
        if name == target {
            continue;
        }
        if column.dtype().is_primitive_numeric() {
            num_names.push(name);
        } else {
            cat_names.push(name);
        }
    }

    let num_cols: Vec<Vec<f64>> = num_names
        .iter()
        .map(|name| column_as_f64(train, name))
        .collect::<Result<_>>()?;
    let cat_cols: Vec<Vec<String>> = cat_names
        .iter()
        .map(|name| column_as_strings(train, name))
        .collect::<Result<_>>()?;

    // Standardization factors for the distance metric
    let scales: Vec<f64> = num_cols
        .iter()
        .map(|values| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            if std > 0.0 {
                std
            } else {
                1.0
            }
        })
        .collect();

    let distance = |a: usize, b: usize| -> f64 {
        let mut d = 0.0;
        for (col, scale) in num_cols.iter().zip(scales.iter()) {
            let diff = (col[a] - col[b]) / scale;
            d += diff * diff;
        }
        for col in &cat_cols {
            if col[a] != col[b] {
                d += 1.0;
            }
        }
        d
    };

    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let mut synthetic_num: Vec<Vec<f64>> = Vec::new();
    let mut synthetic_cat: Vec<Vec<String>> = Vec::new();

    for &seed_row in &minority_idx {
        // k nearest minority neighbours, deterministic order
        let mut candidates: Vec<(f64, usize)> = minority_idx
            .iter()
            .filter(|&&other| other != seed_row)
            .map(|&other| (distance(seed_row, other), other))
            .collect();
        candidates.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        let neighbours: Vec<usize> = candidates
            .iter()
            .take(neighbors_used)
            .map(|(_, idx)| *idx)
            .collect();

        let voted_cats: Vec<String> = (0..cat_cols.len())
            .map(|c| majority_vote(&cat_cols[c], &neighbours))
            .collect();

        for _ in 0..cfg.over {
            let pick = neighbours[rng.gen_range(0..neighbours.len())];
            let gap: f64 = rng.gen();

            let row_num: Vec<f64> = num_cols
                .iter()
                .map(|col| col[seed_row] + gap * (col[pick] - col[seed_row]))
                .collect();

            synthetic_num.push(row_num);
            synthetic_cat.push(voted_cats.clone());
        }
    }

    let synthetic_rows = synthetic_num.len();

    // Majority undersampling: keep under x synthetic_count rows
    let n_keep = if synthetic_rows == 0 {
        majority_idx.len()
    } else {
        ((cfg.under * synthetic_rows as f64).round() as usize).min(majority_idx.len())
    };
    let mut shuffled_majority = majority_idx.clone();
    shuffled_majority.shuffle(&mut rng);
    let mut kept_majority: Vec<usize> = shuffled_majority[..n_keep].to_vec();
    kept_majority.sort_unstable();

    let mut kept: Vec<usize> = minority_idx.iter().chain(kept_majority.iter()).copied().collect();
    kept.sort_unstable();

    // Reassemble: original kept rows first, synthetic rows appended
    let mut columns: Vec<Column> = Vec::with_capacity(train.width());
    for column in train.get_columns() {
        let name = column.name().to_string();
        if name == target {
            let mut values: Vec<String> = kept.iter().map(|&i| labels[i].clone()).collect();
            values.extend(std::iter::repeat(minority_label.clone()).take(synthetic_rows));
            columns.push(Column::new(name.into(), values));
        } else if let Some(pos) = num_names.iter().position(|n| *n == name) {
            let mut values: Vec<f64> = kept.iter().map(|&i| num_cols[pos][i]).collect();
            values.extend(synthetic_num.iter().map(|row| row[pos]));
            columns.push(Column::new(name.into(), values));
        } else {
            let pos = cat_names
                .iter()
                .position(|n| *n == name)
                .expect("column classified as categorical");
            let mut values: Vec<String> = kept.iter().map(|&i| cat_cols[pos][i].clone()).collect();
            values.extend(synthetic_cat.iter().map(|row| row[pos].clone()));
            columns.push(Column::new(name.into(), values));
        }
    }

    Ok(BalanceOutcome {
        df: DataFrame::new(columns)?,
        minority_label,
        synthetic_rows,
        removed_majority_rows: majority_idx.len() - n_keep,
        neighbors_used,
    })
}

/// Majority vote over `indices` into `values`; ties go to the value of the
/// nearest neighbour (first index).
fn majority_vote(values: &[String], indices: &[usize]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for &idx in indices {
        *counts.entry(values[idx].as_str()).or_insert(0) += 1;
    }
    let best = counts.values().copied().max().unwrap_or(0);

    indices
        .iter()
        .map(|&idx| values[idx].as_str())
        .find(|value| counts.get(*value) == Some(&best))
        .unwrap_or_default()
        .to_string()
}
