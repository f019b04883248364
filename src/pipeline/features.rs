//! Feature selection: independence tests and ensemble importance
//!
//! Two sub-steps feed the final predictor list. Chi-squared tests of
//! independence flag categorical attributes that carry no signal about
//! churn; a bagged forest over all attributes ranks them by impurity
//! decrease and by permutation accuracy drop. The selected set is the
//! union of significant and top-ranked attributes, pruned greedily of
//! numeric attributes collinear with an already-selected one.

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF};
use std::collections::BTreeMap;

use super::encode::Encoder;
use super::explore::pearson;
use super::loader::{column_as_f64, column_as_strings, labels_as_bool};
use crate::models::{forest, ChurnClassifier, ForestConfig};

/// Selection parameters
#[derive(Debug, Clone)]
pub struct SelectionConfig {
    /// Significance threshold for the independence tests
    pub alpha: f64,
    /// Attributes taken from the top of either importance ranking
    pub top_n: usize,
    /// Trees in the importance forest
    pub trees: usize,
    pub seed: u64,
    /// |Pearson r| above which two numeric attributes count as collinear
    pub collinearity_threshold: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            top_n: 10,
            trees: 500,
            seed: 21,
            collinearity_threshold: 0.8,
        }
    }
}

/// Result of one chi-squared independence test against the target
#[derive(Debug, Clone, Serialize)]
pub struct ChiSquareTest {
    pub feature: String,
    pub statistic: f64,
    pub df: usize,
    pub p_value: f64,
    pub significant: bool,
}

/// Importance scores of one attribute under both rankings
#[derive(Debug, Clone, Serialize)]
pub struct AttributeImportance {
    pub feature: String,
    /// Mean impurity decrease across the ensemble (normalized)
    pub impurity: f64,
    /// Accuracy drop when the attribute's columns are permuted
    pub permutation: f64,
}

/// The full selection outcome, kept for the report
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSelection {
    pub chi_tests: Vec<ChiSquareTest>,
    pub importance: Vec<AttributeImportance>,
    pub selected: Vec<String>,
    pub dropped_collinear: Vec<String>,
}

/// Chi-squared independence test of every categorical column against the
/// boolean target. Single-level columns test as uninformative.
pub fn chi_square_tests(df: &DataFrame, target: &str, alpha: f64) -> Result<Vec<ChiSquareTest>> {
    let churned = labels_as_bool(df, target)?;
    let mut tests = Vec::new();

    for column in df.get_columns() {
        let name = column.name().to_string();
        if name == target || column.dtype().is_primitive_numeric() {
            continue;
        }

        let levels = column_as_strings(df, &name)?;
        let (statistic, dof) = independence_statistic(&levels, &churned);

        let p_value = if dof == 0 {
            1.0
        } else {
            ChiSquared::new(dof as f64)
                .context("invalid degrees of freedom")?
                .sf(statistic)
        };

        tests.push(ChiSquareTest {
            feature: name,
            statistic,
            df: dof,
            p_value,
            significant: p_value <= alpha,
        });
    }

    Ok(tests)
}

/// Chi-squared statistic and degrees of freedom of a levels-vs-target
/// contingency table.
fn independence_statistic(levels: &[String], churned: &[bool]) -> (f64, usize) {
    let n = levels.len() as f64;
    let mut counts: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for (level, is_churned) in levels.iter().zip(churned.iter()) {
        let entry = counts.entry(level.as_str()).or_insert((0.0, 0.0));
        if *is_churned {
            entry.0 += 1.0;
        } else {
            entry.1 += 1.0;
        }
    }

    let churn_total: f64 = counts.values().map(|(c, _)| c).sum();
    let retain_total: f64 = counts.values().map(|(_, r)| r).sum();
    if counts.len() < 2 || churn_total == 0.0 || retain_total == 0.0 {
        return (0.0, 0);
    }

    let mut statistic = 0.0;
    for (churn_count, retain_count) in counts.values() {
        let row_total = churn_count + retain_count;
        for (observed, col_total) in [(churn_count, churn_total), (retain_count, retain_total)] {
            let expected = row_total * col_total / n;
            statistic += (observed - expected).powi(2) / expected;
        }
    }

    (statistic, counts.len() - 1)
}

/// Rank every non-target attribute by impurity decrease and permutation
/// accuracy drop, using a seeded forest over the standardized encoding.
pub fn importance_ranking(
    df: &DataFrame,
    target: &str,
    cfg: &SelectionConfig,
) -> Result<Vec<AttributeImportance>> {
    let features: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|name| name != target)
        .collect();

    let encoder = Encoder::fit(df, &features)?;
    let x = encoder.transform(df)?;
    let y = labels_as_bool(df, target)?;

    let model = forest::train(
        &x,
        &y,
        &ForestConfig {
            n_trees: cfg.trees,
            seed: cfg.seed,
            ..ForestConfig::default()
        },
    )?;

    let baseline = accuracy(&model.predict(&x), &y);
    let column_importances = model.feature_importances();

    let mut rankings = Vec::with_capacity(features.len());
    for (attr_index, (source, columns)) in encoder.source_groups().iter().enumerate() {
        let impurity: f64 = columns.iter().map(|&c| column_importances[c]).sum();

        // permute the attribute's columns together, rows shuffled once
        let mut rng = StdRng::seed_from_u64(
            cfg.seed ^ (attr_index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15),
        );
        let mut order: Vec<usize> = (0..x.nrows()).collect();
        order.shuffle(&mut rng);

        let mut permuted = x.clone();
        for &col in columns {
            for (row, &from) in order.iter().enumerate() {
                permuted[[row, col]] = x[[from, col]];
            }
        }

        let dropped = baseline - accuracy(&model.predict(&permuted), &y);
        rankings.push(AttributeImportance {
            feature: source.clone(),
            impurity,
            permutation: dropped,
        });
    }

    Ok(rankings)
}

fn accuracy(predictions: &[bool], y: &[bool]) -> f64 {
    let correct = predictions.iter().zip(y.iter()).filter(|(p, t)| p == t).count();
    correct as f64 / y.len().max(1) as f64
}

/// Run both sub-steps and derive the final predictor list.
///
/// Candidates are the attributes in the top `top_n` of either importance
/// ranking, in impurity order, followed by any further chi-squared
/// significant attribute. A numeric candidate collinear with an
/// already-selected numeric attribute is dropped, greedily.
pub fn select_features(
    df: &DataFrame,
    target: &str,
    cfg: &SelectionConfig,
) -> Result<FeatureSelection> {
    let chi_tests = chi_square_tests(df, target, cfg.alpha)?;
    let importance = importance_ranking(df, target, cfg)?;

    let top_by = |key: fn(&AttributeImportance) -> f64| -> Vec<String> {
        let mut ranked: Vec<&AttributeImportance> = importance.iter().collect();
        ranked.sort_by(|a, b| {
            key(b)
                .partial_cmp(&key(a))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.feature.cmp(&b.feature))
        });
        ranked
            .into_iter()
            .take(cfg.top_n)
            .map(|r| r.feature.clone())
            .collect()
    };

    let top_impurity = top_by(|r| r.impurity);
    let top_permutation = top_by(|r| r.permutation);

    // candidates in impurity order, then remaining significant attributes
    let mut candidates: Vec<String> = Vec::new();
    for name in &top_impurity {
        if !candidates.contains(name) {
            candidates.push(name.clone());
        }
    }
    for name in &top_permutation {
        if !candidates.contains(name) {
            candidates.push(name.clone());
        }
    }
    for test in &chi_tests {
        if test.significant && !candidates.contains(&test.feature) {
            candidates.push(test.feature.clone());
        }
    }

    let mut selected: Vec<String> = Vec::new();
    let mut dropped_collinear: Vec<String> = Vec::new();
    let mut selected_numeric: Vec<(String, Vec<f64>)> = Vec::new();

    for name in candidates {
        let column = df.column(&name)?;
        if !column.dtype().is_primitive_numeric() {
            selected.push(name);
            continue;
        }

        let values = column_as_f64(df, &name)?;
        let collides = selected_numeric.iter().any(|(_, kept)| {
            pearson(kept, &values)
                .map(|r| r.abs() > cfg.collinearity_threshold)
                .unwrap_or(false)
        });

        if collides {
            dropped_collinear.push(name);
        } else {
            selected_numeric.push((name.clone(), values));
            selected.push(name);
        }
    }

    Ok(FeatureSelection {
        chi_tests,
        importance,
        selected,
        dropped_collinear,
    })
}
