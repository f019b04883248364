//! Odds-ratio interpretation of a linear model's coefficients
//!
//! Coefficients are learned in standardized space; here they are mapped
//! back to original units through the encoder's scaler before
//! exponentiation, so a dummy's odds ratio reads as level-vs-baseline and
//! a numeric's as per-unit change.

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Table};
use console::style;
use serde::Serialize;

use crate::pipeline::StandardScaler;

/// Threshold below which an odds ratio is reported as neutral
const NEUTRAL_BAND: f64 = 0.005;

/// One predictor's exponentiated coefficient and its reading
#[derive(Debug, Clone, Serialize)]
pub struct OddsRatio {
    pub predictor: String,
    /// Coefficient per original unit (de-standardized)
    pub coefficient: f64,
    pub odds_ratio: f64,
    pub interpretation: String,
}

/// Compute per-predictor odds ratios from standardized-space coefficients.
///
/// `names` and `coefficients` are aligned with the encoded matrix columns;
/// `scaler` holds that encoding's train-side statistics.
pub fn odds_ratios(
    names: &[String],
    coefficients: &[f64],
    scaler: &StandardScaler,
) -> Vec<OddsRatio> {
    names
        .iter()
        .zip(coefficients.iter())
        .zip(scaler.std().iter())
        .map(|((name, coef), std)| {
            let per_unit = coef / std;
            let ratio = per_unit.exp();
            OddsRatio {
                predictor: name.clone(),
                coefficient: per_unit,
                odds_ratio: ratio,
                interpretation: interpret(name, ratio),
            }
        })
        .collect()
}

/// Fixed directional sentence per predictor.
fn interpret(name: &str, ratio: f64) -> String {
    let pct = (ratio - 1.0).abs() * 100.0;

    if (ratio - 1.0).abs() < NEUTRAL_BAND {
        return format!("{} leaves the odds of churn essentially unchanged", name);
    }

    let direction = if ratio > 1.0 { "raises" } else { "lowers" };

    match name.split_once('=') {
        Some((source, level)) => format!(
            "{} = {} {} the odds of churn by {:.1}% versus the {} baseline",
            source, level, direction, pct, source
        ),
        None => format!(
            "each additional unit of {} {} the odds of churn by {:.1}%",
            name, direction, pct
        ),
    }
}

/// Print the odds-ratio table and the per-predictor narration.
pub fn render_odds(family: &str, ratios: &[OddsRatio]) {
    println!();
    println!(
        "    {} {}",
        style("▣").cyan(),
        style(format!("ODDS RATIOS ({})", family)).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut sorted: Vec<&OddsRatio> = ratios.iter().collect();
    sorted.sort_by(|a, b| {
        b.odds_ratio
            .partial_cmp(&a.odds_ratio)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Predictor").add_attribute(Attribute::Bold),
        Cell::new("Coefficient"),
        Cell::new("Odds ratio"),
    ]);

    for ratio in &sorted {
        table.add_row(vec![
            Cell::new(&ratio.predictor),
            Cell::new(format!("{:+.4}", ratio.coefficient)),
            Cell::new(format!("{:.3}", ratio.odds_ratio)),
        ]);
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }

    println!();
    for ratio in &sorted {
        println!("      {} {}", style("•").dim(), ratio.interpretation);
    }
}
