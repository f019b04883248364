//! Descriptive reporter: summary tables and comparison charts
//!
//! Purely presentational; nothing computed here feeds a later stage.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Table};
use console::style;
use polars::prelude::*;

use super::loader::{column_as_f64, column_as_strings, target_as_bool, NUMERIC_COLUMNS};
use crate::utils::unicode_bar;

/// Demographic attributes shown in the exploration battery
const DEMOGRAPHIC_COLUMNS: [&str; 4] = ["gender", "SeniorCitizen", "Partner", "Dependents"];

/// Contract/service-mix attributes shown in the exploration battery
const SERVICE_COLUMNS: [&str; 4] = ["Contract", "InternetService", "PaymentMethod", "PhoneService"];

/// Per-level summary of a categorical attribute against churn
#[derive(Debug, Clone)]
pub struct LevelSummary {
    pub level: String,
    pub count: usize,
    /// Share of all customers in this level
    pub share: f64,
    /// Churn rate within this level
    pub churn_rate: f64,
}

/// Five-number-ish summary of a numeric attribute
#[derive(Debug, Clone)]
pub struct NumericSummary {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Numeric attribute summarized separately for churned and retained rows
#[derive(Debug, Clone)]
pub struct GroupedNumeric {
    pub column: String,
    pub churned: NumericSummary,
    pub retained: NumericSummary,
}

/// Break a categorical attribute down by level: count, share, churn rate.
/// Levels are ordered by count descending, then name, for stable output.
pub fn categorical_breakdown(df: &DataFrame, column: &str) -> Result<Vec<LevelSummary>> {
    use std::collections::BTreeMap;

    let values = column_as_strings(df, column)?;
    let churned = target_as_bool(df)?;
    let total = values.len();

    let mut counts: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for (value, is_churned) in values.iter().zip(churned.iter()) {
        let entry = counts.entry(value.clone()).or_insert((0, 0));
        entry.0 += 1;
        if *is_churned {
            entry.1 += 1;
        }
    }

    let mut summaries: Vec<LevelSummary> = counts
        .into_iter()
        .map(|(level, (count, churn_count))| LevelSummary {
            level,
            count,
            share: count as f64 / total.max(1) as f64,
            churn_rate: churn_count as f64 / count.max(1) as f64,
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then(a.level.cmp(&b.level)));
    Ok(summaries)
}

/// Summarize a slice of numeric values.
pub fn numeric_summary(values: &[f64]) -> NumericSummary {
    if values.is_empty() {
        return NumericSummary {
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
        };
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = if values.len() > 1 {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)
    } else {
        0.0
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };

    NumericSummary {
        mean,
        median,
        std: variance.sqrt(),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
    }
}

/// Summarize a numeric attribute grouped by the churn flag.
pub fn numeric_by_churn(df: &DataFrame, column: &str) -> Result<GroupedNumeric> {
    let values = column_as_f64(df, column)?;
    let churned = target_as_bool(df)?;

    let mut churn_vals = Vec::new();
    let mut retain_vals = Vec::new();
    for (value, is_churned) in values.iter().zip(churned.iter()) {
        if *is_churned {
            churn_vals.push(*value);
        } else {
            retain_vals.push(*value);
        }
    }

    Ok(GroupedNumeric {
        column: column.to_string(),
        churned: numeric_summary(&churn_vals),
        retained: numeric_summary(&retain_vals),
    })
}

/// Single-pass Pearson correlation (Welford update for stability).
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }

    let mut n = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (&x, &y) in a.iter().zip(b.iter()) {
        n += 1.0;
        let dx = x - mean_x;
        let dy = y - mean_y;
        mean_x += dx / n;
        mean_y += dy / n;
        var_x += dx * (x - mean_x);
        var_y += dy * (y - mean_y);
        cov_xy += dx * (y - mean_y);
    }

    let std_x = (var_x / n).sqrt();
    let std_y = (var_y / n).sqrt();
    if std_x == 0.0 || std_y == 0.0 {
        return None;
    }

    Some(cov_xy / (n * std_x * std_y))
}

/// Pairwise Pearson correlations of the numeric attributes (upper triangle).
pub fn numeric_correlations(df: &DataFrame) -> Result<Vec<(String, String, f64)>> {
    let mut pairs = Vec::new();
    for (i, a) in NUMERIC_COLUMNS.iter().enumerate() {
        let va = column_as_f64(df, a)?;
        for b in NUMERIC_COLUMNS.iter().skip(i + 1) {
            let vb = column_as_f64(df, b)?;
            if let Some(r) = pearson(&va, &vb) {
                pairs.push((a.to_string(), b.to_string(), r));
            }
        }
    }
    Ok(pairs)
}

/// Print the full exploration battery: demographics, contract/service mix,
/// numeric summaries by churn, numeric correlation pairs.
pub fn render_exploration(df: &DataFrame) -> Result<()> {
    let churned = target_as_bool(df)?;
    let churn_rate = churned.iter().filter(|c| **c).count() as f64 / churned.len().max(1) as f64;

    println!(
        "      Overall churn rate: {} of {} customers",
        style(format!("{:.1}%", churn_rate * 100.0)).yellow().bold(),
        df.height()
    );

    print_group_heading("Demographics");
    for column in DEMOGRAPHIC_COLUMNS {
        render_breakdown_table(df, column)?;
    }

    print_group_heading("Contract and service mix");
    for column in SERVICE_COLUMNS {
        render_breakdown_table(df, column)?;
    }

    print_group_heading("Tenure and charges by churn");
    render_numeric_table(df)?;

    print_group_heading("Numeric correlations");
    for (a, b, r) in numeric_correlations(df)? {
        println!(
            "      {:<14} ~ {:<14} r = {}",
            a,
            b,
            style(format!("{:+.3}", r)).yellow()
        );
    }

    Ok(())
}

fn print_group_heading(title: &str) {
    println!();
    println!("      {}", style(title).white().bold());
}

fn render_breakdown_table(df: &DataFrame, column: &str) -> Result<()> {
    let summaries = categorical_breakdown(df, column)?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new(column).add_attribute(Attribute::Bold),
        Cell::new("Customers"),
        Cell::new("Share"),
        Cell::new("Churn"),
        Cell::new(""),
    ]);

    for summary in &summaries {
        table.add_row(vec![
            Cell::new(&summary.level),
            Cell::new(summary.count),
            Cell::new(format!("{:.1}%", summary.share * 100.0)),
            Cell::new(format!("{:.1}%", summary.churn_rate * 100.0)),
            Cell::new(unicode_bar(summary.churn_rate, 12)),
        ]);
    }

    for line in table.to_string().lines() {
        println!("      {}", line);
    }
    Ok(())
}

fn render_numeric_table(df: &DataFrame) -> Result<()> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Attribute").add_attribute(Attribute::Bold),
        Cell::new("Group"),
        Cell::new("Mean"),
        Cell::new("Median"),
        Cell::new("Std"),
        Cell::new("Min"),
        Cell::new("Max"),
    ]);

    for column in NUMERIC_COLUMNS {
        let grouped = numeric_by_churn(df, column)?;
        for (group, stats) in [("churned", &grouped.churned), ("retained", &grouped.retained)] {
            table.add_row(vec![
                Cell::new(column),
                Cell::new(group),
                Cell::new(format!("{:.2}", stats.mean)),
                Cell::new(format!("{:.2}", stats.median)),
                Cell::new(format!("{:.2}", stats.std)),
                Cell::new(format!("{:.2}", stats.min)),
                Cell::new(format!("{:.2}", stats.max)),
            ]);
        }
    }

    for line in table.to_string().lines() {
        println!("      {}", line);
    }
    Ok(())
}
