//! JSON export of the full analysis run

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::eval::Evaluation;
use crate::pipeline::{CleanReport, FeatureSelection};

use super::OddsRatio;

/// Metadata about the analysis run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the analysis (ISO 8601 format)
    pub timestamp: String,
    /// Churnscope version
    pub churnscope_version: String,
    /// Input file path
    pub input_file: String,
    pub test_fraction: f64,
    pub split_seed: u64,
    pub model_seed: u64,
    pub folds: usize,
}

/// Complete run report written next to the input file
#[derive(Serialize)]
pub struct RunReport<'a> {
    pub metadata: RunMetadata,
    pub cleaning: &'a CleanReport,
    pub selection: &'a FeatureSelection,
    pub evaluations: &'a [Evaluation],
    pub odds_ratios: &'a [OddsRatio],
}

impl RunMetadata {
    pub fn new(
        input_file: &Path,
        test_fraction: f64,
        split_seed: u64,
        model_seed: u64,
        folds: usize,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            churnscope_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.display().to_string(),
            test_fraction,
            split_seed,
            model_seed,
            folds,
        }
    }
}

/// Serialize the report as pretty JSON to `path`.
pub fn write_report(path: &Path, report: &RunReport<'_>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write report file: {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CleanReport;

    #[test]
    fn test_report_serializes_round_trippable_json() {
        let cleaning = CleanReport {
            rows_read: 10,
            rows_dropped: 1,
            unmapped: vec![],
        };
        let selection = FeatureSelection {
            chi_tests: vec![],
            importance: vec![],
            selected: vec!["tenure".to_string()],
            dropped_collinear: vec!["TotalCharges".to_string()],
        };
        let report = RunReport {
            metadata: RunMetadata::new(Path::new("accounts.csv"), 0.3, 1, 21, 10),
            cleaning: &cleaning,
            selection: &selection,
            evaluations: &[],
            odds_ratios: &[],
        };

        let json = serde_json::to_string(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["cleaning"]["rows_read"], 10);
        assert_eq!(value["selection"]["selected"][0], "tenure");
    }
}
