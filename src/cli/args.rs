//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

/// Churnscope - analyze customer attrition and compare classifier families
#[derive(Parser, Debug)]
#[command(name = "churnscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input CSV file with the fixed account schema (header row required)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Fraction of rows held out as the test partition
    #[arg(long, default_value = "0.3", value_parser = validate_fraction)]
    pub test_fraction: f64,

    /// Random seed for the stratified train/test split
    #[arg(long, default_value = "1")]
    pub split_seed: u64,

    /// Random seed for model training (cross-validation shuffle,
    /// bootstrap sampling, synthetic oversampling, permutation shuffles)
    #[arg(long, default_value = "21")]
    pub model_seed: u64,

    /// Synthetic rows generated per minority-class row during rebalancing
    #[arg(long, default_value = "1")]
    pub over: usize,

    /// Majority rows kept per synthetic row during undersampling
    #[arg(long, default_value = "2.0")]
    pub under: f64,

    /// Nearest same-class neighbours considered when synthesizing rows.
    /// Reduced automatically when the minority class is smaller.
    #[arg(long, default_value = "5")]
    pub neighbors: usize,

    /// Cross-validation fold count
    #[arg(long, default_value = "10")]
    pub folds: usize,

    /// Significance threshold for the chi-squared independence tests
    #[arg(long, default_value = "0.05", value_parser = validate_fraction)]
    pub alpha: f64,

    /// Attributes taken from the top of either importance ranking
    #[arg(long, default_value = "10")]
    pub top_n: usize,

    /// Trees in the bagged ensemble (importance ranking and forest model)
    #[arg(long, default_value = "500")]
    pub trees: usize,

    /// Abort if more than this fraction of rows is dropped for missing
    /// total charges
    #[arg(long, default_value = "0.05", value_parser = validate_fraction)]
    pub max_drop_fraction: f64,

    /// Run feature selection on the train partition only instead of the
    /// full dataset (stricter, avoids leaking test information)
    #[arg(long, default_value = "false")]
    pub select_on_train: bool,

    /// Skip the descriptive summary tables
    #[arg(long, default_value = "false")]
    pub no_explore: bool,

    /// Write the full run report as JSON next to the input file
    #[arg(long, default_value = "false")]
    pub json_report: bool,
}

impl Cli {
    /// Path for the JSON run report, derived from the input file.
    pub fn report_path(&self) -> PathBuf {
        let parent = self
            .input
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."));
        let stem = self
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("churnscope");
        parent.join(format!("{}_churn_report.json", stem))
    }
}

/// Validator for parameters that must lie in (0, 1)
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..1.0).contains(&value) || value == 0.0 {
        Err(format!("value must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_path_derived_from_input() {
        let cli = Cli::parse_from(["churnscope", "-i", "/data/accounts.csv"]);
        assert_eq!(
            cli.report_path(),
            PathBuf::from("/data/accounts_churn_report.json")
        );
    }

    #[test]
    fn test_defaults_match_documented_configuration() {
        let cli = Cli::parse_from(["churnscope", "-i", "in.csv"]);
        assert_eq!(cli.test_fraction, 0.3);
        assert_eq!(cli.split_seed, 1);
        assert_eq!(cli.model_seed, 21);
        assert_eq!(cli.folds, 10);
        assert_eq!(cli.alpha, 0.05);
        assert_eq!(cli.top_n, 10);
    }

    #[test]
    fn test_fraction_validator_rejects_out_of_range() {
        assert!(validate_fraction("0.5").is_ok());
        assert!(validate_fraction("0.0").is_err());
        assert!(validate_fraction("1.5").is_err());
        assert!(validate_fraction("abc").is_err());
    }
}
