//! Dataset loader: CSV ingestion, cleaning, and categorical recoding
//!
//! The loader owns the fixed account schema: it validates the expected
//! columns, drops the identifier, removes rows with missing total charges,
//! and recodes every categorical attribute onto canonical tokens so that no
//! downstream stage ever sees a null or a free-text level.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;

/// Identifier column, dropped on load
pub const ID_COLUMN: &str = "customerID";

/// Binary churn target
pub const TARGET_COLUMN: &str = "Churn";

/// Label of the positive (churned) class
pub const POSITIVE_LABEL: &str = "Yes";

/// Numeric attributes of the schema
pub const NUMERIC_COLUMNS: [&str; 3] = ["tenure", "MonthlyCharges", "TotalCharges"];

/// Categorical attributes of the schema
pub const CATEGORICAL_COLUMNS: [&str; 16] = [
    "gender",
    "SeniorCitizen",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
];

/// Service columns carrying a compound "no service" level collapsed to "No"
const NO_SERVICE_COLUMNS: [&str; 7] = [
    "MultipleLines",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];

/// Catch-all level for unmapped categorical values
pub const DEFAULT_BUCKET: &str = "Other";

/// A categorical value that did not match any canonical token
#[derive(Debug, Clone, Serialize)]
pub struct UnmappedValue {
    pub column: String,
    pub value: String,
    pub count: usize,
}

/// What the cleaning pass did to the raw file
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    /// Rows in the raw file
    pub rows_read: usize,
    /// Rows dropped for a missing total-charge value
    pub rows_dropped: usize,
    /// Levels that fell into the catch-all bucket, for auditability
    pub unmapped: Vec<UnmappedValue>,
}

/// Load and clean the dataset from a CSV file.
///
/// Fails if a schema column is missing, if more than `max_drop_fraction` of
/// the rows lack a total-charge value, or if any null survives cleaning.
pub fn load_dataset(path: &Path, max_drop_fraction: f64) -> Result<(DataFrame, CleanReport)> {
    let lf = LazyCsvReader::new(path)
        .with_infer_schema_length(Some(1000))
        .finish()
        .with_context(|| format!("Failed to load CSV file: {}", path.display()))?;

    let df = lf
        .collect()
        .with_context(|| format!("Failed to read CSV file: {}", path.display()))?;

    clean_dataset(df, max_drop_fraction)
}

/// Clean an already-loaded raw DataFrame (separated from I/O for testing).
pub fn clean_dataset(df: DataFrame, max_drop_fraction: f64) -> Result<(DataFrame, CleanReport)> {
    validate_schema(&df)?;

    let mut report = CleanReport {
        rows_read: df.height(),
        ..Default::default()
    };

    let mut df = df
        .drop(ID_COLUMN)
        .with_context(|| format!("Failed to drop identifier column '{}'", ID_COLUMN))?;

    // TotalCharges arrives as text when the raw file encodes missing values
    // as blanks; coerce to Float64 with blanks mapped to null.
    coerce_total_charges(&mut df)?;

    let mask = df
        .column("TotalCharges")?
        .as_materialized_series()
        .is_not_null();
    let kept = df.filter(&mask)?;
    report.rows_dropped = df.height() - kept.height();
    df = kept;

    let drop_fraction = report.rows_dropped as f64 / report.rows_read.max(1) as f64;
    if drop_fraction > max_drop_fraction {
        anyhow::bail!(
            "Dropped {:.1}% of rows for missing total charges, above the {:.1}% limit - \
             inspect the input file before modeling",
            drop_fraction * 100.0,
            max_drop_fraction * 100.0
        );
    }

    // any null beyond the tolerated total-charge blanks is an error, not
    // something to paper over during recoding
    ensure_no_nulls(&df)?;

    recode_senior_citizen(&mut df)?;
    collapse_no_service_levels(&mut df)?;

    report
        .unmapped
        .extend(recode_with_map(&mut df, "InternetService", &INTERNET_MAP)?);
    report
        .unmapped
        .extend(recode_with_map(&mut df, "Contract", &CONTRACT_MAP)?);
    report
        .unmapped
        .extend(recode_with_map(&mut df, "PaymentMethod", &PAYMENT_MAP)?);

    validate_target(&df)?;

    Ok((df, report))
}

/// Canonical tokens for the internet-service type
const INTERNET_MAP: [(&str, &str); 3] = [("DSL", "DSL"), ("Fiber optic", "Fiber"), ("No", "None")];

/// Canonical tokens for the contract length
const CONTRACT_MAP: [(&str, &str); 3] = [
    ("Month-to-month", "Monthly"),
    ("One year", "OneYear"),
    ("Two year", "TwoYear"),
];

/// Canonical tokens for the payment method
const PAYMENT_MAP: [(&str, &str); 4] = [
    ("Electronic check", "ElectronicCheck"),
    ("Mailed check", "MailedCheck"),
    ("Bank transfer (automatic)", "BankTransfer"),
    ("Credit card (automatic)", "CreditCard"),
];

fn validate_schema(df: &DataFrame) -> Result<()> {
    let present: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

    let mut expected: Vec<&str> = vec![ID_COLUMN, TARGET_COLUMN];
    expected.extend(NUMERIC_COLUMNS);
    expected.extend(CATEGORICAL_COLUMNS);

    for col in expected {
        if !present.contains(&col.to_string()) {
            anyhow::bail!(
                "Input file is missing required column '{}'. Found columns: {:?}",
                col,
                present
            );
        }
    }
    Ok(())
}

fn coerce_total_charges(df: &mut DataFrame) -> Result<()> {
    let column = df.column("TotalCharges")?;

    let values: Vec<Option<f64>> = match column.dtype() {
        DataType::String => column
            .str()?
            .into_iter()
            .map(|v| v.and_then(|s| s.trim().parse::<f64>().ok()))
            .collect(),
        _ => column
            .cast(&DataType::Float64)
            .context("TotalCharges is neither text nor numeric")?
            .f64()?
            .into_iter()
            .collect(),
    };

    df.with_column(Column::new("TotalCharges".into(), values))?;
    Ok(())
}

fn recode_senior_citizen(df: &mut DataFrame) -> Result<()> {
    let column = df.column("SeniorCitizen")?;

    let values: Vec<String> = if column.dtype().is_primitive_numeric() {
        column
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| match v {
                Some(0) => "No".to_string(),
                Some(_) => "Yes".to_string(),
                None => String::new(),
            })
            .collect()
    } else {
        column
            .str()?
            .into_iter()
            .map(|v| match v {
                Some("0") => "No".to_string(),
                Some("1") => "Yes".to_string(),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect()
    };

    df.with_column(Column::new("SeniorCitizen".into(), values))?;
    Ok(())
}

fn collapse_no_service_levels(df: &mut DataFrame) -> Result<()> {
    for name in NO_SERVICE_COLUMNS {
        let column = df.column(name)?;
        let values: Vec<String> = column
            .str()
            .with_context(|| format!("Column '{}' is not categorical", name))?
            .into_iter()
            .map(|v| match v {
                Some("No internet service") | Some("No phone service") => "No".to_string(),
                Some(other) => other.to_string(),
                None => String::new(),
            })
            .collect();
        df.with_column(Column::new(name.into(), values))?;
    }
    Ok(())
}

/// Recode a column onto canonical tokens, bucketing unmapped levels.
///
/// Returns one `UnmappedValue` per distinct level that fell into the
/// catch-all bucket so the caller can surface them.
fn recode_with_map(
    df: &mut DataFrame,
    name: &str,
    map: &[(&str, &str)],
) -> Result<Vec<UnmappedValue>> {
    use std::collections::BTreeMap;

    let column = df.column(name)?;
    let mut unmapped: BTreeMap<String, usize> = BTreeMap::new();

    let values: Vec<String> = column
        .str()
        .with_context(|| format!("Column '{}' is not categorical", name))?
        .into_iter()
        .map(|v| match v {
            Some(raw) => match map.iter().find(|(from, _)| *from == raw) {
                Some((_, to)) => to.to_string(),
                None => {
                    *unmapped.entry(raw.to_string()).or_insert(0) += 1;
                    DEFAULT_BUCKET.to_string()
                }
            },
            None => String::new(),
        })
        .collect();

    df.with_column(Column::new(name.into(), values))?;

    Ok(unmapped
        .into_iter()
        .map(|(value, count)| UnmappedValue {
            column: name.to_string(),
            value,
            count,
        })
        .collect())
}

fn ensure_no_nulls(df: &DataFrame) -> Result<()> {
    for column in df.get_columns() {
        if column.null_count() > 0 {
            anyhow::bail!(
                "Column '{}' still contains {} null value(s) after cleaning",
                column.name(),
                column.null_count()
            );
        }
    }
    Ok(())
}

fn validate_target(df: &DataFrame) -> Result<()> {
    let target = df.column(TARGET_COLUMN)?;
    for value in target.str()?.into_iter().flatten() {
        if value != "Yes" && value != "No" {
            anyhow::bail!(
                "Target column '{}' contains unexpected value '{}' (expected Yes/No)",
                TARGET_COLUMN,
                value
            );
        }
    }
    Ok(())
}

/// Extract a categorical column as owned strings. Fails on nulls, which
/// cannot occur after cleaning.
pub fn column_as_strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    column
        .str()
        .with_context(|| format!("Column '{}' is not categorical", name))?
        .into_iter()
        .enumerate()
        .map(|(i, v)| {
            v.map(|s| s.to_string())
                .ok_or_else(|| anyhow::anyhow!("Null in column '{}' at row {}", name, i))
        })
        .collect()
}

/// Extract a numeric column as f64. Fails on nulls, which cannot occur
/// after cleaning.
pub fn column_as_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?;
    column
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", name))?
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or_else(|| anyhow::anyhow!("Null in column '{}' at row {}", name, i)))
        .collect()
}

/// Labels of a binary Yes/No column as booleans, true for `Yes`.
pub fn labels_as_bool(df: &DataFrame, column: &str) -> Result<Vec<bool>> {
    Ok(column_as_strings(df, column)?
        .iter()
        .map(|v| v == POSITIVE_LABEL)
        .collect())
}

/// Churn labels as booleans, true for the positive (churned) class.
pub fn target_as_bool(df: &DataFrame) -> Result<Vec<bool>> {
    labels_as_bool(df, TARGET_COLUMN)
}
