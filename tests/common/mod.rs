//! Shared test utilities and fixture generators

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use tempfile::TempDir;

/// Generate a raw account DataFrame with the full input schema, before any
/// cleaning: identifier column present, `TotalCharges` as text with one
/// blank every `blank_every` rows (0 disables blanks), compound
/// "no service" levels included.
///
/// Churn depends on contract type and tenure, so classifiers have real
/// signal to find. Deterministic for a given seed.
pub fn create_raw_dataframe(rows: usize, seed: u64, blank_every: usize) -> DataFrame {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut id = Vec::with_capacity(rows);
    let mut gender = Vec::with_capacity(rows);
    let mut senior = Vec::with_capacity(rows);
    let mut partner = Vec::with_capacity(rows);
    let mut dependents = Vec::with_capacity(rows);
    let mut tenure = Vec::with_capacity(rows);
    let mut phone = Vec::with_capacity(rows);
    let mut lines = Vec::with_capacity(rows);
    let mut internet = Vec::with_capacity(rows);
    let mut security = Vec::with_capacity(rows);
    let mut backup = Vec::with_capacity(rows);
    let mut protection = Vec::with_capacity(rows);
    let mut support = Vec::with_capacity(rows);
    let mut tv = Vec::with_capacity(rows);
    let mut movies = Vec::with_capacity(rows);
    let mut contract = Vec::with_capacity(rows);
    let mut paperless = Vec::with_capacity(rows);
    let mut payment = Vec::with_capacity(rows);
    let mut monthly = Vec::with_capacity(rows);
    let mut total = Vec::with_capacity(rows);
    let mut churn = Vec::with_capacity(rows);

    for i in 0..rows {
        id.push(format!("{:04}-CUST", i));
        gender.push(if rng.gen_bool(0.5) { "Female" } else { "Male" });
        senior.push(if rng.gen_bool(0.16) { 1i64 } else { 0 });
        partner.push(if rng.gen_bool(0.48) { "Yes" } else { "No" });
        dependents.push(if rng.gen_bool(0.3) { "Yes" } else { "No" });

        let months = rng.gen_range(1..=72i64);
        tenure.push(months);

        let has_phone = rng.gen_bool(0.9);
        phone.push(if has_phone { "Yes" } else { "No" });
        lines.push(if !has_phone {
            "No phone service"
        } else if rng.gen_bool(0.45) {
            "Yes"
        } else {
            "No"
        });

        let net = match rng.gen_range(0..10) {
            0..=3 => "DSL",
            4..=7 => "Fiber optic",
            _ => "No",
        };
        internet.push(net);
        for flags in [
            &mut security,
            &mut backup,
            &mut protection,
            &mut support,
            &mut tv,
            &mut movies,
        ] {
            flags.push(if net == "No" {
                "No internet service"
            } else if rng.gen_bool(0.4) {
                "Yes"
            } else {
                "No"
            });
        }

        let plan = match rng.gen_range(0..10) {
            0..=5 => "Month-to-month",
            6..=7 => "One year",
            _ => "Two year",
        };
        contract.push(plan);
        paperless.push(if rng.gen_bool(0.6) { "Yes" } else { "No" });
        payment.push(match rng.gen_range(0..4) {
            0 => "Electronic check",
            1 => "Mailed check",
            2 => "Bank transfer (automatic)",
            _ => "Credit card (automatic)",
        });

        let charge = 45.0 + rng.gen::<f64>() * 50.0;
        monthly.push((charge * 100.0).round() / 100.0);

        if blank_every > 0 && i % blank_every == blank_every - 1 {
            total.push(" ".to_string());
        } else {
            total.push(format!("{:.2}", charge * months as f64));
        }

        // churn signal: short-tenure month-to-month customers leave
        let mut p: f64 = match plan {
            "Month-to-month" => 0.42,
            "One year" => 0.16,
            _ => 0.06,
        };
        if months < 12 {
            p += 0.2;
        }
        churn.push(if rng.gen_bool(p.min(0.9)) { "Yes" } else { "No" });
    }

    df! {
        "customerID" => id,
        "gender" => gender,
        "SeniorCitizen" => senior,
        "Partner" => partner,
        "Dependents" => dependents,
        "tenure" => tenure,
        "PhoneService" => phone,
        "MultipleLines" => lines,
        "InternetService" => internet,
        "OnlineSecurity" => security,
        "OnlineBackup" => backup,
        "DeviceProtection" => protection,
        "TechSupport" => support,
        "StreamingTV" => tv,
        "StreamingMovies" => movies,
        "Contract" => contract,
        "PaperlessBilling" => paperless,
        "PaymentMethod" => payment,
        "MonthlyCharges" => monthly,
        "TotalCharges" => total,
        "Churn" => churn,
    }
    .unwrap()
}

/// A cleaned dataset, ready for the post-loader stages.
#[allow(dead_code)]
pub fn create_clean_dataframe(rows: usize, seed: u64) -> DataFrame {
    let raw = create_raw_dataframe(rows, seed, 0);
    let (df, _) = churnscope::pipeline::clean_dataset(raw, 0.2).unwrap();
    df
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("accounts.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Assert that a DataFrame has expected shape
#[allow(dead_code)]
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
#[allow(dead_code)]
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}
