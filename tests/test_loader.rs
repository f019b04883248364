//! Integration tests for CSV loading and cleaning

use churnscope::pipeline::{column_as_strings, load_dataset, CATEGORICAL_COLUMNS, ID_COLUMN};

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_load_drops_blank_totals_and_reports_them() {
    let mut raw = create_raw_dataframe(200, 11, 20); // 10 blank totals
    let (_temp_dir, csv_path) = create_temp_csv(&mut raw);

    let (df, report) = load_dataset(&csv_path, 0.1).unwrap();

    assert_eq!(report.rows_read, 200);
    assert_eq!(report.rows_dropped, 10);
    assert_eq!(df.height(), 190);
}

#[test]
fn test_load_fails_when_too_many_totals_missing() {
    let mut raw = create_raw_dataframe(100, 11, 4); // 25% blanks
    let (_temp_dir, csv_path) = create_temp_csv(&mut raw);

    let result = load_dataset(&csv_path, 0.05);
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("missing total charges"));
}

#[test]
fn test_cleaned_dataset_has_no_nulls_and_no_identifier() {
    let mut raw = create_raw_dataframe(150, 3, 15);
    let (_temp_dir, csv_path) = create_temp_csv(&mut raw);

    let (df, _) = load_dataset(&csv_path, 0.1).unwrap();

    assert!(df.column(ID_COLUMN).is_err());
    for column in df.get_columns() {
        assert_eq!(
            column.null_count(),
            0,
            "column '{}' still has nulls after cleaning",
            column.name()
        );
    }
}

#[test]
fn test_cleaned_categoricals_use_canonical_tokens() {
    let mut raw = create_raw_dataframe(150, 5, 0);
    let (_temp_dir, csv_path) = create_temp_csv(&mut raw);

    let (df, report) = load_dataset(&csv_path, 0.1).unwrap();
    assert!(report.unmapped.is_empty());

    let internet = column_as_strings(&df, "InternetService").unwrap();
    assert!(internet
        .iter()
        .all(|v| v == "DSL" || v == "Fiber" || v == "None"));

    let contract = column_as_strings(&df, "Contract").unwrap();
    assert!(contract
        .iter()
        .all(|v| v == "Monthly" || v == "OneYear" || v == "TwoYear"));

    // no compound "no service" level survives anywhere
    for name in CATEGORICAL_COLUMNS {
        let values = column_as_strings(&df, name).unwrap();
        assert!(
            values.iter().all(|v| !v.contains("service")),
            "column '{}' still has a compound level",
            name
        );
    }
}

#[test]
fn test_missing_input_file_is_a_clean_error() {
    let result = load_dataset(std::path::Path::new("/nonexistent/accounts.csv"), 0.05);
    assert!(result.is_err());
}
