//! CLI integration tests

use assert_cmd::Command;
use predicates::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_help_lists_the_pipeline_knobs() {
    let mut cmd = Command::cargo_bin("churnscope").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--test-fraction"))
        .stdout(predicate::str::contains("--split-seed"))
        .stdout(predicate::str::contains("--folds"));
}

#[test]
fn test_missing_input_flag_fails() {
    let mut cmd = Command::cargo_bin("churnscope").unwrap();
    cmd.assert().failure();
}

#[test]
fn test_full_run_on_fixture_reports_all_models() {
    let mut raw = create_raw_dataframe(300, 91, 30);
    let (_temp_dir, csv_path) = create_temp_csv(&mut raw);

    let mut cmd = Command::cargo_bin("churnscope").unwrap();
    cmd.args([
        "--input",
        csv_path.to_str().unwrap(),
        "--no-explore",
        "--trees",
        "20",
        "--folds",
        "3",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("MODEL COMPARISON"))
    .stdout(predicate::str::contains("logistic regression"))
    .stdout(predicate::str::contains("quadratic discriminant"))
    .stdout(predicate::str::contains("linear SVM"))
    .stdout(predicate::str::contains("bagged forest"))
    .stdout(predicate::str::contains("ODDS RATIOS"));
}

#[test]
fn test_json_report_is_written_next_to_the_input() {
    let mut raw = create_raw_dataframe(300, 97, 0);
    let (temp_dir, csv_path) = create_temp_csv(&mut raw);

    let mut cmd = Command::cargo_bin("churnscope").unwrap();
    cmd.args([
        "--input",
        csv_path.to_str().unwrap(),
        "--no-explore",
        "--json-report",
        "--trees",
        "20",
        "--folds",
        "3",
    ])
    .assert()
    .success();

    let report_path = temp_dir.path().join("accounts_churn_report.json");
    assert!(report_path.exists());

    let contents = std::fs::read_to_string(report_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(value["evaluations"].as_array().unwrap().len(), 4);
    assert!(value["selection"]["selected"].as_array().unwrap().len() > 0);
}
