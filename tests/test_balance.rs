//! Integration tests for stratified splitting and rebalancing

use churnscope::pipeline::{
    smote_resample, stratified_split, target_as_bool, BalanceConfig, TARGET_COLUMN,
};

#[path = "common/mod.rs"]
mod common;

use common::*;

fn churn_share(df: &polars::prelude::DataFrame) -> f64 {
    let y = target_as_bool(df).unwrap();
    y.iter().filter(|c| **c).count() as f64 / y.len() as f64
}

#[test]
fn test_split_preserves_class_shares() {
    let df = create_clean_dataframe(600, 17);
    let (train, test) = stratified_split(&df, TARGET_COLUMN, 0.3, 1).unwrap();

    assert_eq!(train.height() + test.height(), df.height());

    let full = churn_share(&df);
    assert!((churn_share(&train) - full).abs() < 0.02);
    assert!((churn_share(&test) - full).abs() < 0.02);
}

#[test]
fn test_rebalancing_raises_minority_share_monotonically() {
    let df = create_clean_dataframe(600, 17);
    let (train, _test) = stratified_split(&df, TARGET_COLUMN, 0.3, 1).unwrap();

    let before = churn_share(&train);
    let outcome = smote_resample(&train, TARGET_COLUMN, &BalanceConfig::default()).unwrap();
    let after = churn_share(&outcome.df);

    assert!(
        after > before,
        "minority share must strictly increase: {:.3} -> {:.3}",
        before,
        after
    );
    assert_eq!(outcome.minority_label, "Yes");
}

#[test]
fn test_rebalanced_frame_keeps_schema_and_kinds() {
    let df = create_clean_dataframe(400, 9);
    let (train, _) = stratified_split(&df, TARGET_COLUMN, 0.3, 1).unwrap();
    let outcome = smote_resample(&train, TARGET_COLUMN, &BalanceConfig::default()).unwrap();

    let before: Vec<String> = train.get_column_names().iter().map(|s| s.to_string()).collect();
    let after: Vec<String> = outcome.df.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(before, after);
}

#[test]
fn test_full_stage_chain_is_deterministic() {
    let df = create_clean_dataframe(500, 23);

    let run = || {
        let (train, _) = stratified_split(&df, TARGET_COLUMN, 0.3, 1).unwrap();
        smote_resample(&train, TARGET_COLUMN, &BalanceConfig::default())
            .unwrap()
            .df
    };

    assert!(run().equals(&run()));
}

#[test]
fn test_test_partition_is_never_resampled() {
    let df = create_clean_dataframe(500, 23);
    let (train, test) = stratified_split(&df, TARGET_COLUMN, 0.3, 1).unwrap();
    let test_before = test.clone();

    let _ = smote_resample(&train, TARGET_COLUMN, &BalanceConfig::default()).unwrap();

    assert!(test.equals(&test_before));
}
