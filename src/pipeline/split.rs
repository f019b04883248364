//! Stratified train/test partitioning
//!
//! The split shuffles each target class independently with a seeded
//! generator, so class proportions carry over to both partitions and the
//! same seed reproduces the same partitions bit for bit.

use anyhow::Result;
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;

use super::loader::column_as_strings;

/// Split `df` into (train, test) by stratified sampling on `target`.
///
/// `test_fraction` is the share of each class routed to the test partition,
/// rounded per class. Rows keep their original order inside each partition.
pub fn stratified_split(
    df: &DataFrame,
    target: &str,
    test_fraction: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame)> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        anyhow::bail!("test_fraction must lie in (0, 1), got {}", test_fraction);
    }

    let labels = column_as_strings(df, target)?;

    // BTreeMap keeps class iteration order deterministic
    let mut by_class: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        by_class.entry(label.clone()).or_default().push(idx);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train_idx: Vec<usize> = Vec::new();
    let mut test_idx: Vec<usize> = Vec::new();

    for (_, mut indices) in by_class {
        indices.shuffle(&mut rng);
        let n_train = ((indices.len() as f64) * (1.0 - test_fraction)).round() as usize;
        let n_train = n_train.min(indices.len());
        train_idx.extend_from_slice(&indices[..n_train]);
        test_idx.extend_from_slice(&indices[n_train..]);
    }

    // Restore row order inside each partition
    train_idx.sort_unstable();
    test_idx.sort_unstable();

    Ok((take_rows(df, &train_idx)?, take_rows(df, &test_idx)?))
}

/// Materialize the rows at `indices` as a new DataFrame.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: IdxCa = IdxCa::from_vec("idx".into(), indices.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(rows: usize, churn_every: usize) -> DataFrame {
        let tenure: Vec<f64> = (0..rows).map(|i| i as f64).collect();
        let churn: Vec<String> = (0..rows)
            .map(|i| if i % churn_every == 0 { "Yes" } else { "No" }.to_string())
            .collect();
        df! {
            "tenure" => tenure,
            "Churn" => churn,
        }
        .unwrap()
    }

    #[test]
    fn test_partitions_are_disjoint_and_cover_dataset() {
        let df = frame(100, 4);
        let (train, test) = stratified_split(&df, "Churn", 0.3, 1).unwrap();

        assert_eq!(train.height() + test.height(), 100);

        let train_ids = column_as_strings(&train, "Churn").unwrap().len();
        assert_eq!(train_ids, train.height());

        // tenure doubles as a row identifier here
        let mut seen: Vec<f64> = super::super::loader::column_as_f64(&train, "tenure")
            .unwrap()
            .into_iter()
            .chain(
                super::super::loader::column_as_f64(&test, "tenure")
                    .unwrap()
                    .into_iter(),
            )
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_split_proportions_match_fraction() {
        let df = frame(1000, 4);
        let (train, test) = stratified_split(&df, "Churn", 0.3, 1).unwrap();

        assert_eq!(train.height(), 700);
        assert_eq!(test.height(), 300);
    }

    #[test]
    fn test_split_is_stratified_per_class() {
        let df = frame(1000, 4); // 250 churned, 750 retained
        let (train, test) = stratified_split(&df, "Churn", 0.3, 1).unwrap();

        let train_churned = super::super::loader::target_as_bool(&train)
            .unwrap()
            .iter()
            .filter(|c| **c)
            .count();
        let test_churned = super::super::loader::target_as_bool(&test)
            .unwrap()
            .iter()
            .filter(|c| **c)
            .count();

        assert_eq!(train_churned, 175);
        assert_eq!(test_churned, 75);
    }

    #[test]
    fn test_split_is_deterministic_for_a_seed() {
        let df = frame(200, 5);
        let (train_a, test_a) = stratified_split(&df, "Churn", 0.3, 7).unwrap();
        let (train_b, test_b) = stratified_split(&df, "Churn", 0.3, 7).unwrap();

        assert!(train_a.equals(&train_b));
        assert!(test_a.equals(&test_b));

        let (train_c, _) = stratified_split(&df, "Churn", 0.3, 8).unwrap();
        assert!(!train_a.equals(&train_c));
    }

    #[test]
    fn test_invalid_fraction_is_an_error() {
        let df = frame(10, 2);
        assert!(stratified_split(&df, "Churn", 0.0, 1).is_err());
        assert!(stratified_split(&df, "Churn", 1.0, 1).is_err());
    }
}
