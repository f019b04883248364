//! Churnscope: Customer-Attrition Analysis CLI
//!
//! One-shot batch pipeline: load and clean the account file, print the
//! descriptive battery, split and rebalance, select predictors, train the
//! four classifier families with cross-validation, score them on the
//! held-out partition, and print the ranked comparison and odds ratios.

mod cli;
mod eval;
mod models;
mod pipeline;
mod report;
mod utils;

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use cli::Cli;
use eval::{evaluate, Evaluation};
use models::{cross_validate, train_family, ChurnClassifier, ModelFamily, TrainConfig};
use pipeline::{
    load_dataset, render_exploration, select_features, smote_resample, stratified_split,
    BalanceConfig, Encoder, SelectionConfig, TARGET_COLUMN,
};
use report::{odds_ratios, render_comparison, render_odds, write_report, RunMetadata, RunReport};
use utils::{
    create_spinner, finish_with_success, print_banner, print_completion, print_config, print_info,
    print_step_header, print_step_time, print_success, print_warning,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        &cli.input,
        cli.test_fraction,
        cli.split_seed,
        cli.model_seed,
        cli.folds,
    );

    // Step 1: Load and clean
    print_step_header(1, "Load & Clean");
    let step_start = Instant::now();
    let (df, clean_report) = load_dataset(&cli.input, cli.max_drop_fraction)?;

    print_success("Dataset loaded");
    println!(
        "      Rows: {} read, {} dropped for missing total charges, {} kept",
        clean_report.rows_read,
        style(clean_report.rows_dropped).yellow(),
        style(df.height()).green()
    );
    for unmapped in &clean_report.unmapped {
        print_warning(&format!(
            "unmapped value '{}' in column '{}' defaulted to 'Other' ({} row(s))",
            unmapped.value, unmapped.column, unmapped.count
        ));
    }
    print_step_time(step_start.elapsed());

    // Step 2: Descriptive summaries
    if !cli.no_explore {
        print_step_header(2, "Descriptive Summaries");
        let step_start = Instant::now();
        render_exploration(&df)?;
        print_step_time(step_start.elapsed());
    }

    // Step 3: Split and rebalance
    print_step_header(3, "Split & Rebalance");
    let step_start = Instant::now();

    let (train, test) = stratified_split(&df, TARGET_COLUMN, cli.test_fraction, cli.split_seed)?;
    println!(
        "      Train: {} rows, Test: {} rows (test never resampled)",
        train.height(),
        test.height()
    );

    let balance_cfg = BalanceConfig {
        over: cli.over,
        under: cli.under,
        neighbors: cli.neighbors,
        seed: cli.model_seed,
    };
    let balanced = smote_resample(&train, TARGET_COLUMN, &balance_cfg)?;
    if balanced.neighbors_used < cli.neighbors {
        print_info(&format!(
            "neighbour count reduced to {} for the small minority class",
            balanced.neighbors_used
        ));
    }
    println!(
        "      Synthesized {} '{}' rows, removed {} majority rows: {} rows for training",
        style(balanced.synthetic_rows).yellow(),
        balanced.minority_label,
        style(balanced.removed_majority_rows).yellow(),
        style(balanced.df.height()).green()
    );
    print_success("Training partition rebalanced");
    print_step_time(step_start.elapsed());

    // Step 4: Feature selection
    print_step_header(4, "Feature Selection");
    let step_start = Instant::now();

    let selection_cfg = SelectionConfig {
        alpha: cli.alpha,
        top_n: cli.top_n,
        trees: cli.trees,
        seed: cli.model_seed,
        ..SelectionConfig::default()
    };
    let selection_frame = if cli.select_on_train { &train } else { &df };
    if cli.select_on_train {
        print_info("selecting features on the train partition only");
    }

    let spinner = create_spinner("Running independence tests and importance ranking...");
    let selection = select_features(selection_frame, TARGET_COLUMN, &selection_cfg)?;
    finish_with_success(&spinner, "Feature selection complete");

    let significant = selection.chi_tests.iter().filter(|t| t.significant).count();
    println!(
        "      {} of {} categorical attributes significant at alpha = {}",
        style(significant).yellow(),
        selection.chi_tests.len(),
        cli.alpha
    );
    for dropped in &selection.dropped_collinear {
        print_info(&format!("dropped '{}' as collinear", dropped));
    }
    println!(
        "      Feature set ({}): {}",
        selection.selected.len(),
        style(selection.selected.join(", ")).cyan()
    );
    print_step_time(step_start.elapsed());

    // Step 5: Model training and test-partition scoring
    print_step_header(5, "Model Training & Evaluation");
    let step_start = Instant::now();

    let encoder = Encoder::fit(&balanced.df, &selection.selected)?;
    let x_train = encoder.transform(&balanced.df)?;
    let y_train = pipeline::target_as_bool(&balanced.df)?;
    let x_test = encoder.transform(&test)?;
    let y_test = pipeline::target_as_bool(&test)?;

    let train_cfg = TrainConfig {
        seed: cli.model_seed,
        trees: cli.trees,
    };

    let mut fitted: Vec<Box<dyn ChurnClassifier>> = Vec::new();
    let mut evaluations: Vec<Evaluation> = Vec::new();

    for family in ModelFamily::ALL {
        let spinner = create_spinner(&format!("Training {} ({}-fold CV)...", family, cli.folds));
        let cv = cross_validate(family, &x_train, &y_train, cli.folds, &train_cfg)
            .with_context(|| format!("Cross-validation failed for {}", family))?;
        let model = train_family(family, &x_train, &y_train, &train_cfg)
            .with_context(|| format!("Training failed for {}", family))?;
        finish_with_success(
            &spinner,
            &format!("{} trained (CV AUC {:.3})", family, cv.mean()),
        );

        let evaluation = evaluate(model.as_ref(), &x_test, &y_test, &cv)?;
        fitted.push(model);
        evaluations.push(evaluation);
    }
    print_step_time(step_start.elapsed());

    // Step 6: Comparison report
    print_step_header(6, "Comparison Report");
    render_comparison(&evaluations);

    // Odds ratios come from the logistic model, the one family whose
    // coefficients are log-odds
    let logistic = fitted
        .iter()
        .find(|model| model.family() == ModelFamily::Logistic)
        .and_then(|model| model.coefficients());

    let ratios = match logistic {
        Some((coefficients, _intercept)) => {
            let ranked = report::ranked(&evaluations);
            if let Some(best) = ranked.first() {
                if best.family != ModelFamily::Logistic.to_string() {
                    print_info(&format!(
                        "best model by AUC is {}; odds ratios below are from the logistic fit",
                        best.family
                    ));
                }
            }
            let ratios = odds_ratios(&encoder.column_names(), &coefficients, encoder.scaler());
            render_odds(&ModelFamily::Logistic.to_string(), &ratios);
            ratios
        }
        None => Vec::new(),
    };

    // Optional JSON artifact
    if cli.json_report {
        let path = cli.report_path();
        let report = RunReport {
            metadata: RunMetadata::new(
                &cli.input,
                cli.test_fraction,
                cli.split_seed,
                cli.model_seed,
                cli.folds,
            ),
            cleaning: &clean_report,
            selection: &selection,
            evaluations: &evaluations,
            odds_ratios: &ratios,
        };
        write_report(&path, &report)?;
        print_success(&format!("Report written to {}", path.display()));
    }

    print_completion();
    Ok(())
}
