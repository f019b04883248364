//! Ranked model comparison table

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::eval::Evaluation;
use crate::utils::unicode_bar;

/// Evaluations sorted by test AUC, best first.
pub fn ranked(evaluations: &[Evaluation]) -> Vec<&Evaluation> {
    let mut sorted: Vec<&Evaluation> = evaluations.iter().collect();
    sorted.sort_by(|a, b| {
        b.auc
            .partial_cmp(&a.auc)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.family.cmp(&b.family))
    });
    sorted
}

/// Print the comparison table, best model highlighted.
pub fn render_comparison(evaluations: &[Evaluation]) {
    let sorted = ranked(evaluations);

    println!();
    println!(
        "    {} {}",
        style("▣").cyan(),
        style("MODEL COMPARISON").white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
    println!();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec![
        Cell::new("Model").add_attribute(Attribute::Bold),
        Cell::new("Accuracy"),
        Cell::new("Precision"),
        Cell::new("Recall"),
        Cell::new("Specificity"),
        Cell::new("F1"),
        Cell::new("AUC"),
        Cell::new("CV AUC"),
        Cell::new(""),
    ]);

    for (rank, eval) in sorted.iter().enumerate() {
        let name_cell = if rank == 0 {
            Cell::new(&eval.family)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold)
        } else {
            Cell::new(&eval.family)
        };

        table.add_row(vec![
            name_cell,
            Cell::new(format!("{:.3}", eval.accuracy)),
            Cell::new(format!("{:.3}", eval.precision)),
            Cell::new(format!("{:.3}", eval.recall)),
            Cell::new(format!("{:.3}", eval.specificity)),
            Cell::new(format!("{:.3}", eval.f1)),
            Cell::new(format!("{:.3}", eval.auc)),
            Cell::new(format!(
                "{:.3} ± {:.3}",
                eval.cv_auc_mean, eval.cv_auc_std
            )),
            Cell::new(unicode_bar(eval.auc, 12)),
        ]);
    }

    for line in table.to_string().lines() {
        println!("    {}", line);
    }

    if let Some(best) = sorted.first() {
        println!();
        println!(
            "    {} Best model by test AUC: {}",
            style("✓").green().bold(),
            style(&best.family).green().bold()
        );
    }
}
