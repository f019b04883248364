//! Terminal styling utilities

use console::style;
use std::path::Path;
use std::time::Duration;

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
     ██████╗██╗  ██╗██╗   ██╗██████╗ ███╗   ██╗
    ██╔════╝██║  ██║██║   ██║██╔══██╗████╗  ██║
    ██║     ███████║██║   ██║██████╔╝██╔██╗ ██║
    ██║     ██╔══██║██║   ██║██╔══██╗██║╚██╗██║
    ╚██████╗██║  ██║╚██████╔╝██║  ██║██║ ╚████║
     ╚═════╝╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═══╝"#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {} {}",
        style("σ").magenta().bold(),
        style("Attrition analysis and classifier comparison").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print the configuration card
pub fn print_config(
    input: &Path,
    test_fraction: f64,
    split_seed: u64,
    model_seed: u64,
    folds: usize,
) {
    println!("    {}", style("Configuration").cyan().bold());
    println!("    {}", style("─".repeat(50)).dim());
    println!("      Input:          {}", input.display());
    println!(
        "      Train/test:     {:.0}/{:.0}",
        (1.0 - test_fraction) * 100.0,
        test_fraction * 100.0
    );
    println!(
        "      Seeds:          split={} model={}",
        style(split_seed).yellow(),
        style(model_seed).yellow()
    );
    println!("      CV folds:       {}", style(folds).yellow());
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", style("ℹ").cyan(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!(
        "    {} {}",
        style("⚠").yellow().bold(),
        style(message).yellow()
    );
}

/// Print elapsed time for a pipeline step
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("took {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        style("»").cyan().bold(),
        style("Churnscope analysis complete!").green().bold()
    );
    println!();
}

/// Render a horizontal unicode bar scaled to `fraction` of `width` cells
pub fn unicode_bar(fraction: f64, width: usize) -> String {
    let clamped = fraction.clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_bar_scales_with_fraction() {
        assert_eq!(unicode_bar(0.0, 10), "░".repeat(10));
        assert_eq!(unicode_bar(1.0, 10), "█".repeat(10));
        assert_eq!(unicode_bar(0.5, 10), format!("{}{}", "█".repeat(5), "░".repeat(5)));
    }

    #[test]
    fn test_unicode_bar_clamps_out_of_range() {
        assert_eq!(unicode_bar(1.7, 4), "█".repeat(4));
        assert_eq!(unicode_bar(-0.3, 4), "░".repeat(4));
    }
}
