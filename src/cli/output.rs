//! CLI output formatting utilities.

use crate::fact_check::{Claim, Verdict};
use console::{style, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print fact-check results as a table.
    pub fn claims_table(claims: &[Claim]) {
        if claims.is_empty() {
            Output::info("No checkable claims found.");
            return;
        }

        println!(
            "\n  {:>3}  {:<10}  {}",
            style("#").dim(),
            style("Verdict").bold(),
            style("Claim").bold()
        );
        for (i, claim) in claims.iter().enumerate() {
            println!(
                "  {:>3}  {}  {}",
                i + 1,
                verdict_style(claim.verdict),
                preview(&claim.claim, 100)
            );
            for source in &claim.sources {
                println!("  {:>3}  {:<10}  {}", "", "", style(source).dim());
            }
        }
        println!();
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn verdict_style(verdict: Verdict) -> StyledObject<String> {
    let label = format!("{:<10}", verdict.to_string());
    match verdict {
        Verdict::Correct => style(label).green(),
        Verdict::Incorrect => style(label).red(),
        Verdict::Unclear => style(label).yellow(),
    }
}

/// Single-line preview with ellipsis.
pub(crate) fn preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
