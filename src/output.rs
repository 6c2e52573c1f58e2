//! Output formatting and styling module.
//!
//! Provides a centralized interface for all terminal output: colored status
//! lines, progress bars, the plan listing and the summary tables printed
//! after scans, executions and undo runs.

use crate::model::{Action, Plan};
use crate::undo::UndoReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::Path;

/// Manages all CLI output with consistent styling and formatting.
///
/// This struct provides methods for:
/// - Success messages (green with ✓)
/// - Error messages (red with ✗)
/// - Warning messages (yellow with ⚠)
/// - Info messages (cyan)
/// - Progress bars for scans and executions
/// - Plan listings and summary tables
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidyplan::output::OutputFormatter;
    /// OutputFormatter::success("Plan executed");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar with `total` steps.
    ///
    /// ```no_run
    /// use tidyplan::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        pb.set_style(style);
        pb
    }

    /// Prints every proposed move, grouped under its category, with paths
    /// shown relative to `target_dir`.
    pub fn plan_listing(plan: &Plan, target_dir: &Path) {
        Self::header("PLAN");

        let mut by_category: Vec<(&str, Vec<&Action>)> = Vec::new();
        for action in plan.actions() {
            match by_category.iter_mut().find(|(name, _)| *name == action.reason) {
                Some((_, actions)) => actions.push(action),
                None => by_category.push((action.reason.as_str(), vec![action])),
            }
        }
        by_category.sort_by_key(|(name, _)| *name);

        for (category, actions) in by_category {
            println!("{}", category.bold());
            for action in actions {
                println!(
                    "  {} {} {}",
                    relative(&action.from, target_dir),
                    "→".dimmed(),
                    relative(&action.to, target_dir).green()
                );
            }
        }
    }

    /// Prints a summary table with move counts by category.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use tidyplan::output::OutputFormatter;
    /// use std::collections::HashMap;
    ///
    /// let mut counts = HashMap::new();
    /// counts.insert("Documents".to_string(), 15);
    /// counts.insert("Images".to_string(), 8);
    /// OutputFormatter::summary_table(&counts, 23);
    /// ```
    pub fn summary_table(category_counts: &HashMap<String, usize>, total_items: usize) {
        Self::header("SUMMARY");

        let mut categories: Vec<_> = category_counts.iter().collect();
        categories.sort_by_key(|&(name, _)| name);

        let max_category_len = categories
            .iter()
            .map(|(name, _)| name.chars().count())
            .max()
            .unwrap_or(0)
            .max(8); // "Category"

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Items".bold(),
            width = max_category_len
        );
        println!("{}", "-".repeat(max_category_len + 10));

        for (category, count) in &categories {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                item_word(**count),
                width = max_category_len
            );
        }

        println!("{}", "-".repeat(max_category_len + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_items.to_string().green().bold(),
            item_word(total_items),
            width = max_category_len
        );
    }

    pub fn undo_report(report: &UndoReport) {
        if !report.journal_found {
            Self::warning("Nothing to undo: no journal found");
            return;
        }

        Self::success(&format!(
            "Restored {} {}",
            report.restored_files,
            item_word(report.restored_files)
        ));

        if !report.skipped_files.is_empty() {
            Self::header("SKIPPED");
            for (path, reason) in &report.skipped_files {
                Self::warning(&format!("{}: {}", path.display(), reason));
            }
        }

        if !report.failed_restores.is_empty() {
            Self::header("FAILED");
            for (path, reason) in &report.failed_restores {
                Self::error(&format!("{}: {}", path.display(), reason));
            }
        }
    }

    /// Prints the read-only notice shown after a scan.
    pub fn scan_only_notice(message: &str) {
        println!("{}", format!("[SCAN ONLY] {}", message).yellow());
    }
}

fn item_word(count: usize) -> &'static str {
    if count == 1 { "item" } else { "items" }
}

fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_paths() {
        let base = Path::new("/home/me/Downloads");
        assert_eq!(
            relative(Path::new("/home/me/Downloads/Documents/a.pdf"), base),
            Path::new("Documents").join("a.pdf").display().to_string()
        );
        assert_eq!(relative(Path::new("/elsewhere/a.pdf"), base), "/elsewhere/a.pdf");
    }

    #[test]
    fn test_item_word() {
        assert_eq!(item_word(1), "item");
        assert_eq!(item_word(0), "items");
        assert_eq!(item_word(2), "items");
    }
}
