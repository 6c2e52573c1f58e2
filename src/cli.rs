//! Command-line interface module for tidyplan.
//!
//! This module handles all CLI-related functionality including:
//! - Command parsing
//! - Configuration and target directory resolution
//! - Scan and execution orchestration through a background [`Session`]
//! - Undo operation handling

use crate::config::{self, LoadedConfig};
use crate::file_organizer::MoveOutcome;
use crate::journal::{self, JOURNAL_FILE_NAME};
use crate::model::Plan;
use crate::output::OutputFormatter;
use crate::undo::UndoManager;
use crate::worker::{Job, Session, WorkerEvent};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Rule-driven folder organizer with reviewable plans and exact undo.
#[derive(Debug, Parser)]
#[command(name = "tidyplan", version, about)]
pub struct Cli {
    /// Configuration file (JSON, or TOML with a .toml extension)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory to organize (defaults to the user's downloads folder)
    #[arg(long, global = true, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Journal location (defaults to <target>/.tidyplan_journal.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub journal: Option<PathBuf>,

    /// Log file location
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show what would be moved, without changing anything
    Scan,
    /// Scan, confirm, and perform the moves
    Apply {
        /// Only perform moves into this category (repeatable)
        #[arg(long = "only", value_name = "CATEGORY")]
        only: Vec<String>,
        /// Never perform moves into this category (repeatable)
        #[arg(long = "skip", value_name = "CATEGORY")]
        skip: Vec<String>,
        /// Do not ask for confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Revert the moves recorded in the journal
    Undo,
}

/// Runs one parsed command to completion.
///
/// # Examples
///
/// ```no_run
/// use clap::Parser;
/// use tidyplan::cli::{Cli, run_cli};
/// use tidyplan::worker::Session;
///
/// let cli = Cli::parse_from(["tidyplan", "--target", "/tmp/inbox", "scan"]);
/// if let Err(e) = run_cli(&cli, &mut Session::new()) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(cli: &Cli, session: &mut Session) -> Result<(), String> {
    let target_dir = resolve_target(cli.target.as_deref())?;
    let journal_path = cli
        .journal
        .clone()
        .unwrap_or_else(|| journal::default_journal_path(&target_dir));

    match &cli.command {
        Command::Scan => {
            let loaded = load_configuration(cli.config.as_deref(), &journal_path)?;
            let plan = scan(session, &target_dir, loaded)?;
            show_plan(&plan, &target_dir);
            OutputFormatter::scan_only_notice("No files were moved. Run `tidyplan apply` to perform this plan.");
            Ok(())
        }
        Command::Apply { only, skip, yes } => {
            let loaded = load_configuration(cli.config.as_deref(), &journal_path)?;
            let plan = scan(session, &target_dir, loaded)?;
            if plan.was_cancelled() {
                OutputFormatter::warning("Scan cancelled. Nothing was moved.");
                return Ok(());
            }

            let approved = Plan::new(plan.select(|a| approves(only, skip, &a.reason)), false);
            if approved.is_empty() {
                OutputFormatter::info("Nothing to organize.");
                return Ok(());
            }

            show_plan(&approved, &target_dir);
            let confirmed = *yes || confirm(&format!("Move {} items?", approved.len()))?;
            // Ctrl-C at the prompt or after the scan leaves the token set.
            if !confirmed || session.cancel_token().is_cancelled() {
                OutputFormatter::plain("Aborted. No files were moved.");
                return Ok(());
            }

            execute(session, approved, &journal_path)
        }
        Command::Undo => {
            OutputFormatter::info(&format!("Undoing moves recorded in {}", journal_path.display()));
            let report = UndoManager::undo(&journal_path).map_err(|e| e.to_string())?;
            OutputFormatter::undo_report(&report);
            Ok(())
        }
    }
}

/// Cancels the session's running operation on Ctrl-C.
pub fn install_interrupt_handler(session: &Session) {
    let token = session.cancel_token();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, cancelling current operation...");
        token.cancel();
    }) {
        warn!("Could not install Ctrl+C handler: {}", e);
    }
}

fn resolve_target(explicit: Option<&Path>) -> Result<PathBuf, String> {
    let target = explicit
        .map(Path::to_path_buf)
        .or_else(config::resolve_default_target_directory)
        .ok_or("Could not determine a target directory. Pass --target <DIR>.")?;

    if !target.is_dir() {
        return Err(format!("Target directory {} does not exist", target.display()));
    }
    Ok(target)
}

fn load_configuration(explicit: Option<&Path>, journal_path: &Path) -> Result<LoadedConfig, String> {
    let (path, mut loaded) =
        config::discover(&config::search_paths(explicit)).map_err(|e| e.to_string())?;
    OutputFormatter::plain(&format!("Using configuration {}", path.display()));

    loaded.filters.exclude_name(JOURNAL_FILE_NAME);
    if let Some(name) = journal_path.file_name() {
        loaded.filters.exclude_name(name.to_string_lossy());
    }
    Ok(loaded)
}

fn scan(session: &mut Session, target_dir: &Path, loaded: LoadedConfig) -> Result<Plan, String> {
    OutputFormatter::info(&format!("Scanning {}", target_dir.display()));

    let job = Job::Scan {
        target_dir: target_dir.to_path_buf(),
        config: Arc::new(loaded.config),
        filters: Some(Arc::new(loaded.filters)),
    };

    let pb = OutputFormatter::create_progress_bar(0);
    let result = session.run(job, |event| {
        if let WorkerEvent::ScanProgress { scanned, total } = event {
            pb.set_length(*total as u64);
            pb.set_position(*scanned as u64);
        }
    });
    pb.finish_and_clear();

    match result.map_err(|e| e.to_string())? {
        WorkerEvent::PlanReady(plan) => Ok(plan),
        other => Err(format!("Unexpected scan result: {:?}", other)),
    }
}

fn execute(
    session: &mut Session,
    approved: Plan,
    journal_path: &Path,
) -> Result<(), String> {
    let total = approved.len();
    let job = Job::Execute {
        actions: approved.into_actions(),
        journal_path: journal_path.to_path_buf(),
    };

    let pb: ProgressBar = OutputFormatter::create_progress_bar(total as u64);
    let mut problems = 0;
    let result = session.run(job, |event| {
        if let WorkerEvent::StepFinished { action, outcome, .. } = event {
            match outcome {
                MoveOutcome::Moved(_) => {}
                MoveOutcome::Skipped(reason) | MoveOutcome::Failed(reason) => {
                    problems += 1;
                    pb.println(format!("⚠ {}: {}", action.from.display(), reason));
                }
            }
            pb.inc(1);
        }
    });
    pb.finish_and_clear();

    let (journal, saved) = match result.map_err(|e| e.to_string())? {
        WorkerEvent::Executed { journal, saved } => (journal, saved),
        other => return Err(format!("Unexpected execution result: {:?}", other)),
    };

    OutputFormatter::success(&format!("Moved {} of {} items", journal.len(), total));
    if journal.len() + problems < total {
        OutputFormatter::warning("Execution was cancelled before every item was processed");
    }
    if problems > 0 {
        OutputFormatter::warning(&format!("{} items could not be moved; see the log for details", problems));
    }

    match saved {
        Ok(true) => OutputFormatter::plain(&format!(
            "Journal saved to {}. Run `tidyplan undo` to revert.",
            journal_path.display()
        )),
        Ok(false) => {}
        Err(e) => OutputFormatter::error(&format!("Undo will not be available: {}", e)),
    }
    Ok(())
}

fn show_plan(plan: &Plan, target_dir: &Path) {
    if plan.was_cancelled() {
        OutputFormatter::warning("Scan cancelled; showing the partial plan");
    }
    if plan.is_empty() {
        OutputFormatter::info("Nothing to organize.");
        return;
    }
    OutputFormatter::plan_listing(plan, target_dir);
    OutputFormatter::summary_table(&plan.category_counts(), plan.len());
}

/// `--only` narrows to the listed categories, `--skip` removes categories.
fn approves(only: &[String], skip: &[String], category: &str) -> bool {
    (only.is_empty() || only.iter().any(|c| c == category)) && !skip.iter().any(|c| c == category)
}

fn confirm(prompt: &str) -> Result<bool, String> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush().map_err(|e| e.to_string())?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .map_err(|e| e.to_string())?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
