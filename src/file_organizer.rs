//! Execution of approved moves.
//!
//! This module performs a plan's actions against the filesystem one at a
//! time, creating category directories as needed, renaming around existing
//! files, and journaling every move that physically succeeds.

use crate::model::{Action, JournalEntry};
use crate::scanner::CancellationToken;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during execution, journaling, and undo.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// Failed to create a destination directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to move an entry to its destination.
    #[error("Failed to move {} to {}: {source}", from.display(), to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to write or remove the journal file.
    #[error("Failed to write journal {}: {source}", path.display())]
    JournalWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to read the journal file.
    #[error("Failed to read journal {}: {source}", path.display())]
    JournalReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Journal file has invalid format.
    #[error("Invalid journal format: {reason}")]
    InvalidJournalFormat { reason: String },
}

/// Result type for execution and journal operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// What happened to one action during execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Moved; carries the realized destination.
    Moved(PathBuf),
    /// The destination directory could not be created.
    Skipped(String),
    /// The move itself failed.
    Failed(String),
}

/// Performs approved actions sequentially and records what happened.
pub struct FileOrganizer;

impl FileOrganizer {
    /// Executes `actions` in order and returns the journal of moves that
    /// actually happened.
    ///
    /// Cancellation is checked before each action; moves already performed
    /// stay in place and are journaled.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidyplan::file_organizer::FileOrganizer;
    /// use tidyplan::model::Action;
    /// use tidyplan::scanner::CancellationToken;
    ///
    /// let actions = vec![Action {
    ///     from: "/home/me/Downloads/report.pdf".into(),
    ///     to: "/home/me/Downloads/Documents/report.pdf".into(),
    ///     reason: "Documents".to_string(),
    /// }];
    /// let journal = FileOrganizer::execute(&actions, CancellationToken::new());
    /// println!("{} moves journaled", journal.len());
    /// ```
    pub fn execute(actions: &[Action], cancel: CancellationToken) -> Vec<JournalEntry> {
        Self::execute_with_progress(actions, cancel, |_, _| {})
    }

    /// Like [`FileOrganizer::execute`], reporting every action's outcome in
    /// execution order.
    pub fn execute_with_progress<F>(
        actions: &[Action],
        cancel: CancellationToken,
        mut on_step: F,
    ) -> Vec<JournalEntry>
    where
        F: FnMut(&Action, &MoveOutcome),
    {
        let mut journal = Vec::with_capacity(actions.len());

        for action in actions {
            if cancel.is_cancelled() {
                info!("Execution cancelled by user.");
                break;
            }

            let outcome = match Self::perform(action) {
                Ok(realized) => {
                    journal.push(JournalEntry::moved(action.from.clone(), realized.clone()));
                    MoveOutcome::Moved(realized)
                }
                Err(e @ OrganizeError::DirectoryCreationFailed { .. }) => {
                    warn!("{}", e);
                    MoveOutcome::Skipped(e.to_string())
                }
                Err(e) => {
                    warn!("{}", e);
                    MoveOutcome::Failed(e.to_string())
                }
            };
            on_step(action, &outcome);
        }

        info!(
            "Execution finished: {} of {} actions performed.",
            journal.len(),
            actions.len()
        );
        journal
    }

    /// Moves one entry and returns where it actually landed.
    fn perform(action: &Action) -> OrganizeResult<PathBuf> {
        if let Some(parent) = action.to.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|source| OrganizeError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source,
            })?;
            info!("Created directory: '{}'", parent.display());
        }

        let mut attempts = 0;
        loop {
            let destination = unique_destination(&action.to);
            info!(
                "Moving '{}' -> '{}'",
                action.from.display(),
                destination.display()
            );

            match rename_no_clobber(&action.from, &destination) {
                Ok(()) => return Ok(destination),
                // Taken by someone else since the name was chosen.
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempts < RENAME_ATTEMPTS => {
                    attempts += 1;
                }
                Err(source) => {
                    return Err(OrganizeError::MoveFailed {
                        from: action.from.clone(),
                        to: destination,
                        source,
                    });
                }
            }
        }
    }
}

/// Fresh names tried when a chosen destination is taken before the rename.
const RENAME_ATTEMPTS: u32 = 3;

/// Renames `from` to `to`, refusing with `AlreadyExists` when `to` is
/// occupied. The check and the rename are not atomic; an entry created
/// in between is still replaced.
fn rename_no_clobber(from: &Path, to: &Path) -> io::Result<()> {
    if occupied(to) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("'{}' already exists", to.display()),
        ));
    }
    fs::rename(from, to)
}

/// True when anything, including a dangling symlink, sits at `path`.
fn occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Returns `target` if nothing exists there, otherwise the first free
/// `stem (n).ext` sibling, counting from 1.
///
/// ```no_run
/// use std::path::Path;
/// use tidyplan::file_organizer::unique_destination;
///
/// // With "report.pdf" already taken:
/// assert_eq!(
///     unique_destination(Path::new("Documents/report.pdf")),
///     Path::new("Documents/report (1).pdf")
/// );
/// ```
pub fn unique_destination(target: &Path) -> PathBuf {
    if !occupied(target) {
        return target.to_path_buf();
    }

    let parent = target.parent().unwrap_or_else(|| Path::new(""));
    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = target
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| parent.join(format!("{} ({}){}", stem, n, extension)))
        .find(|candidate| !occupied(candidate))
        .unwrap_or_else(|| target.to_path_buf())
}
