//! Undo functionality for reverting an execution run.
//!
//! Undo replays a journal in reverse, moving every entry back from its
//! journaled destination to where it came from.

use crate::file_organizer::OrganizeResult;
use crate::journal;
use crate::model::{ActionKind, JournalEntry};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Represents the result of an undo operation.
#[derive(Debug, Default)]
pub struct UndoReport {
    /// False when there was no journal to replay.
    pub journal_found: bool,
    /// Number of entries successfully moved back.
    pub restored_files: usize,
    /// Entries whose journaled destination no longer exists.
    pub skipped_files: Vec<(PathBuf, String)>,
    /// Entries that could not be moved back.
    pub failed_restores: Vec<(PathBuf, String)>,
}

impl UndoReport {
    /// Returns the total number of entries processed.
    pub fn total_processed(&self) -> usize {
        self.restored_files + self.failed_restores.len() + self.skipped_files.len()
    }

    /// Returns true if every journaled move was reverted.
    pub fn is_complete_success(&self) -> bool {
        self.failed_restores.is_empty() && self.skipped_files.is_empty()
    }
}

/// Manages undo operations.
pub struct UndoManager;

impl UndoManager {
    /// Reverts the moves recorded in the journal at `journal_path`.
    ///
    /// Entries are processed newest first. A failing entry is logged and
    /// recorded in the report; the remaining entries are still processed.
    /// Once the pass completes the journal is deleted, even if some entries
    /// could not be reverted.
    ///
    /// # Edge Cases Handled
    ///
    /// * **No journal**: Returns an empty report with `journal_found == false`
    /// * **File not found**: Skipped with a note that the file couldn't be found
    /// * **Original location occupied**: The occupying file is backed up with a timestamp suffix
    /// * **Original folder removed**: Recreated before moving back
    /// * **Unreadable journal**: Returned as an error, and the journal is kept
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tidyplan::undo::UndoManager;
    /// use std::path::Path;
    ///
    /// let result = UndoManager::undo(Path::new("/path/to/Downloads/.tidyplan_journal.json"));
    /// match result {
    ///     Ok(report) => println!("Restored {} files", report.restored_files),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(journal_path: &Path) -> OrganizeResult<UndoReport> {
        let Some(entries) = journal::load(journal_path)? else {
            info!("No journal found at {}. Nothing to undo.", journal_path.display());
            return Ok(UndoReport::default());
        };

        info!("Undoing {} journaled actions...", entries.len());
        let mut report = UndoReport {
            journal_found: true,
            ..UndoReport::default()
        };

        for entry in entries.iter().rev() {
            if entry.action != ActionKind::Move {
                continue;
            }

            match Self::restore_entry(entry) {
                Ok(()) => {
                    info!(
                        "Undo: '{}' -> '{}'",
                        entry.to.display(),
                        entry.from.display()
                    );
                    report.restored_files += 1;
                }
                Err(Restore::Skipped(path, reason)) => {
                    warn!("Undo skipped for '{}': {}", path.display(), reason);
                    report.skipped_files.push((path, reason));
                }
                Err(Restore::Failed(path, reason)) => {
                    warn!("Undo failed for '{}': {}", path.display(), reason);
                    report.failed_restores.push((path, reason));
                }
            }
        }

        if let Err(e) = journal::delete(journal_path) {
            warn!("Could not delete journal: {}", e);
        }

        info!(
            "Undo complete: {} restored, {} skipped, {} failed.",
            report.restored_files,
            report.skipped_files.len(),
            report.failed_restores.len()
        );
        Ok(report)
    }

    /// Moves one journaled entry back to its original location.
    fn restore_entry(entry: &JournalEntry) -> Result<(), Restore> {
        if !entry.to.exists() {
            return Err(Restore::Skipped(
                entry.to.clone(),
                "File not found at expected location".to_string(),
            ));
        }

        if let Some(parent) = entry.from.parent()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| {
                Restore::Failed(
                    entry.from.clone(),
                    format!("Could not recreate {}: {}", parent.display(), e),
                )
            })?;
        }

        if entry.from.exists() {
            let backup_path = Self::generate_backup_path(&entry.from);
            fs::rename(&entry.from, &backup_path).map_err(|e| {
                Restore::Failed(
                    entry.from.clone(),
                    format!("Could not backup conflicting file: {}", e),
                )
            })?;
            info!(
                "Backed up '{}' to '{}'",
                entry.from.display(),
                backup_path.display()
            );
        }

        fs::rename(&entry.to, &entry.from).map_err(|e| {
            Restore::Failed(entry.to.clone(), format!("Failed to restore file: {}", e))
        })
    }

    /// Generates a backup path for a file by appending a timestamp.
    ///
    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
    }
}

enum Restore {
    Skipped(PathBuf, String),
    Failed(PathBuf, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_organizer::FileOrganizer;
    use crate::journal::default_journal_path;
    use crate::model::Action;
    use crate::scanner::CancellationToken;
    use std::fs;
    use tempfile::TempDir;

    fn organize(base_path: &Path, moves: &[(&str, &str)]) -> PathBuf {
        let actions: Vec<Action> = moves
            .iter()
            .map(|(name, category)| Action {
                from: base_path.join(name),
                to: base_path.join(category).join(name),
                reason: category.to_string(),
            })
            .collect();
        let entries = FileOrganizer::execute(&actions, CancellationToken::new());
        let journal_path = default_journal_path(base_path);
        journal::save(&journal_path, &entries).expect("Failed to save journal");
        journal_path
    }

    #[test]
    fn test_undo_no_journal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let report = UndoManager::undo(&default_journal_path(temp_dir.path())).unwrap();
        assert!(!report.journal_found);
        assert_eq!(report.total_processed(), 0);
    }

    #[test]
    fn test_undo_single_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "test content").expect("Failed to write test file");
        let journal_path = organize(base_path, &[("test.txt", "Documents")]);

        let moved_file = base_path.join("Documents").join("test.txt");
        assert!(!file_path.exists());
        assert!(moved_file.exists());

        let report = UndoManager::undo(&journal_path).expect("Undo failed");

        assert!(report.journal_found);
        assert_eq!(report.restored_files, 1);
        assert!(report.is_complete_success());
        assert!(file_path.exists());
        assert!(!moved_file.exists());
        assert!(!journal_path.exists());
    }

    #[test]
    fn test_undo_runs_in_reverse_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        // a -> b, then c -> d where d is a's old home. Only reverse order
        // puts both back.
        let a = base_path.join("a.txt");
        let b = base_path.join("moved").join("a.txt");
        let c = base_path.join("c.txt");
        fs::create_dir_all(b.parent().unwrap()).unwrap();
        fs::write(&b, "first").unwrap();
        fs::write(&c, "second").unwrap();
        fs::rename(&c, &a).unwrap();

        let entries = vec![
            JournalEntry::moved(a.clone(), b.clone()),
            JournalEntry::moved(c.clone(), a.clone()),
        ];
        let journal_path = default_journal_path(base_path);
        journal::save(&journal_path, &entries).unwrap();

        let report = UndoManager::undo(&journal_path).unwrap();

        assert_eq!(report.restored_files, 2);
        assert!(report.is_complete_success());
        assert_eq!(fs::read_to_string(&a).unwrap(), "first");
        assert_eq!(fs::read_to_string(&c).unwrap(), "second");
        assert!(!b.exists());
    }

    #[test]
    fn test_undo_recreates_original_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let original = base_path.join("inbox").join("notes.txt");
        let moved = base_path.join("Documents").join("notes.txt");
        fs::create_dir_all(moved.parent().unwrap()).unwrap();
        fs::write(&moved, "notes").unwrap();

        let journal_path = default_journal_path(base_path);
        journal::save(&journal_path, &[JournalEntry::moved(original.clone(), moved)]).unwrap();

        let report = UndoManager::undo(&journal_path).unwrap();
        assert_eq!(report.restored_files, 1);
        assert!(original.exists());
    }

    #[test]
    fn test_undo_with_file_name_conflict() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let file_path = base_path.join("test.txt");
        fs::write(&file_path, "original content").expect("Failed to write file");
        let journal_path = organize(base_path, &[("test.txt", "Documents")]);

        // A new file now occupies the original location.
        fs::write(&file_path, "new content").expect("Failed to create conflict");

        let report = UndoManager::undo(&journal_path).expect("Undo failed");

        assert_eq!(report.restored_files, 1);
        assert_eq!(report.failed_restores.len(), 0);

        let moved_content = fs::read_to_string(&file_path).expect("Failed to read file");
        assert_eq!(moved_content, "original content");

        let backup_files: Vec<_> = fs::read_dir(base_path)
            .expect("Failed to read dir")
            .filter_map(|e| {
                e.ok().and_then(|entry| {
                    let path = entry.path();
                    if path.file_name()?.to_string_lossy().contains(".bak.") {
                        Some(path)
                    } else {
                        None
                    }
                })
            })
            .collect();

        assert_eq!(backup_files.len(), 1);
        assert_eq!(fs::read_to_string(&backup_files[0]).unwrap(), "new content");
    }

    #[test]
    fn test_undo_with_missing_file_still_consumes_journal() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();

        let present = base_path.join("Documents").join("kept.txt");
        fs::create_dir_all(present.parent().unwrap()).unwrap();
        fs::write(&present, "kept").unwrap();

        let entries = vec![
            JournalEntry::moved(base_path.join("kept.txt"), present),
            JournalEntry::moved(
                base_path.join("nonexistent.txt"),
                base_path.join("Documents").join("nonexistent.txt"),
            ),
        ];
        let journal_path = default_journal_path(base_path);
        journal::save(&journal_path, &entries).unwrap();

        let report = UndoManager::undo(&journal_path).expect("Undo failed");

        assert_eq!(report.restored_files, 1);
        assert_eq!(report.skipped_files.len(), 1);
        assert!(!report.is_complete_success());
        assert!(base_path.join("kept.txt").exists());
        assert!(!journal_path.exists());
    }

    #[test]
    fn test_undo_ignores_unknown_action_kinds() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base_path = temp_dir.path();
        let journal_path = default_journal_path(base_path);
        fs::write(
            &journal_path,
            r#"[{"action": "COPY", "from": "x", "to": "y"}]"#,
        )
        .unwrap();

        let report = UndoManager::undo(&journal_path).unwrap();
        assert!(report.journal_found);
        assert_eq!(report.total_processed(), 0);
    }

    #[test]
    fn test_undo_corrupt_journal_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let journal_path = default_journal_path(temp_dir.path());
        fs::write(&journal_path, "not json").unwrap();

        assert!(UndoManager::undo(&journal_path).is_err());
        assert!(journal_path.exists());
    }
}
