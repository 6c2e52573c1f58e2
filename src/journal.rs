//! Journal persistence for executed moves.
//!
//! The journal is a pretty-printed JSON array of
//! `{"action": "MOVE", "from": ..., "to": ...}` records, written as one
//! batch after an execution run and consumed by undo.

use crate::file_organizer::{OrganizeError, OrganizeResult};
use crate::model::JournalEntry;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default journal file name, placed inside the organized directory.
pub const JOURNAL_FILE_NAME: &str = ".tidyplan_journal.json";

/// Returns the default journal path for a target directory.
pub fn default_journal_path(target_dir: &Path) -> PathBuf {
    target_dir.join(JOURNAL_FILE_NAME)
}

/// Saves `entries` to `path`, replacing any previous journal.
///
/// Nothing is written when `entries` is empty. The file is written next to
/// its destination and renamed into place, so readers never observe a
/// half-written journal.
pub fn save(path: &Path, entries: &[JournalEntry]) -> OrganizeResult<bool> {
    if entries.is_empty() {
        return Ok(false);
    }

    let json = serde_json::to_string_pretty(entries).map_err(|e| {
        OrganizeError::InvalidJournalFormat {
            reason: format!("JSON serialization failed: {}", e),
        }
    })?;

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, json).map_err(|source| OrganizeError::JournalWriteFailed {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| OrganizeError::JournalWriteFailed {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        "Journal saved with {} actions to {}.",
        entries.len(),
        path.display()
    );
    Ok(true)
}

/// Loads a journal. Returns `Ok(None)` when no journal exists.
pub fn load(path: &Path) -> OrganizeResult<Option<Vec<JournalEntry>>> {
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(path).map_err(|source| OrganizeError::JournalReadFailed {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_str(&json)
        .map(Some)
        .map_err(|e| OrganizeError::InvalidJournalFormat {
            reason: format!("JSON parse error: {}", e),
        })
}

/// Deletes the journal file if it exists.
pub fn delete(path: &Path) -> OrganizeResult<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|source| OrganizeError::JournalWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_journal_writes_nothing() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = default_journal_path(temp_dir.path());

        assert!(!save(&path, &[]).unwrap());
        assert!(!path.exists());
    }

    #[test]
    fn test_save_load_and_overwrite() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = default_journal_path(temp_dir.path());

        let first = vec![
            JournalEntry::moved("a.txt".into(), "Docs/a.txt".into()),
            JournalEntry::moved("b.txt".into(), "Docs/b.txt".into()),
        ];
        assert!(save(&path, &first).unwrap());

        let second = vec![JournalEntry::moved("c.png".into(), "Images/c.png".into())];
        save(&path, &second).unwrap();

        let loaded = load(&path).unwrap().expect("Journal should exist");
        assert_eq!(loaded, second);

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["action"], "MOVE");
        assert!(!temp_dir.path().join(".tidyplan_journal.json.tmp").exists());
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = default_journal_path(temp_dir.path());
        assert!(load(&path).unwrap().is_none());

        fs::write(&path, r#"{"not": "an array"}"#).unwrap();
        assert!(matches!(
            load(&path),
            Err(OrganizeError::InvalidJournalFormat { .. })
        ));
    }

    #[test]
    fn test_delete() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = default_journal_path(temp_dir.path());
        fs::write(&path, "[]").unwrap();

        delete(&path).unwrap();
        assert!(!path.exists());
        delete(&path).unwrap();
    }
}
