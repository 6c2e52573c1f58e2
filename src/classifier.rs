//! Classification engine: decides whether and where one directory entry moves.
//!
//! Files are classified by capture date (images only), then by extension,
//! then fall back to [`DEFAULT_CATEGORY`]. Directories are classified by
//! their contents against the rule list and are left alone when no rule
//! matches.

use crate::capture_date::{MetadataGate, date_matches_pattern, resolve_exif_year};
use crate::file_category::{
    CategoryMap, DEFAULT_CATEGORY, extension_of, is_image_extension, sniff_extension,
};
use crate::model::{Action, Condition, ConditionKind, Config, Rule};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, warn};

/// Archive suffixes checked by `subfolder_matches_archive`.
const ARCHIVE_SUFFIXES: [&str; 3] = [".zip", ".rar", ".7z"];

/// Failure while inspecting a single entry. Never escapes [`Classifier::classify`].
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Filesystem error processing '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Journal paths are Unicode text, so such an entry could never be undone.
    #[error("Path '{}' is not valid Unicode", path.display())]
    NonUnicodePath { path: PathBuf },
}

impl ClassifyError {
    fn io(path: &Path) -> impl FnOnce(io::Error) -> Self {
        move |source| ClassifyError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Maps one filesystem entry to an optional [`Action`].
///
/// Borrows the configuration for the duration of a scan. Cheap to copy and
/// safe to share across worker threads.
#[derive(Clone, Copy)]
pub struct Classifier<'a> {
    config: &'a Config,
    metadata: &'a MetadataGate,
}

impl<'a> Classifier<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            metadata: MetadataGate::global(),
        }
    }

    /// Classifies `entry`, a direct child of `target_dir`.
    ///
    /// Any error, including a panic inside the inspection of this one entry,
    /// is logged and turns into `None`. The returned action never has
    /// `from == to`.
    pub fn classify(&self, entry: &Path, target_dir: &Path) -> Option<Action> {
        contain(entry, || self.try_classify(entry, target_dir))
    }

    fn try_classify(&self, entry: &Path, target_dir: &Path) -> Result<Option<Action>, ClassifyError> {
        if entry.to_str().is_none() {
            return Err(ClassifyError::NonUnicodePath {
                path: entry.to_path_buf(),
            });
        }

        let metadata = fs::metadata(entry).map_err(ClassifyError::io(entry))?;

        let category = if metadata.is_file() {
            Some(self.classify_file(entry))
        } else if metadata.is_dir() {
            self.classify_directory(entry)?
        } else {
            None
        };

        Ok(category.and_then(|category| plan_move(entry, target_dir, category)))
    }

    fn classify_file(&self, path: &Path) -> String {
        let extension = extension_of(path)
            .or_else(|| sniff_extension(path))
            .unwrap_or_default();

        if is_image_extension(&extension)
            && let Some(date) = self.metadata.capture_date(path)
            && let Some(category) = self.category_for_capture_date(&date)
        {
            return category;
        }

        self.config
            .categories()
            .category_for(&extension)
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string()
    }

    /// First capture-date rule, in priority order, whose date templates all
    /// match `date`.
    fn category_for_capture_date(&self, date: &str) -> Option<String> {
        self.config
            .rules()
            .iter()
            .find(|rule| capture_date_rule_matches(rule, date))
            .map(|rule| resolve_exif_year(&rule.category, date))
    }

    fn classify_directory(&self, dir: &Path) -> Result<Option<String>, ClassifyError> {
        let Some(name) = dir.file_name() else {
            return Ok(None);
        };
        if is_category_folder(&name.to_string_lossy(), self.config.categories()) {
            return Ok(None);
        }

        let inspected = unwrap_single_nested(dir).map_err(ClassifyError::io(dir))?;
        let facts = DirectoryFacts::collect(&inspected, self.config.categories())
            .map_err(ClassifyError::io(&inspected))?;

        Ok(self
            .config
            .rules()
            .iter()
            .find(|rule| facts.satisfies(rule))
            .map(|rule| rule.category.clone()))
    }
}

/// Runs one entry's classification, turning errors and panics into `None`.
fn contain<F>(entry: &Path, classify: F) -> Option<Action>
where
    F: FnOnce() -> Result<Option<Action>, ClassifyError>,
{
    match panic::catch_unwind(AssertUnwindSafe(classify)) {
        Ok(Ok(action)) => action,
        Ok(Err(e)) => {
            warn!("{}. Skipping.", e);
            None
        }
        Err(_) => {
            error!(
                "A critical low-level error occurred while processing '{}'. Skipping.",
                entry.display()
            );
            None
        }
    }
}

/// Builds the move for `entry` into `target_dir/category/`, unless the entry
/// is already there.
pub fn plan_move(entry: &Path, target_dir: &Path, category: String) -> Option<Action> {
    let name = entry.file_name()?;
    let to = target_dir.join(&category).join(name);

    (to != entry).then(|| Action {
        from: entry.to_path_buf(),
        to,
        reason: category,
    })
}

/// True for folders the organizer itself creates: the default category and
/// every category of the extension map. Such folders are never reclassified.
pub fn is_category_folder(name: &str, categories: &CategoryMap) -> bool {
    name == DEFAULT_CATEGORY || categories.is_category_name(name)
}

/// Returns the directory whose contents describe `dir`.
///
/// When `dir` holds exactly one child and that child is a directory (the
/// usual shape of an archive extracted into a wrapper folder), the child is
/// inspected instead. Only one level is unwrapped.
pub fn unwrap_single_nested(dir: &Path) -> io::Result<PathBuf> {
    let mut entries = fs::read_dir(dir)?;

    let Some(first) = entries.next().transpose()? else {
        return Ok(dir.to_path_buf());
    };

    let only_child = first.path();
    if entries.next().is_none() && only_child.is_dir() {
        Ok(only_child)
    } else {
        Ok(dir.to_path_buf())
    }
}

fn capture_date_rule_matches(rule: &Rule, date: &str) -> bool {
    let mut date_conditions = rule
        .conditions
        .iter()
        .filter(|condition| condition.kind == ConditionKind::ExifDateMatches)
        .peekable();

    date_conditions.peek().is_some()
        && date_conditions.all(|condition| {
            condition
                .values
                .iter()
                .any(|pattern| date_matches_pattern(date, pattern))
        })
}

/// The immediate contents of one directory, as seen by the rules.
#[derive(Debug, Default)]
pub struct DirectoryFacts {
    pub file_names: Vec<String>,
    pub subdirectory_names: Vec<String>,
    /// Immediate files per category of the extension map.
    pub category_counts: HashMap<String, usize>,
}

impl DirectoryFacts {
    pub fn collect(dir: &Path, categories: &CategoryMap) -> io::Result<Self> {
        let mut facts = Self::default();

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();

            if path.is_dir() {
                facts.subdirectory_names.push(name);
            } else if path.is_file() {
                if let Some(ext) = extension_of(&path)
                    && let Some(category) = categories.category_for(&ext)
                {
                    *facts
                        .category_counts
                        .entry(category.to_string())
                        .or_insert(0) += 1;
                }
                facts.file_names.push(name);
            }
        }

        Ok(facts)
    }

    /// True when every condition of `rule` holds for this directory.
    pub fn satisfies(&self, rule: &Rule) -> bool {
        rule.conditions.iter().all(|condition| self.holds(condition))
    }

    pub fn holds(&self, condition: &Condition) -> bool {
        let values = &condition.values;
        match condition.kind {
            ConditionKind::ContainsFilenamePattern => values
                .iter()
                .any(|v| self.file_names.iter().any(|f| f.eq_ignore_ascii_case(v))),
            ConditionKind::ContainsFilename => {
                values.iter().any(|v| self.file_names.iter().any(|f| f == v))
            }
            ConditionKind::ContainsSubdirectoryNamed => values.iter().any(|v| {
                self.subdirectory_names
                    .iter()
                    .any(|s| s.eq_ignore_ascii_case(v))
            }),
            ConditionKind::HasNoSubdirectories => self.subdirectory_names.is_empty(),
            ConditionKind::FileCategoryPercentage => self
                .category_share(values)
                .is_some_and(|share| share >= condition.threshold),
            ConditionKind::SubfolderMatchesArchive => self.has_archive_sibling(),
            ConditionKind::ExifDateMatches | ConditionKind::Unsupported => false,
        }
    }

    /// Fraction of categorised files that fall in `categories`; `None` when
    /// no file is categorised at all.
    fn category_share(&self, categories: &[String]) -> Option<f64> {
        let total: usize = self.category_counts.values().sum();
        if total == 0 {
            return None;
        }

        let matched: usize = categories
            .iter()
            .filter_map(|name| self.category_counts.get(name))
            .sum();
        Some(matched as f64 / total as f64)
    }

    fn has_archive_sibling(&self) -> bool {
        self.subdirectory_names.iter().any(|subdir| {
            let subdir = subdir.to_ascii_lowercase();
            self.file_names.iter().any(|file| {
                let file = file.to_ascii_lowercase();
                ARCHIVE_SUFFIXES
                    .iter()
                    .any(|suffix| file.strip_suffix(suffix) == Some(subdir.as_str()))
            })
        })
    }
}
