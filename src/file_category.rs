//! Extension-to-category mapping for organizing files by type.
//!
//! This module maps lowercase file extensions (with their leading dot) to
//! category names taken from configuration. Lookups are case-insensitive.
//!
//! # Examples
//!
//! ```
//! use tidyplan::file_category::CategoryMap;
//!
//! let mut map = CategoryMap::new();
//! map.insert("pdf", "Documents");
//! map.insert(".PNG", "Images");
//! assert_eq!(map.category_for(".pdf"), Some("Documents"));
//! assert_eq!(map.category_for(".png"), Some("Images"));
//! assert_eq!(map.category_for(".exe"), None);
//! ```

use std::collections::HashMap;
use std::path::Path;

/// Category used when neither a rule nor the extension map applies to a file.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Extensions whose capture date is read from embedded image metadata.
pub const IMAGE_EXTENSIONS: [&str; 10] = [
    ".jpg", ".jpeg", ".png", ".webp", ".tiff", ".raw", ".cr2", ".nef", ".arw", ".dng",
];

/// Maps file extensions to category names.
///
/// Keys are normalised with [`normalize_extension`], so `"PDF"`, `".pdf"`
/// and `"pdf"` all refer to the same entry. Built once from configuration and
/// only read during classification.
#[derive(Debug, Clone, Default)]
pub struct CategoryMap {
    extension_map: HashMap<String, String>,
}

impl CategoryMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from `category -> extensions` groups, as found in the
    /// `categories` section of a configuration file.
    ///
    /// Groups are applied in iteration order; an extension listed under
    /// several categories ends up in the last one.
    ///
    /// # Examples
    ///
    /// ```
    /// use tidyplan::file_category::CategoryMap;
    ///
    /// let map = CategoryMap::from_groups([
    ///     ("Documents", vec!["pdf", "docx"]),
    ///     ("Images", vec![".jpg"]),
    /// ]);
    /// assert_eq!(map.category_for(".docx"), Some("Documents"));
    /// assert!(map.is_category_name("Images"));
    /// ```
    pub fn from_groups<I, C, E, X>(groups: I) -> Self
    where
        I: IntoIterator<Item = (C, E)>,
        C: AsRef<str>,
        E: IntoIterator<Item = X>,
        X: AsRef<str>,
    {
        let mut map = Self::new();
        for (category, extensions) in groups {
            for ext in extensions {
                map.insert(ext.as_ref(), category.as_ref());
            }
        }
        map
    }

    /// Adds a file extension to category mapping.
    pub fn insert(&mut self, ext: &str, category: &str) {
        self.extension_map
            .insert(normalize_extension(ext), category.to_string());
    }

    /// Maps a file extension to a category.
    pub fn category_for(&self, ext: &str) -> Option<&str> {
        self.extension_map
            .get(&normalize_extension(ext))
            .map(String::as_str)
    }

    /// Returns true if `name` is one of the category names in this map.
    pub fn is_category_name(&self, name: &str) -> bool {
        self.extension_map.values().any(|category| category == name)
    }

    pub fn len(&self) -> usize {
        self.extension_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extension_map.is_empty()
    }
}

/// Lowercases an extension and makes sure it carries a leading dot.
///
/// ```
/// use tidyplan::file_category::normalize_extension;
///
/// assert_eq!(normalize_extension("PDF"), ".pdf");
/// assert_eq!(normalize_extension(".Tar"), ".tar");
/// assert_eq!(normalize_extension(""), "");
/// ```
pub fn normalize_extension(ext: &str) -> String {
    let trimmed = ext.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{}", lower)
    }
}

/// Returns the lowercase extension of `path`, including its leading dot.
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| normalize_extension(&ext.to_string_lossy()))
        .filter(|ext| !ext.is_empty())
}

/// Detects an extension from file content, for files that have none.
///
/// Uses the `infer` crate, which only reads the first few kilobytes.
pub fn sniff_extension(path: &Path) -> Option<String> {
    infer::get_from_path(path)
        .ok()
        .flatten()
        .map(|kind| normalize_extension(kind.extension()))
}

/// Returns true if `ext` (normalised) belongs to the image set whose capture
/// date is inspected.
pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_category_for_is_case_insensitive() {
        let mut map = CategoryMap::new();
        map.insert(".pdf", "Documents");
        assert_eq!(map.category_for(".PDF"), Some("Documents"));
        assert_eq!(map.category_for("Pdf"), Some("Documents"));
    }

    #[test]
    fn test_unknown_extension() {
        let map = CategoryMap::from_groups([("Documents", vec![".pdf"])]);
        assert_eq!(map.category_for(".xyz"), None);
        assert_eq!(map.category_for(""), None);
    }

    #[test]
    fn test_later_group_wins_duplicate_extension() {
        let map = CategoryMap::from_groups([("Archives", vec![".gz"]), ("Backups", vec![".gz"])]);
        assert_eq!(map.category_for(".gz"), Some("Backups"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_is_category_name() {
        let map = CategoryMap::from_groups([("Music", vec!["mp3", "flac"])]);
        assert!(map.is_category_name("Music"));
        assert!(!map.is_category_name("music"));
        assert!(!map.is_category_name("Other"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("a/photo.JPG")), Some(".jpg".to_string()));
        assert_eq!(extension_of(Path::new("archive.tar.gz")), Some(".gz".to_string()));
        assert_eq!(extension_of(Path::new("Makefile")), None);
        assert_eq!(extension_of(Path::new(".bashrc")), None);
    }

    #[test]
    fn test_image_extensions() {
        assert!(is_image_extension(".jpg"));
        assert!(is_image_extension(".dng"));
        assert!(!is_image_extension(".gif"));
        assert!(!is_image_extension("jpg"));
    }

    #[test]
    fn test_sniff_extension_detects_png() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("no_extension");
        fs::write(&path, b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR").expect("Failed to write file");

        assert_eq!(sniff_extension(&path), Some(".png".to_string()));
    }

    #[test]
    fn test_sniff_extension_plain_text() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("notes");
        fs::write(&path, "just some words").expect("Failed to write file");

        assert_eq!(sniff_extension(&path), None);
    }
}
