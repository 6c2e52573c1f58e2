//! Capture-date extraction and date-template matching for images.
//!
//! Image metadata decoding is treated as a single exclusive resource: every
//! read in the process goes through [`MetadataGate::global`], even when many
//! classification workers run at once.

use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{LazyLock, Mutex, PoisonError};
use tracing::{debug, warn};

/// Placeholder replaced with the four-digit capture year in rule categories.
pub const EXIF_YEAR_TOKEN: &str = "{exif_year}";

static METADATA_GATE: LazyLock<MetadataGate> = LazyLock::new(MetadataGate::new);

/// Process-wide handle to the metadata decoder.
///
/// Holding the decoder behind one mutex serialises all metadata reads;
/// contention shows up here and nowhere else.
pub struct MetadataGate {
    reader: Mutex<Reader>,
}

impl MetadataGate {
    fn new() -> Self {
        Self {
            reader: Mutex::new(Reader::new()),
        }
    }

    /// The single gate shared by every classification call.
    pub fn global() -> &'static MetadataGate {
        &METADATA_GATE
    }

    /// Reads the original capture date of an image as `YYYY-MM-DD`.
    ///
    /// Returns `None` when the file has no usable date. Decoding errors are
    /// logged and never propagated.
    pub fn capture_date(&self, path: &Path) -> Option<String> {
        let reader = self.reader.lock().unwrap_or_else(PoisonError::into_inner);

        match read_capture_date(&reader, path) {
            Ok(date) => date,
            Err(exif::Error::NotFound(_)) => None,
            Err(e) => {
                warn!(
                    "Non-critical metadata error reading '{}': {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }
}

fn read_capture_date(reader: &Reader, path: &Path) -> Result<Option<String>, exif::Error> {
    let file = File::open(path)?;
    let exif = reader.read_from_container(&mut BufReader::new(file))?;

    let Some(field) = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY) else {
        debug!("No capture date in '{}'", path.display());
        return Ok(None);
    };

    Ok(match &field.value {
        Value::Ascii(parts) => parts.first().and_then(|raw| normalize_capture_date(raw)),
        _ => None,
    })
}

/// Turns a raw EXIF date-time (`YYYY:MM:DD HH:MM:SS`) into `YYYY-MM-DD`.
///
/// Only the first ten characters are used. Anything that is not shaped like
/// a date yields `None`.
pub fn normalize_capture_date(raw: &[u8]) -> Option<String> {
    let head = raw.get(..10)?;
    let mut date = String::with_capacity(10);

    for (i, &byte) in head.iter().enumerate() {
        match i {
            4 | 7 => {
                if byte != b':' && byte != b'-' {
                    return None;
                }
                date.push('-');
            }
            _ => {
                if !byte.is_ascii_digit() {
                    return None;
                }
                date.push(byte as char);
            }
        }
    }

    Some(date)
}

/// Matches a `YYYY-MM-DD` date against a ten-character template in which
/// `*` stands for any single character.
///
/// ```
/// use tidyplan::capture_date::date_matches_pattern;
///
/// assert!(date_matches_pattern("2023-06-15", "2023-06-**"));
/// assert!(date_matches_pattern("2023-06-15", "****-**-15"));
/// assert!(!date_matches_pattern("2023-07-15", "2023-06-**"));
/// assert!(!date_matches_pattern("2023-06-15", "2023-06"));
/// ```
pub fn date_matches_pattern(date: &str, pattern: &str) -> bool {
    if date.chars().count() != 10 || pattern.chars().count() != 10 {
        return false;
    }

    pattern
        .chars()
        .zip(date.chars())
        .all(|(p, d)| p == '*' || p == d)
}

/// Replaces [`EXIF_YEAR_TOKEN`] in a category name with the year of `date`.
pub fn resolve_exif_year(category: &str, date: &str) -> String {
    match date.get(..4) {
        Some(year) => category.replace(EXIF_YEAR_TOKEN, year),
        None => category.to_string(),
    }
}
