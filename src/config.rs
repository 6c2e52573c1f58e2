//! Configuration loading: categories, rules, and entry filters.
//!
//! Configuration is read from JSON (the canonical `config.json`) or TOML,
//! chosen by file extension. Both formats share one structure:
//!
//! ```toml
//! [categories]
//! Documents = [".pdf", ".docx"]
//! Images = [".jpg", ".png"]
//!
//! [[rules]]
//! category = "Projects"
//! priority = 10
//! conditions = [{ type = "contains_filename", values = ["package.json"] }]
//!
//! [filters]
//! include_hidden = false
//!
//! [filters.exclude]
//! filenames = ["desktop.ini", "Thumbs.db"]
//! patterns = ["*.crdownload", "*.part"]
//! extensions = ["tmp"]
//! regex = []
//!
//! [filters.include]
//! patterns = []
//! ```

use crate::file_category::CategoryMap;
use crate::model::{ConditionKind, Config, Rule};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

/// File name looked up in each search directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file could be loaded from any searched path.
    #[error("No usable configuration found; searched: {}", display_paths(.0))]
    NotFound(Vec<PathBuf>),
    /// IO error while reading configuration.
    #[error("IO error reading configuration {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Invalid JSON syntax or structure.
    #[error("Invalid configuration {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Invalid glob pattern provided.
    #[error("Invalid glob pattern '{0}': expected *.ext or name?")]
    InvalidGlobPattern(String),
    /// Invalid regex pattern provided with the actual error reason.
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// On-disk configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Category name to the extensions it collects.
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub filters: FilterRules,
}

/// Which directory entries a scan considers at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to consider hidden entries (starting with "."). Defaults to false.
    #[serde(default)]
    pub include_hidden: bool,

    /// Rules for excluding entries.
    #[serde(default)]
    pub exclude: ExcludeRules,

    /// Rules for including entries (whitelist, overrides exclude rules).
    #[serde(default)]
    pub include: IncludeRules,
}

/// Rules for excluding entries from organization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    /// Exact names to exclude (e.g., "desktop.ini", "Thumbs.db").
    #[serde(default)]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the entry name (e.g., "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// File extensions to exclude (e.g., "tmp", "crdownload").
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Regex patterns matched against the entry name.
    #[serde(default)]
    pub regex: Vec<String>,
}

/// Rules for including entries, overriding exclude rules (whitelist).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    /// Glob patterns that override exclude rules.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// A parsed configuration ready for scanning.
#[derive(Debug)]
pub struct LoadedConfig {
    pub config: Config,
    pub filters: CompiledFilters,
}

impl ConfigFile {
    /// Load a configuration document from a specific file.
    ///
    /// Files ending in `.toml` are parsed as TOML, everything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            toml::from_str(&content).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })
        } else {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// Builds the classification config (rules sorted by priority) and the
    /// compiled entry filters.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob patterns are invalid.
    pub fn compile(self) -> Result<LoadedConfig, ConfigError> {
        for rule in &self.rules {
            let unsupported = rule
                .conditions
                .iter()
                .filter(|c| c.kind == ConditionKind::Unsupported)
                .count();
            if unsupported > 0 {
                warn!(
                    "Rule '{}' has {} unsupported condition type(s) and will never match",
                    rule.category, unsupported
                );
            }
        }

        let filters = CompiledFilters::new(self.filters)?;
        let categories = CategoryMap::from_groups(self.categories);

        Ok(LoadedConfig {
            config: Config::new(categories, self.rules),
            filters,
        })
    }
}

/// Loads and compiles one configuration file, logging and returning `None`
/// on any failure.
pub fn load_config(path: &Path) -> Option<LoadedConfig> {
    if !path.exists() {
        error!("Error: Config file not found at {}", path.display());
        return None;
    }

    match ConfigFile::load(path).and_then(ConfigFile::compile) {
        Ok(loaded) => Some(loaded),
        Err(e) => {
            error!("Error parsing {}: {}", path.display(), e);
            None
        }
    }
}

/// Paths tried when looking for a configuration file.
///
/// An explicit path is used alone. Otherwise the executable's directory, the
/// working directory, the executable's parent directory, and the user config
/// directory are tried in that order.
pub fn search_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| cwd.clone());

    let mut paths = vec![exe_dir.join(CONFIG_FILE_NAME), cwd.join(CONFIG_FILE_NAME)];
    if let Some(parent) = exe_dir.parent() {
        paths.push(parent.join(CONFIG_FILE_NAME));
    }
    if let Some(config_dir) = dirs::config_dir() {
        let app_dir = config_dir.join("tidyplan");
        paths.push(app_dir.join(CONFIG_FILE_NAME));
        paths.push(app_dir.join("config.toml"));
    }

    let mut seen = HashSet::new();
    paths.retain(|p| seen.insert(p.clone()));
    paths
}

/// Loads the first usable configuration among `paths`.
pub fn discover(paths: &[PathBuf]) -> Result<(PathBuf, LoadedConfig), ConfigError> {
    for path in paths {
        info!("Trying config path: {}", path.display());
        if !path.exists() {
            continue;
        }

        info!("Found configuration at: {}", path.display());
        if let Some(loaded) = load_config(path) {
            info!("Configuration loaded successfully from: {}", path.display());
            return Ok((path.clone(), loaded));
        }
    }

    error!("Failed to load configuration from all paths.");
    Err(ConfigError::NotFound(paths.to_vec()))
}

/// Locates the user's downloads folder, the default organization target.
pub fn resolve_default_target_directory() -> Option<PathBuf> {
    let home = dirs::home_dir();

    if let Ok(xdg) = std::env::var("XDG_DOWNLOAD_DIR")
        && !xdg.is_empty()
    {
        if let Some(rest) = xdg.strip_prefix("$HOME")
            && let Some(home) = &home
        {
            return Some(home.join(rest.trim_start_matches('/')));
        }
        let path = PathBuf::from(xdg);
        if path.is_absolute() {
            return Some(path);
        }
    }

    dirs::download_dir().or_else(|| home.map(|home| home.join("Downloads")))
}

/// Compiled, optimized filter structures for efficient entry matching.
///
/// Pre-processes all filter rules (glob patterns, regex patterns, etc.) so
/// matching does not reparse patterns for every entry.
#[derive(Debug, Default)]
pub struct CompiledFilters {
    include_hidden: bool,
    exclude_filenames: HashSet<String>,
    exclude_extensions: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
}

impl CompiledFilters {
    /// Create compiled filters from filter rules.
    ///
    /// # Errors
    ///
    /// Returns an error if any glob or regex patterns are invalid.
    pub fn new(rules: FilterRules) -> Result<Self, ConfigError> {
        let compile_globs = |patterns: &[String]| {
            patterns
                .iter()
                .map(|pattern| {
                    Pattern::new(pattern)
                        .map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
                })
                .collect::<Result<Vec<_>, _>>()
        };

        let exclude_patterns = compile_globs(&rules.exclude.patterns)?;
        let include_patterns = compile_globs(&rules.include.patterns)?;

        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_hidden: rules.include_hidden,
            exclude_filenames: rules.exclude.filenames.into_iter().collect(),
            exclude_extensions: rules
                .exclude
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_patterns,
            exclude_regexes,
            include_patterns,
        })
    }

    /// Always exclude entries with this exact name, e.g. the journal file.
    pub fn exclude_name(&mut self, name: impl Into<String>) {
        self.exclude_filenames.insert(name.into());
    }

    /// Check if an entry should be considered for organization.
    ///
    /// Checks are performed in this order, with early termination:
    /// 1. Include patterns (whitelist) - if matched, always include
    /// 2. Hidden entry filter - if hidden and disabled, exclude
    /// 3. Exact name match - if matched, exclude
    /// 4. File extension match - if matched, exclude
    /// 5. Glob pattern match - if matched, exclude
    /// 6. Regex pattern match - if matched, exclude
    /// 7. Default: include
    pub fn should_include(&self, path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.include_patterns.iter().any(|p| p.matches(&name)) {
            return true;
        }

        if !self.include_hidden && name.starts_with('.') {
            return false;
        }

        if self.exclude_filenames.contains(name.as_ref()) {
            return false;
        }

        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            if self.exclude_extensions.contains(&ext_lower) {
                return false;
            }
        }

        if self.exclude_patterns.iter().any(|p| p.matches(&name)) {
            return false;
        }

        !self.exclude_regexes.iter().any(|regex| regex.is_match(&name))
    }
}
