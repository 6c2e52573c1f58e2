//! Scan orchestration: enumerate a directory, classify its children in
//! parallel chunks, and aggregate the proposed moves into a [`Plan`].

use crate::classifier::Classifier;
use crate::config::CompiledFilters;
use crate::model::{Action, Config, Plan};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

/// Entries classified concurrently before the next cancellation check.
pub const CHUNK_SIZE: usize = 128;

/// Token for cooperative cancellation of scans and executions.
///
/// Uses an AtomicBool internally. Clone is cheap and shares state.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request so the token can drive the next operation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Produces move plans for a target directory.
pub struct Planner<'a> {
    classifier: Classifier<'a>,
    filters: Option<&'a CompiledFilters>,
}

impl<'a> Planner<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            classifier: Classifier::new(config),
            filters: None,
        }
    }

    /// Entries rejected by `filters` are never classified.
    pub fn with_filters(mut self, filters: &'a CompiledFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    /// Scans the immediate children of `target_dir` and returns the proposed
    /// moves.
    ///
    /// Cancellation is checked before each chunk; a cancelled scan returns
    /// everything aggregated so far. A failure to enumerate `target_dir`
    /// yields an empty plan.
    pub fn generate_plan(&self, target_dir: &Path, cancel: CancellationToken) -> Plan {
        self.generate_plan_with_progress(target_dir, cancel, |_, _| {})
    }

    /// Like [`Planner::generate_plan`], reporting `(scanned, total)` after
    /// every chunk.
    pub fn generate_plan_with_progress<F>(
        &self,
        target_dir: &Path,
        cancel: CancellationToken,
        mut on_chunk: F,
    ) -> Plan
    where
        F: FnMut(usize, usize),
    {
        info!("Scanning directory for items to process...");

        let paths = match self.enumerate(target_dir) {
            Ok(paths) => paths,
            Err(e) => {
                error!(
                    "Error during initial directory scan of '{}': {}. Aborting.",
                    target_dir.display(),
                    e
                );
                return Plan::default();
            }
        };

        let total = paths.len();
        info!("Found {} items. Analyzing...", total);

        let result: Mutex<Vec<Action>> = Mutex::new(Vec::new());
        let mut scanned = 0;
        let mut cancelled = false;

        for chunk in paths.chunks(CHUNK_SIZE) {
            if cancel.is_cancelled() {
                cancelled = true;
                info!("Scan cancelled by user.");
                break;
            }

            let chunk_plan: Mutex<Vec<Action>> = Mutex::new(Vec::new());
            chunk.par_iter().for_each(|path| {
                if let Some(action) = self.classifier.classify(path, target_dir) {
                    chunk_plan
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(action);
                }
            });

            let chunk_plan = chunk_plan.into_inner().unwrap_or_else(PoisonError::into_inner);
            if !chunk_plan.is_empty() {
                result
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(chunk_plan);
            }

            scanned += chunk.len();
            on_chunk(scanned, total);
        }

        let actions = result.into_inner().unwrap_or_else(PoisonError::into_inner);
        if cancelled {
            info!(
                "Analysis cancelled. {} actions found before stop.",
                actions.len()
            );
        } else {
            info!("Analysis complete. Found {} actions.", actions.len());
        }

        Plan::new(actions, cancelled)
    }

    /// Lists the children of `target_dir` in sorted order, skipping entries
    /// that cannot be read for lack of permission and entries the filters
    /// reject.
    fn enumerate(&self, target_dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();

        for entry in fs::read_dir(target_dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => continue,
                Err(e) => return Err(e),
            };

            let path = entry.path();
            if self.filters.is_none_or(|filters| filters.should_include(&path)) {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }
}
