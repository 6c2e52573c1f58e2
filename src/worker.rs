//! Background operations.
//!
//! A [`Session`] runs at most one scan or execution at a time on a worker
//! thread. The worker owns its inputs and reports back over a channel; the
//! caller owns all display state and only reacts to [`WorkerEvent`]s.

use crate::config::CompiledFilters;
use crate::file_organizer::{FileOrganizer, MoveOutcome, OrganizeResult};
use crate::journal;
use crate::model::{Action, Config, JournalEntry, Plan};
use crate::scanner::{CancellationToken, Planner};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, error};

/// Work handed to a background operation.
#[derive(Debug, Clone)]
pub enum Job {
    /// Classify the children of `target_dir` into a plan.
    Scan {
        target_dir: PathBuf,
        config: Arc<Config>,
        filters: Option<Arc<CompiledFilters>>,
    },
    /// Perform approved actions and persist the journal at `journal_path`.
    Execute {
        actions: Vec<Action>,
        journal_path: PathBuf,
    },
}

/// Messages sent from a background operation to its session owner.
#[derive(Debug)]
pub enum WorkerEvent {
    ScanProgress {
        scanned: usize,
        total: usize,
    },
    /// Terminal event of a scan.
    PlanReady(Plan),
    StepFinished {
        index: usize,
        action: Action,
        outcome: MoveOutcome,
    },
    /// Terminal event of an execution. `saved` is `Ok(false)` when nothing
    /// was moved and no journal was written.
    Executed {
        journal: Vec<JournalEntry>,
        saved: OrganizeResult<bool>,
    },
}

impl WorkerEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PlanReady(_) | Self::Executed { .. })
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("An operation is already in progress")]
    Busy,
    #[error("Background operation ended without reporting a result")]
    WorkerLost,
}

/// Owner of the "operation in progress" flag and the shared cancellation
/// token.
#[derive(Debug, Default)]
pub struct Session {
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_some()
    }

    /// A handle that cancels whatever operation is running, usable from
    /// other threads such as a signal handler.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Launches `job` on a worker thread and returns the receiving end of
    /// its event stream.
    ///
    /// Refuses while a previous operation has not been finished. A cancel
    /// requested while idle is not cleared here, so the job stops at its
    /// first cancellation check.
    pub fn start(&mut self, job: Job) -> Result<Receiver<WorkerEvent>, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }

        let cancel = self.cancel.clone();
        let (tx, rx) = mpsc::channel();

        self.worker = Some(thread::spawn(move || run_job(job, cancel, tx)));
        Ok(rx)
    }

    /// Clears the in-progress flag and the cancellation request once the
    /// terminal event has arrived.
    pub fn finish(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Background operation panicked.");
            }
            self.cancel.reset();
        }
    }

    /// Runs `job` to completion, passing every non-terminal event to
    /// `on_event`, and returns the terminal event.
    pub fn run<F>(&mut self, job: Job, mut on_event: F) -> Result<WorkerEvent, SessionError>
    where
        F: FnMut(&WorkerEvent),
    {
        let events = self.start(job)?;

        let terminal = loop {
            match events.recv() {
                Ok(event) if event.is_terminal() => break Ok(event),
                Ok(event) => on_event(&event),
                Err(_) => break Err(SessionError::WorkerLost),
            }
        };

        self.finish();
        terminal
    }
}

fn run_job(job: Job, cancel: CancellationToken, tx: Sender<WorkerEvent>) {
    match job {
        Job::Scan {
            target_dir,
            config,
            filters,
        } => {
            debug!("Scan worker started for {}", target_dir.display());
            let mut planner = Planner::new(&config);
            if let Some(filters) = filters.as_deref() {
                planner = planner.with_filters(filters);
            }

            let plan = planner.generate_plan_with_progress(&target_dir, cancel, |scanned, total| {
                let _ = tx.send(WorkerEvent::ScanProgress { scanned, total });
            });
            let _ = tx.send(WorkerEvent::PlanReady(plan));
        }
        Job::Execute {
            actions,
            journal_path,
        } => {
            debug!("Execution worker started with {} actions", actions.len());
            let mut index = 0;
            let journal = FileOrganizer::execute_with_progress(&actions, cancel, |action, outcome| {
                let _ = tx.send(WorkerEvent::StepFinished {
                    index,
                    action: action.clone(),
                    outcome: outcome.clone(),
                });
                index += 1;
            });

            let saved = journal::save(&journal_path, &journal);
            let _ = tx.send(WorkerEvent::Executed { journal, saved });
        }
    }
}
