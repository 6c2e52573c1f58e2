//! tidyplan - rule-driven folder organization with reviewable plans
//!
//! This library classifies the entries of a directory into categories using
//! extension maps, directory-content rules and image capture dates, scans in
//! parallel with cooperative cancellation, executes approved moves with
//! collision-free naming, and journals every move so it can be undone.

pub mod capture_date;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod journal;
pub mod logging;
pub mod model;
pub mod output;
pub mod scanner;
pub mod undo;
pub mod worker;

pub use classifier::Classifier;
pub use config::{CompiledFilters, ConfigError, ConfigFile, LoadedConfig};
pub use file_category::CategoryMap;
pub use file_organizer::{FileOrganizer, MoveOutcome, OrganizeError};
pub use model::{Action, Condition, ConditionKind, Config, JournalEntry, Plan, Rule};
pub use scanner::{CancellationToken, Planner};
pub use undo::{UndoManager, UndoReport};
pub use worker::{Job, Session, SessionError, WorkerEvent};
