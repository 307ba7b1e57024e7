//! Backup monitor - rates how stale backup folders are
//!
//! This crate inspects the modification times of backup files, rates each
//! folder and each group of folders against a configurable age table, and
//! hands the ratings to notifiers.

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod trace;

// Re-export primary types for convenience
pub use config::{
    EmailSettings, FileSelection, Folder, FolderSelection, Group, MonitorConfig, RatingThreshold,
};
pub use domain::{
    age_in_days, check_group, evaluate_folder, probe_files, rate_age, reduce_group, select_file,
    CheckResult, Clock, EvalContext, FileObservation, FilePattern, FixedClock, Outcome, Rating,
    RunCoordinator, RunReport, SystemClock, SENTINEL_AGE_DAYS,
};
pub use error::{MonitorError, Result};
pub use notify::{EmailDigest, EmailNotifier, LogNotifier, Notifier};
pub use trace::{RecordingSink, TraceSink, TracingSink};
