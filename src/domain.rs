use crate::error::{MonitorError, Result};
use chrono::{DateTime, Utc};
use globset::{GlobBuilder, GlobMatcher};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub mod folder_evaluator;
pub mod group_reducer;
pub mod run_coordinator;

pub use folder_evaluator::{age_in_days, evaluate_folder, rate_age, select_file, EvalContext};
pub use group_reducer::{check_group, reduce_group};
pub use run_coordinator::{RunCoordinator, RunReport};

/// Age used when no age could be determined. Sorts "no data" and failed
/// results to the old end of a group.
pub const SENTINEL_AGE_DAYS: i64 = 9_999_999;

/// Source of the current time for a run
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Modification time of a single file, read fresh on every probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileObservation {
    pub path: PathBuf,
    pub name: String,
    pub modified_at: DateTime<Utc>,
}

impl FileObservation {
    pub fn from_path(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| MonitorError::io(path, e))?;
        Self::from_metadata(path, &metadata)
    }

    /// Builds the observation from metadata the caller already holds
    pub fn from_metadata(path: &Path, metadata: &fs::Metadata) -> Result<Self> {
        let modified = metadata.modified().map_err(|e| MonitorError::io(path, e))?;

        // Names that are not valid UTF-8 are shown lossily
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());

        Ok(FileObservation {
            path: path.to_path_buf(),
            name,
            modified_at: modified.into(),
        })
    }
}

/// File name pattern such as `*.zip` or `backup-??.tar`, matched against
/// bare file names (case-insensitive).
#[derive(Debug, Clone)]
pub struct FilePattern {
    raw: String,
    matcher: GlobMatcher,
}

impl FilePattern {
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let glob = if trimmed.is_empty() { "*" } else { trimmed };

        let matcher = GlobBuilder::new(glob)
            .case_insensitive(true)
            .literal_separator(true)
            .build()
            .map_err(|source| MonitorError::Pattern {
                pattern: raw.to_string(),
                source,
            })?
            .compile_matcher();

        Ok(Self {
            raw: raw.to_string(),
            matcher,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, file_name: impl AsRef<Path>) -> bool {
        self.matcher.is_match(file_name)
    }
}

/// Lists the files directly inside `dir_path` whose names match `pattern`.
///
/// Subdirectories are neither returned nor descended into. An empty result
/// is not an error; a missing or unreadable folder is.
pub fn probe_files(dir_path: &Path, pattern: &FilePattern) -> Result<Vec<FileObservation>> {
    let entries = fs::read_dir(dir_path).map_err(|e| MonitorError::io(dir_path, e))?;
    let mut observations = Vec::new();

    for entry_result in entries {
        let entry = entry_result.map_err(|e| MonitorError::io(dir_path, e))?;
        if !pattern.matches(entry.file_name()) {
            continue;
        }

        let path = entry.path();
        let metadata = fs::metadata(&path).map_err(|e| MonitorError::io(&path, e))?;
        if metadata.is_dir() {
            continue;
        }

        observations.push(FileObservation::from_metadata(&path, &metadata)?);
    }

    tracing::debug!(
        folder = %dir_path.display(),
        pattern = pattern.as_str(),
        count = observations.len(),
        "probed folder"
    );

    Ok(observations)
}

/// Freshness rating of a folder or group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rating {
    /// Label taken from the group's rating table
    Label(String),
    /// No matching files were found
    NoData,
    /// The age exceeded every threshold, or a folder of the group did
    RatingError,
}

impl Rating {
    pub const NO_DATA: &'static str = "no data";
    pub const RATING_ERROR: &'static str = "rating error";

    pub fn as_str(&self) -> &str {
        match self {
            Rating::Label(label) => label.as_str(),
            Rating::NoData => Self::NO_DATA,
            Rating::RatingError => Self::RATING_ERROR,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rated(Rating),
    Failed(String),
}

/// Result of evaluating one folder or one group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub source_name: String,
    pub age_days: i64,
    pub outcome: Outcome,
}

impl CheckResult {
    pub fn rated(source_name: impl Into<String>, rating: Rating, age_days: i64) -> Self {
        Self {
            source_name: source_name.into(),
            age_days,
            outcome: Outcome::Rated(rating),
        }
    }

    pub fn no_data(source_name: impl Into<String>) -> Self {
        Self::rated(source_name, Rating::NoData, SENTINEL_AGE_DAYS)
    }

    pub fn rating_error(source_name: impl Into<String>) -> Self {
        Self::rated(source_name, Rating::RatingError, SENTINEL_AGE_DAYS)
    }

    pub fn failed(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            age_days: SENTINEL_AGE_DAYS,
            outcome: Outcome::Failed(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Rated(_))
    }

    pub fn rating(&self) -> Option<&Rating> {
        match &self.outcome {
            Outcome::Rated(rating) => Some(rating),
            Outcome::Failed(_) => None,
        }
    }

    pub fn error_detail(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Rated(_) => None,
            Outcome::Failed(detail) => Some(detail.as_str()),
        }
    }

    pub fn is_rating_error(&self) -> bool {
        self.rating() == Some(&Rating::RatingError)
    }

    /// Same result reported under another name
    pub fn relabel(self, source_name: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            ..self
        }
    }

    /// One line of the email digest
    pub fn format_for_email(&self) -> String {
        match &self.outcome {
            Outcome::Rated(rating) => format!(
                "Group {:<40} has age {:>2} days --> {}",
                self.source_name, self.age_days, rating
            ),
            Outcome::Failed(detail) => format!(
                "Group {:<40} or a folder of it couldn't be read. Error messages: {}",
                self.source_name, detail
            ),
        }
    }
}
