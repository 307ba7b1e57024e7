//! Monitor configuration: groups of backup folders and where results go

use crate::domain::{FilePattern, Rating};
use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Locations tried, in order, when no configuration path is given
const DEFAULT_LOCATIONS: &[&str] = &["/opt/appsettings.json", "./appsettings.json"];

/// Largest accepted `timezone_offset_hours`, in either direction
pub const MAX_TIMEZONE_OFFSET_HOURS: i64 = 24;

/// Largest accepted `update_interval_minutes` (one year)
pub const MAX_UPDATE_INTERVAL_MINUTES: u64 = 366 * 24 * 60;

fn default_update_interval() -> u64 {
    60
}

/// Which file inside a folder represents the folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileSelection {
    TakeNewestFileInRoot,
    TakeOldestFileInRoot,
}

/// Which folder of a group represents the group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderSelection {
    /// Optimistic: the group is as fresh as its freshest folder
    TakeNewestFolder,
    /// Pessimistic: the group is only as fresh as its stalest folder
    TakeOldestFolder,
}

impl fmt::Display for FileSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for FolderSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Ages up to and including `max_age_days` get `label`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingThreshold {
    pub max_age_days: i64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    /// Path relative to the configured base folder
    pub path: PathBuf,
    /// File name pattern of the files that indicate a backup, e.g. `*.zip`
    pub pattern: String,
    pub strategy: FileSelection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub strategy: FolderSelection,
    /// Consulted in configured order; the first threshold that fits wins
    pub ratings: Vec<RatingThreshold>,
    pub folders: Vec<Folder>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub use_tls: bool,
    pub username: String,
    pub password: String,
    pub from: String,
    pub to: String,
    /// `{{AGE}}` is replaced by the largest age of the run
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Folder paths of all groups are resolved against this folder
    pub base_folder: PathBuf,
    /// Minutes between runs; 0 means a single run
    #[serde(default = "default_update_interval")]
    pub update_interval_minutes: u64,
    /// Hours added to file times when they are shown in trace output
    #[serde(default)]
    pub timezone_offset_hours: i64,
    #[serde(default)]
    pub email: Option<EmailSettings>,
    pub groups: Vec<Group>,
}

impl MonitorConfig {
    /// Per-user config file path (~/.config/backup-monitor/config.json)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("backup-monitor").join("config.json"))
    }

    /// Candidate config files, explicit path first
    pub fn candidate_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates: Vec<PathBuf> = explicit.map(Path::to_path_buf).into_iter().collect();
        candidates.extend(DEFAULT_LOCATIONS.iter().map(PathBuf::from));
        candidates.extend(Self::user_config_path());
        candidates
    }

    /// Loads the first existing candidate file
    pub fn locate(explicit: Option<&Path>) -> Result<(PathBuf, Self)> {
        let candidates = Self::candidate_paths(explicit);
        for candidate in &candidates {
            tracing::debug!(path = %candidate.display(), "trying configuration file");
            if candidate.is_file() {
                let config = Self::load(candidate)?;
                return Ok((candidate.clone(), config));
            }
        }

        let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
        Err(MonitorError::Config(format!(
            "No configuration file found (tried {})",
            tried.join(", ")
        )))
    }

    /// Reads, parses and validates a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| MonitorError::io(path, e))?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks everything that can be checked before a run
    pub fn validate(&self) -> Result<()> {
        if self.groups.is_empty() {
            return Err(MonitorError::Config("No groups configured".to_string()));
        }

        let offset_range = -MAX_TIMEZONE_OFFSET_HOURS..=MAX_TIMEZONE_OFFSET_HOURS;
        if !offset_range.contains(&self.timezone_offset_hours) {
            return Err(MonitorError::Config(format!(
                "timezone_offset_hours {} is outside -{max}..={max}",
                self.timezone_offset_hours,
                max = MAX_TIMEZONE_OFFSET_HOURS
            )));
        }

        if self.update_interval_minutes > MAX_UPDATE_INTERVAL_MINUTES {
            return Err(MonitorError::Config(format!(
                "update_interval_minutes {} exceeds {}",
                self.update_interval_minutes, MAX_UPDATE_INTERVAL_MINUTES
            )));
        }

        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(MonitorError::Config("Group without a name".to_string()));
            }
            if group.folders.is_empty() {
                return Err(MonitorError::EmptyGroup(group.name.clone()));
            }
            if group.ratings.is_empty() {
                return Err(MonitorError::Config(format!(
                    "Group '{}' has no ratings",
                    group.name
                )));
            }

            for threshold in &group.ratings {
                if threshold.label == Rating::NO_DATA || threshold.label == Rating::RATING_ERROR {
                    return Err(MonitorError::Config(format!(
                        "Group '{}' uses the reserved rating label '{}'",
                        group.name, threshold.label
                    )));
                }
            }

            if group
                .ratings
                .windows(2)
                .any(|pair| pair[0].max_age_days > pair[1].max_age_days)
            {
                tracing::warn!(
                    group = %group.name,
                    "ratings are not in ascending order; they are consulted as configured"
                );
            }

            for folder in &group.folders {
                FilePattern::new(&folder.pattern)?;
            }
        }

        if let Some(email) = &self.email {
            email.validate()?;
        }

        Ok(())
    }

    /// Human readable dump of the configuration, one line per entry
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Targets:".to_string(),
            match &self.email {
                Some(email) => format!(
                    "Email target            : {}:{} / {} / *************** -> {}",
                    email.host, email.port, email.username, email.to
                ),
                None => "Email target            : (disabled)".to_string(),
            },
            "Parameters:".to_string(),
            format!("UpdateIntervalInMinutes : {}", self.update_interval_minutes),
            format!("TimezoneOffset          : {} hours", self.timezone_offset_hours),
            "Source directories:".to_string(),
            format!("BaseFolder              : {}", self.base_folder.display()),
            "Groups:".to_string(),
        ];

        for group in &self.groups {
            lines.push(format!("    Group               : {}", group.name));
            lines.push(format!("    Strategy            : {}", group.strategy));
            lines.push("    Folders:".to_string());
            for folder in &group.folders {
                lines.push(format!("        Path            : {}", folder.path.display()));
                lines.push(format!("        Strategy        : {}", folder.strategy));
                lines.push(format!("        Pattern         : {}", folder.pattern));
            }
            lines.push("    Ratings:".to_string());
            for threshold in &group.ratings {
                lines.push(format!(
                    "        age <= {:>9} days --> \"{}\"",
                    threshold.max_age_days, threshold.label
                ));
            }
        }

        lines
    }
}

impl EmailSettings {
    fn validate(&self) -> Result<()> {
        let fields = [
            ("host", &self.host),
            ("username", &self.username),
            ("password", &self.password),
            ("from", &self.from),
            ("to", &self.to),
            ("subject", &self.subject),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(MonitorError::Config(format!("Email parameter '{}' is empty", name)));
            }
        }

        Ok(())
    }
}
