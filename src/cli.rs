// CLI module for argument parsing

use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Backup monitor - rates how stale your backup folders are
///
/// Reads the modification times of backup files, rates every configured
/// group and reports the ratings.
#[derive(Parser, Debug, Clone)]
#[command(name = "backup-monitor")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file
    ///
    /// If not specified, /opt/appsettings.json, ./appsettings.json and
    /// the per-user config file are tried in that order.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Run the check once and exit, ignoring the configured interval
    #[arg(long = "once", action = ArgAction::SetTrue)]
    pub once: bool,

    /// Log at debug level
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate the arguments and return any errors
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref path) = self.config {
            if !path.exists() {
                return Err(format!(
                    "Configuration file does not exist: {}",
                    path.display()
                ));
            }
            if path.is_dir() {
                return Err(format!(
                    "Configuration path is a directory: {}",
                    path.display()
                ));
            }
        }

        Ok(())
    }

    /// Filter directive for the log subscriber
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "backup_monitor=debug"
        } else {
            "backup_monitor=info"
        }
    }
}
