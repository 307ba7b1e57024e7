use super::{probe_files, CheckResult, FileObservation, FilePattern, Rating};
use crate::config::{FileSelection, Folder, RatingThreshold};
use crate::error::Result;
use crate::trace::TraceSink;
use chrono::{DateTime, Duration, Utc};
use std::path::Path;

/// Everything a folder evaluation needs besides the folder itself
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub base_folder: &'a Path,
    pub now: DateTime<Utc>,
    pub timezone_offset_hours: i64,
}

/// Picks the file that represents the folder.
///
/// Observations are ordered by modification time; ties keep listing order.
pub fn select_file(
    observations: &[FileObservation],
    strategy: FileSelection,
) -> Option<&FileObservation> {
    match strategy {
        FileSelection::TakeNewestFileInRoot => observations.iter().max_by_key(|o| o.modified_at),
        FileSelection::TakeOldestFileInRoot => observations.iter().min_by_key(|o| o.modified_at),
    }
}

/// Whole days between `modified_at` and `now`. Files from the future count as age 0.
pub fn age_in_days(now: DateTime<Utc>, modified_at: DateTime<Utc>) -> i64 {
    (now - modified_at).max(Duration::zero()).num_days()
}

/// File time shifted by the configured offset for trace output.
/// Offsets chrono cannot represent leave the time unshifted.
pub fn display_time(modified_at: DateTime<Utc>, offset_hours: i64) -> DateTime<Utc> {
    Duration::try_hours(offset_hours)
        .and_then(|offset| modified_at.checked_add_signed(offset))
        .unwrap_or(modified_at)
}

/// First threshold whose `max_age_days` covers the age wins
pub fn rate_age(age_days: i64, ratings: &[RatingThreshold]) -> Rating {
    ratings
        .iter()
        .find(|threshold| age_days <= threshold.max_age_days)
        .map(|threshold| Rating::Label(threshold.label.clone()))
        .unwrap_or(Rating::RatingError)
}

/// Rates one folder. I/O failures become a failed result instead of an error.
pub fn evaluate_folder(
    folder: &Folder,
    ratings: &[RatingThreshold],
    ctx: &EvalContext<'_>,
    trace: &mut dyn TraceSink,
) -> CheckResult {
    match try_evaluate_folder(folder, ratings, ctx, trace) {
        Ok(result) => result,
        Err(e) => {
            trace.trace(&format!("    Error reading folder: {}", e));
            tracing::warn!(folder = %folder.path.display(), error = %e, "folder evaluation failed");
            CheckResult::failed(folder.path.display().to_string(), e.to_string())
        }
    }
}

fn try_evaluate_folder(
    folder: &Folder,
    ratings: &[RatingThreshold],
    ctx: &EvalContext<'_>,
    trace: &mut dyn TraceSink,
) -> Result<CheckResult> {
    let source_name = folder.path.display().to_string();
    let full_path = ctx.base_folder.join(&folder.path);
    trace.trace(&format!(
        "    Reading folder  : '{}' with mask '{}'",
        full_path.display(),
        folder.pattern
    ));

    let pattern = FilePattern::new(&folder.pattern)?;
    let observations = probe_files(&full_path, &pattern)?;

    let picked = match select_file(&observations, folder.strategy) {
        Some(picked) => picked,
        None => {
            trace.trace("    No files found.");
            return Ok(CheckResult::no_data(source_name));
        }
    };

    let age_days = age_in_days(ctx.now, picked.modified_at);
    let rating = rate_age(age_days, ratings);

    let displayed_time = display_time(picked.modified_at, ctx.timezone_offset_hours);
    trace.trace(&format!("    Picked file     : '{}'", picked.name));
    trace.trace(&format!(
        "    Last write time : {}",
        displayed_time.format("%Y-%m-%d %H:%M:%S")
    ));
    trace.trace(&format!(
        "    Rating          : Age: {} days. -----> {}",
        age_days, rating
    ));

    Ok(CheckResult::rated(source_name, rating, age_days))
}
