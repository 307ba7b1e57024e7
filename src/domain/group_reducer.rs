use super::folder_evaluator::{evaluate_folder, EvalContext};
use super::{CheckResult, Outcome};
use crate::config::{FolderSelection, Group};
use crate::error::{MonitorError, Result};
use crate::trace::TraceSink;

/// Evaluates every folder of `group` and combines the folder results
pub fn check_group(
    group: &Group,
    ctx: &EvalContext<'_>,
    trace: &mut dyn TraceSink,
) -> CheckResult {
    let folder_results: Vec<CheckResult> = group
        .folders
        .iter()
        .map(|folder| evaluate_folder(folder, &group.ratings, ctx, trace))
        .collect();

    reduce_group(group, &folder_results, trace)
}

/// Combines per-folder results into one result named after the group.
///
/// A single folder rated "rating error" makes the whole group a rating
/// error. Otherwise the group strategy picks the freshest or the stalest
/// folder; failed folders take part with the sentinel age.
pub fn reduce_group(
    group: &Group,
    folder_results: &[CheckResult],
    trace: &mut dyn TraceSink,
) -> CheckResult {
    match try_reduce_group(group, folder_results, trace) {
        Ok(result) => result,
        Err(e) => {
            trace.trace(&format!("    Error reading group: {}", e));
            tracing::warn!(group = %group.name, error = %e, "group reduction failed");
            CheckResult::failed(group.name.clone(), e.to_string())
        }
    }
}

fn try_reduce_group(
    group: &Group,
    folder_results: &[CheckResult],
    trace: &mut dyn TraceSink,
) -> Result<CheckResult> {
    trace.trace("");
    trace.trace(&format!(
        "    Merging group results with strategy {}:",
        group.strategy
    ));
    for result in folder_results {
        let shown = match &result.outcome {
            Outcome::Rated(rating) => rating.to_string(),
            Outcome::Failed(_) => "failed".to_string(),
        };
        trace.trace(&format!(
            "    {:<50} --> {:<5} ({} days)",
            result.source_name, shown, result.age_days
        ));
    }

    if let Some(poisoned) = folder_results.iter().find(|r| r.is_rating_error()) {
        trace.trace(&format!(
            "    Folder '{}' could not be rated, group is a rating error",
            poisoned.source_name
        ));
        return Ok(CheckResult::rating_error(group.name.clone()));
    }

    let chosen = match group.strategy {
        FolderSelection::TakeNewestFolder => folder_results.iter().min_by_key(|r| r.age_days),
        FolderSelection::TakeOldestFolder => folder_results.iter().max_by_key(|r| r.age_days),
    }
    .ok_or_else(|| MonitorError::EmptyGroup(group.name.clone()))?;

    match &chosen.outcome {
        Outcome::Rated(rating) => trace.trace(&format!(
            "    Rating          : {} days ----> {}",
            chosen.age_days, rating
        )),
        Outcome::Failed(_) => trace.trace(&format!(
            "    Rating          : folder '{}' failed",
            chosen.source_name
        )),
    }

    Ok(chosen.clone().relabel(group.name.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FileSelection, Folder, RatingThreshold};
    use crate::domain::{Rating, SENTINEL_AGE_DAYS};
    use chrono::{Duration, TimeZone, Utc};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn group(strategy: FolderSelection) -> Group {
        Group {
            name: "nas".to_string(),
            strategy,
            ratings: vec![
                RatingThreshold {
                    max_age_days: 3,
                    label: "OK".to_string(),
                },
                RatingThreshold {
                    max_age_days: 7,
                    label: "1w".to_string(),
                },
                RatingThreshold {
                    max_age_days: 9999999,
                    label: "old".to_string(),
                },
            ],
            folders: vec![],
        }
    }

    fn rated(name: &str, label: &str, age: i64) -> CheckResult {
        CheckResult::rated(name, Rating::Label(label.to_string()), age)
    }

    fn folder_ages() -> Vec<CheckResult> {
        vec![rated("a", "OK", 2), rated("b", "1w", 5), rated("c", "old", 9)]
    }

    mod reduce_tests {
        use super::*;

        #[test]
        fn test_oldest_folder_wins() {
            let mut sink = |_: &str| {};
            let result = reduce_group(
                &group(FolderSelection::TakeOldestFolder),
                &folder_ages(),
                &mut sink,
            );

            assert_eq!(result.age_days, 9);
            assert_eq!(result.rating(), Some(&Rating::Label("old".to_string())));
            assert_eq!(result.source_name, "nas");
        }

        #[test]
        fn test_newest_folder_wins() {
            let mut sink = |_: &str| {};
            let result = reduce_group(
                &group(FolderSelection::TakeNewestFolder),
                &folder_ages(),
                &mut sink,
            );

            assert_eq!(result.age_days, 2);
            assert_eq!(result.rating(), Some(&Rating::Label("OK".to_string())));
            assert_eq!(result.source_name, "nas");
        }

        #[test]
        fn test_rating_error_poisons_group() {
            let mut results = folder_ages();
            results.push(CheckResult::rated("d", Rating::RatingError, 40));

            for strategy in [
                FolderSelection::TakeNewestFolder,
                FolderSelection::TakeOldestFolder,
            ] {
                let mut sink = |_: &str| {};
                let result = reduce_group(&group(strategy), &results, &mut sink);
                assert!(result.is_success());
                assert_eq!(result.rating(), Some(&Rating::RatingError));
                assert_eq!(result.source_name, "nas");
            }
        }

        #[test]
        fn test_no_data_folder_loses_to_fresh_folder() {
            let results = vec![CheckResult::no_data("empty"), rated("a", "OK", 1)];

            let mut sink = |_: &str| {};
            let newest = reduce_group(
                &group(FolderSelection::TakeNewestFolder),
                &results,
                &mut sink,
            );
            let oldest = reduce_group(
                &group(FolderSelection::TakeOldestFolder),
                &results,
                &mut sink,
            );

            assert_eq!(newest.rating(), Some(&Rating::Label("OK".to_string())));
            assert_eq!(oldest.rating(), Some(&Rating::NoData));
            assert_eq!(oldest.age_days, SENTINEL_AGE_DAYS);
        }

        #[test]
        fn test_failed_folder_chosen_fails_group() {
            let results = vec![rated("a", "OK", 1), CheckResult::failed("b", "io error")];

            let mut sink = |_: &str| {};
            let oldest = reduce_group(
                &group(FolderSelection::TakeOldestFolder),
                &results,
                &mut sink,
            );
            let newest = reduce_group(
                &group(FolderSelection::TakeNewestFolder),
                &results,
                &mut sink,
            );

            assert!(!oldest.is_success());
            assert_eq!(oldest.error_detail(), Some("io error"));
            assert_eq!(oldest.source_name, "nas");
            assert!(newest.is_success());
        }

        #[test]
        fn test_empty_group_is_failed() {
            let mut sink = |_: &str| {};
            let result = reduce_group(&group(FolderSelection::TakeNewestFolder), &[], &mut sink);

            assert!(!result.is_success());
            assert!(result.error_detail().unwrap().contains("no folders"));
        }

        #[test]
        fn test_ties_prefer_first_newest_and_last_oldest() {
            let results = vec![rated("first", "OK", 2), rated("second", "1w", 2)];

            let mut lines = Vec::new();
            let mut sink = |line: &str| lines.push(line.to_string());
            let newest = reduce_group(
                &group(FolderSelection::TakeNewestFolder),
                &results,
                &mut sink,
            );
            let oldest = reduce_group(
                &group(FolderSelection::TakeOldestFolder),
                &results,
                &mut sink,
            );

            assert_eq!(newest.rating(), Some(&Rating::Label("OK".to_string())));
            assert_eq!(oldest.rating(), Some(&Rating::Label("1w".to_string())));
            assert!(lines.iter().any(|l| l.contains("TakeNewestFolder")));
        }
    }

    mod check_group_tests {
        use super::*;
        use crate::domain::folder_evaluator::EvalContext;

        #[test]
        fn test_check_group_reads_every_folder() {
            let now = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
            let temp_dir = TempDir::new().unwrap();
            for (name, days) in [("fresh", 1), ("stale", 6)] {
                let dir = temp_dir.path().join(name);
                fs::create_dir(&dir).unwrap();
                let path = dir.join("dump.zip");
                fs::write(&path, b"dump").unwrap();
                let file = fs::File::options().write(true).open(&path).unwrap();
                file.set_modified((now - Duration::days(days)).into()).unwrap();
            }

            let mut config = group(FolderSelection::TakeOldestFolder);
            config.folders = ["fresh", "stale", "missing"]
                .iter()
                .map(|name| Folder {
                    path: PathBuf::from(name),
                    pattern: "*.zip".to_string(),
                    strategy: FileSelection::TakeNewestFileInRoot,
                })
                .collect();

            let ctx = EvalContext {
                base_folder: temp_dir.path(),
                now,
                timezone_offset_hours: 0,
            };

            let mut lines = Vec::new();
            let mut sink = |line: &str| lines.push(line.to_string());
            let result = check_group(&config, &ctx, &mut sink);

            // the missing folder fails and carries the sentinel age
            assert!(!result.is_success());
            assert_eq!(result.source_name, "nas");
            assert!(lines.iter().any(|l| l.contains("fresh")));
            assert!(lines.iter().any(|l| l.contains("stale")));

            config.strategy = FolderSelection::TakeNewestFolder;
            let mut sink = |_: &str| {};
            let result = check_group(&config, &ctx, &mut sink);
            assert_eq!(result.age_days, 1);
            assert_eq!(result.rating(), Some(&Rating::Label("OK".to_string())));
        }
    }
}
