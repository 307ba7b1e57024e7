use super::folder_evaluator::EvalContext;
use super::group_reducer::check_group;
use super::{CheckResult, Clock, SystemClock};
use crate::config::MonitorConfig;
use crate::notify::Notifier;
use crate::trace::{RecordingSink, TraceSink};
use chrono::{DateTime, Utc};

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// One result per group, in configuration order
    pub results: Vec<CheckResult>,
    pub trace_lines: Vec<String>,
}

impl RunReport {
    pub fn failed_groups(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    /// Largest group age of the run, sentinel included
    pub fn oldest_age_days(&self) -> Option<i64> {
        self.results.iter().map(|r| r.age_days).max()
    }
}

/// Runs the check over all configured groups.
///
/// `check` takes `&mut self`, so runs on one coordinator never overlap.
#[derive(Debug)]
pub struct RunCoordinator<C: Clock = SystemClock> {
    config: MonitorConfig,
    clock: C,
}

impl RunCoordinator<SystemClock> {
    pub fn new(config: MonitorConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> RunCoordinator<C> {
    pub fn with_clock(config: MonitorConfig, clock: C) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Evaluates every group in configuration order.
    ///
    /// Successful group results go to each notifier as soon as they are
    /// known; the full result list and the run's trace lines are handed
    /// over once at the end. A failing group or notifier never stops the run.
    pub fn check(
        &mut self,
        trace: &mut dyn TraceSink,
        notifiers: &mut [Box<dyn Notifier>],
    ) -> RunReport {
        let started_at = self.clock.now();
        let ctx = EvalContext {
            base_folder: &self.config.base_folder,
            now: started_at,
            timezone_offset_hours: self.config.timezone_offset_hours,
        };

        let mut recorder = RecordingSink::new(trace);
        recorder.trace("Analysis started.");
        tracing::debug!(groups = self.config.groups.len(), "run started");

        let mut results = Vec::with_capacity(self.config.groups.len());
        for group in &self.config.groups {
            recorder.trace(&format!("Group: {}", group.name));
            let result = check_group(group, &ctx, &mut recorder);

            if result.is_success() {
                for notifier in notifiers.iter_mut() {
                    if let Err(e) = notifier.group_result(group, &result) {
                        recorder.trace(&format!("{}: {}", notifier.name(), e));
                        tracing::warn!(notifier = notifier.name(), error = %e, "notifier failed");
                    }
                }
            } else {
                recorder.trace(&format!(
                    "Error processing group '{}': {}",
                    group.name,
                    result.error_detail().unwrap_or_default()
                ));
            }

            results.push(result);
        }
        recorder.trace("All groups processed");

        let lines_so_far = recorder.lines().to_vec();
        for notifier in notifiers.iter_mut() {
            if let Err(e) = notifier.run_finished(&results, &lines_so_far) {
                recorder.trace(&format!("{}: {}", notifier.name(), e));
                tracing::warn!(notifier = notifier.name(), error = %e, "notifier failed");
            }
        }

        if self.config.update_interval_minutes > 0 {
            recorder.trace(&format!(
                "Analysis ended. Next in {} minutes.",
                self.config.update_interval_minutes
            ));
        } else {
            recorder.trace("Analysis ended.");
        }

        RunReport {
            started_at,
            finished_at: self.clock.now(),
            results,
            trace_lines: recorder.into_lines(),
        }
    }
}
