use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use log::debug;

use super::aggregate::{Execution, RunRecord, RunStatus};

pub const DEFAULT_WINDOW_HOURS: u32 = 24;

/// Outcome of offering one run to the window while walking newest to oldest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Inside the window.
    Take(Execution),
    /// Still running or unavailable; look at the next run.
    Skip,
    /// Too old (or unreadable); nothing after this run is collected.
    Stop,
}

/// Trailing time window a run must have completed in to be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionWindow {
    hours: u32,
}

impl Default for ExecutionWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_HOURS)
    }
}

impl ExecutionWindow {
    pub fn new(hours: u32) -> Self {
        Self { hours }
    }

    pub fn hours(&self) -> u32 {
        self.hours
    }

    /// Oldest instant still outside the window; anything at or before it is too old.
    ///
    /// Windows reaching past the earliest representable instant start there.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(Duration::hours(i64::from(self.hours)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Whether a run completed at `completion_timestamp` falls inside the
    /// window. Unparsable timestamps never do.
    pub fn in_window(&self, completion_timestamp: &str, now: DateTime<Utc>) -> bool {
        parse_timestamp(completion_timestamp).is_some_and(|ts| ts > self.cutoff(now))
    }

    /// Decides what to do with one run.
    ///
    /// `record` is `None` when the store had no status for the run.
    pub fn step(
        &self,
        run_id: &str,
        record: Option<&RunRecord>,
        now: DateTime<Utc>,
        success_marker: &str,
    ) -> Step {
        let Some(record) = record else {
            debug!("No status available for run {run_id}, skipping");
            return Step::Skip;
        };

        let Some(completion) = record.completion_time.as_deref() else {
            return Step::Skip;
        };

        if !self.in_window(completion, now) {
            debug!(
                "Run {run_id} completed at '{completion}', not within the last {} hours; stopping",
                self.hours
            );
            return Step::Stop;
        }

        let Some(completed_at) = parse_timestamp(completion) else {
            return Step::Stop;
        };

        Step::Take(Execution::new(
            run_id,
            completed_at,
            record.url.clone(),
            RunStatus::from_state(&record.state, success_marker),
        ))
    }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%SZ")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
