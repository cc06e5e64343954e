//! The scheduling record for one probe.
//!
//! A [`Task`] ties a probe definition to its scheduling metadata (`run_at`,
//! recurrence fields) and its accumulated result history. Construction
//! validates the recurrence invariant; everything else about recurrence
//! lives in [`super::recurrence`].

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::report::ResultSink;
use super::types::TaskId;
use crate::probes::ProbeSpec;

/// Upper bound on the recurrence interval, in seconds. A century between
/// runs is beyond any plausible schedule and keeps every next run time
/// representable.
pub const MAX_RECURRENCE_SECS: u64 = 100 * 365 * 86_400;

/// Errors rejected at task construction time.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    /// A bounded recurrence without an interval is meaningless.
    #[error("can't create a recurring task with a recurrence count but no recurrence time")]
    RecurrenceWithoutInterval,

    /// A recurrence count of zero would mean "never runs again", which is
    /// what leaving it unset already means.
    #[error("recurrence count must be at least 1")]
    ZeroRecurrenceCount,

    #[error("recurrence time must be at most {MAX_RECURRENCE_SECS} seconds")]
    RecurrenceIntervalTooLarge,

    /// The requested run time is outside the representable range.
    #[error("run_at is out of range")]
    RunAtOutOfRange,
}

/// One scheduled probe.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    probe: ProbeSpec,
    run_at: DateTime<Utc>,
    recurrence_time: Option<u64>,
    recurrence_count: Option<u32>,
    results: ResultSink,
}

impl Task {
    /// Create a task.
    ///
    /// `run_at` defaults to now (an immediate one-off). `recurrence_time` is
    /// the interval in seconds between runs; `recurrence_count` bounds the
    /// number of remaining runs and requires `recurrence_time` to be set.
    pub fn new(
        id: TaskId,
        probe: ProbeSpec,
        run_at: Option<DateTime<Utc>>,
        recurrence_time: Option<u64>,
        recurrence_count: Option<u32>,
    ) -> Result<Self, TaskError> {
        if recurrence_count.is_some() && recurrence_time.is_none() {
            return Err(TaskError::RecurrenceWithoutInterval);
        }
        if recurrence_count == Some(0) {
            return Err(TaskError::ZeroRecurrenceCount);
        }
        if recurrence_time.is_some_and(|t| t > MAX_RECURRENCE_SECS) {
            return Err(TaskError::RecurrenceIntervalTooLarge);
        }

        Ok(Self {
            id,
            probe,
            run_at: run_at.unwrap_or_else(Utc::now),
            recurrence_time,
            recurrence_count,
            results: ResultSink::new(),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn probe(&self) -> &ProbeSpec {
        &self.probe
    }

    /// The next due execution time.
    pub fn run_at(&self) -> DateTime<Utc> {
        self.run_at
    }

    /// Interval in seconds between runs, if recurring.
    pub fn recurrence_time(&self) -> Option<u64> {
        self.recurrence_time
    }

    /// Remaining future runs, if bounded.
    pub fn recurrence_count(&self) -> Option<u32> {
        self.recurrence_count
    }

    /// Shared result history. Clones alias the same underlying sink.
    pub fn results(&self) -> &ResultSink {
        &self.results
    }

    /// Whether the task is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.run_at
    }

    /// Apply a reschedule decision from the recurrence policy.
    pub fn set_schedule(&mut self, run_at: DateTime<Utc>, remaining: Option<u32>) {
        self.run_at = run_at;
        self.recurrence_count = remaining;
    }
}
