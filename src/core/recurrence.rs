//! Recurrence policy: decide, once per completed execution, whether a task
//! runs again and when.
//!
//! The state machine has four states: one-off, unbounded-recurring,
//! bounded-recurring(k) with k strictly decreasing, and terminal.
//! Transitions happen only on run completion, never on a schedule miss.

use chrono::{DateTime, Duration, Utc};

/// Outcome of the recurrence decision for one completed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The task will not run again.
    Terminal,
    /// The task runs again at `run_at`, with `remaining` future runs if
    /// bounded.
    Reschedule {
        run_at: DateTime<Utc>,
        remaining: Option<u32>,
    },
}

/// Evaluate the recurrence fields of a task against the current time.
///
/// Pure function of its arguments; callers apply the result to the task and
/// the queue. `count` without `interval_secs` is rejected at task
/// construction and never reaches this point; it evaluates as terminal.
pub fn evaluate(interval_secs: Option<u64>, count: Option<u32>, now: DateTime<Utc>) -> Disposition {
    let Some(interval) = interval_secs else {
        return Disposition::Terminal;
    };
    // An interval that cannot produce a representable next run time ends
    // the task instead of panicking mid-tick. Construction bounds the
    // interval, so this only triggers for tasks built outside Task::new.
    let next = i64::try_from(interval)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|d| now.checked_add_signed(d));
    let Some(run_at) = next else {
        return Disposition::Terminal;
    };

    match count {
        // Recur indefinitely.
        None => Disposition::Reschedule {
            run_at,
            remaining: None,
        },
        // Bounded, with runs left after this one.
        Some(k) if k > 1 => Disposition::Reschedule {
            run_at,
            remaining: Some(k - 1),
        },
        // This was the last run.
        Some(_) => Disposition::Terminal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_off_is_terminal() {
        assert_eq!(evaluate(None, None, Utc::now()), Disposition::Terminal);
    }

    #[test]
    fn test_unbounded_recurs_with_advanced_run_at() {
        let now = Utc::now();
        match evaluate(Some(30), None, now) {
            Disposition::Reschedule { run_at, remaining } => {
                assert_eq!(run_at, now + Duration::seconds(30));
                assert_eq!(remaining, None);
            }
            other => panic!("expected reschedule, got {:?}", other),
        }
    }

    #[test]
    fn test_bounded_count_strictly_decreases() {
        let now = Utc::now();
        match evaluate(Some(5), Some(3), now) {
            Disposition::Reschedule { run_at, remaining } => {
                assert_eq!(run_at, now + Duration::seconds(5));
                assert_eq!(remaining, Some(2));
            }
            other => panic!("expected reschedule, got {:?}", other),
        }
    }

    #[test]
    fn test_count_of_one_is_terminal() {
        assert_eq!(evaluate(Some(5), Some(1), Utc::now()), Disposition::Terminal);
    }

    #[test]
    fn test_bounded_task_runs_exactly_count_times() {
        let now = Utc::now();
        let mut count = Some(4u32);
        let mut runs = 0;
        loop {
            runs += 1;
            match evaluate(Some(1), count, now) {
                Disposition::Reschedule { remaining, .. } => count = remaining,
                Disposition::Terminal => break,
            }
        }
        assert_eq!(runs, 4);
    }

    #[test]
    fn test_unrepresentable_interval_is_terminal() {
        let now = Utc::now();
        assert_eq!(
            evaluate(Some(10_000_000_000_000_000), None, now),
            Disposition::Terminal
        );
        assert_eq!(evaluate(Some(u64::MAX), Some(5), now), Disposition::Terminal);
    }

    #[test]
    fn test_invalid_combination_evaluates_terminal() {
        // Rejected at construction; defensively terminal here.
        assert_eq!(evaluate(None, Some(2), Utc::now()), Disposition::Terminal);
    }
}
