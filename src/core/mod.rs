//! Core data types of the poller: tasks, reports, recurrence.

pub mod recurrence;
pub mod report;
pub mod task;
pub mod types;
