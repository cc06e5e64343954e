//! Scheduling engine: tick loop, dispatch, recurrence, and the archive of
//! completed tasks.

mod archive;
mod engine;
mod handle;

pub use archive::{Archive, DEFAULT_ARCHIVE_CAPACITY};
pub use engine::{
    Poller, DEFAULT_DISPATCH_TIMEOUT, DEFAULT_MAX_IN_FLIGHT, DEFAULT_TICK_INTERVAL,
};
pub use handle::{SchedulerError, SchedulerHandle, SchedulerState};
