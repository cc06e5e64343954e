//! The poller's scheduler loop.
//!
//! On a fixed tick the loop drains the whole queue into a frozen working
//! set, dispatches every due task as its own tokio task, applies the
//! recurrence policy, and re-enqueues what still has runs left. Tasks
//! enqueued mid-tick by the control plane wait for the next tick.
//!
//! Dispatches are fanned out but not unbounded: a semaphore caps how many
//! probes are in flight at once, and each dispatch carries a deadline. A
//! probe failure or timeout lands in that task's report history and nowhere
//! else; the loop itself never sees it.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::task::JoinHandle;

use crate::core::recurrence::{self, Disposition};
use crate::core::report::ProbeReport;
use crate::core::task::Task;
use crate::probes::ProbeRunner;
use crate::queue::TaskQueue;

use super::archive::Archive;
use super::handle::{
    SchedulerCommand, SchedulerHandle, SchedulerState, COMMAND_CHANNEL_BUFFER,
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// The scheduling engine: owns the tick loop, dispatches probes, and applies
/// recurrence.
pub struct Poller {
    queue: Arc<TaskQueue>,
    runner: Arc<dyn ProbeRunner>,
    archive: Arc<Archive>,
    in_flight: Arc<Semaphore>,
    tick_interval: Duration,
    dispatch_timeout: Duration,
}

impl Poller {
    pub fn new(queue: Arc<TaskQueue>, runner: Arc<dyn ProbeRunner>) -> Self {
        Self {
            queue,
            runner,
            archive: Arc::new(Archive::default()),
            in_flight: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
            tick_interval: DEFAULT_TICK_INTERVAL,
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
        }
    }

    /// Use a shared archive (so the control plane can read it).
    pub fn with_archive(mut self, archive: Arc<Archive>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Cap on concurrently executing probes.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.in_flight = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    /// Deadline for one probe execution; on expiry the dispatch reports a
    /// timeout error instead of running forever.
    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn archive(&self) -> Arc<Archive> {
        Arc::clone(&self.archive)
    }

    /// Start the loop and return a handle for controlling it.
    pub fn start(self) -> (SchedulerHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_BUFFER);
        let state = Arc::new(RwLock::new(SchedulerState::Running));

        let handle = SchedulerHandle {
            command_tx,
            state: Arc::clone(&state),
        };

        let task = tokio::spawn(async move {
            self.run(command_rx, state).await;
        });

        (handle, task)
    }

    async fn run(
        self,
        mut command_rx: mpsc::Receiver<SchedulerCommand>,
        state: Arc<RwLock<SchedulerState>>,
    ) {
        let mut interval = tokio::time::interval(self.tick_interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }

                Some(command) = command_rx.recv() => {
                    match command {
                        SchedulerCommand::Shutdown { response } => {
                            *state.write().await = SchedulerState::Stopped;
                            tracing::info!("scheduler stopped");
                            let _ = response.send(());
                            break;
                        }
                    }
                }
            }
        }
    }

    /// One scheduling pass over a frozen view of the queue.
    ///
    /// A due task is dispatched at most once per tick; a not-yet-due task is
    /// re-enqueued unchanged, so nothing queued is ever lost.
    pub async fn tick(&self) {
        let working_set = self.queue.drain().await;
        if working_set.is_empty() {
            return;
        }

        let now = Utc::now();
        for mut task in working_set {
            if !task.is_due(now) {
                self.queue.enqueue(task).await;
                continue;
            }

            tracing::debug!(
                task_id = %task.id(),
                probe = task.probe().kind(),
                target = task.probe().target(),
                "dispatching due task"
            );
            self.dispatch(&task);

            match recurrence::evaluate(task.recurrence_time(), task.recurrence_count(), now) {
                Disposition::Reschedule { run_at, remaining } => {
                    task.set_schedule(run_at, remaining);
                    self.queue.enqueue(task).await;
                }
                Disposition::Terminal => {
                    tracing::debug!(task_id = %task.id(), "task is terminal, retiring");
                    self.archive.retire(task).await;
                }
            }
        }
    }

    /// Fire one probe execution as an independent unit of work. The loop
    /// does not wait for it; its report is appended to the task's shared
    /// sink whenever it finishes.
    fn dispatch(&self, task: &Task) {
        let runner = Arc::clone(&self.runner);
        let permits = Arc::clone(&self.in_flight);
        let deadline = self.dispatch_timeout;
        let spec = task.probe().clone();
        let sink = task.results().clone();
        let task_id = task.id();

        tokio::spawn(async move {
            // Backlogged dispatches queue on the semaphore, not the loop.
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return, // semaphore closed, shutting down
            };

            let started_at = Utc::now();
            let report = match tokio::time::timeout(deadline, runner.run(&spec)).await {
                Ok(report) => report,
                Err(_) => ProbeReport {
                    started_at,
                    finished_at: Utc::now(),
                    error: Some(format!("probe timed out after {:?}", deadline)),
                    payload: None,
                },
            };

            match &report.error {
                Some(error) => {
                    tracing::warn!(task_id = %task_id, error = %error, "probe failed")
                }
                None => tracing::debug!(task_id = %task_id, "probe completed"),
            }
            sink.append(report);
        });
    }
}
