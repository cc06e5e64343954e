//! Wire representation of tasks.
//!
//! The controller speaks a flat JSON object: the probe variant tag and its
//! parameters at the top level alongside `_id`, `run_at` (epoch seconds),
//! the recurrence fields, and the accumulated `results`.

use serde::{Deserialize, Serialize};

use crate::core::report::{epoch, ProbeReport};
use crate::core::task::{Task, TaskError};
use crate::core::types::TaskId;
use crate::probes::ProbeSpec;

/// One task as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWire {
    #[serde(flatten)]
    pub probe: ProbeSpec,
    /// Absent on POST means "generate one".
    #[serde(rename = "_id")]
    pub id: Option<u64>,
    /// Epoch seconds; absent on POST means "now".
    pub run_at: Option<f64>,
    pub recurrence_time: Option<u64>,
    pub recurrence_count: Option<u32>,
    /// Output only; ignored on POST.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ProbeReport>>,
}

impl TaskWire {
    /// Build the wire object for a task, including its result history.
    pub fn from_task(task: &Task) -> Self {
        Self {
            probe: task.probe().clone(),
            id: Some(task.id().value()),
            run_at: Some(epoch::to_f64(&task.run_at())),
            recurrence_time: task.recurrence_time(),
            recurrence_count: task.recurrence_count(),
            results: Some(task.results().snapshot()),
        }
    }

    /// Turn a received wire object into a task, generating an id and a
    /// run-at time where the wire left them out. Fails on an invalid
    /// recurrence combination or an unrepresentable `run_at`.
    pub fn into_task(self) -> Result<Task, TaskError> {
        let id = self.id.map(TaskId::new).unwrap_or_else(TaskId::generate);
        let run_at = self
            .run_at
            .map(|secs| epoch::try_from_f64(secs).ok_or(TaskError::RunAtOutOfRange))
            .transpose()?;
        Task::new(
            id,
            self.probe,
            run_at,
            self.recurrence_time,
            self.recurrence_count,
        )
    }
}
