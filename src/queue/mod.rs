//! The pending-task queue.
//!
//! The queue is the only mutable state shared between the scheduler loop and
//! the control plane, so every operation takes the one internal lock:
//! enqueue, dequeue, snapshot and remove-by-id are linearizable with respect
//! to each other. Inspection is a read-only clone under the lock; the queue
//! is never drained to be peeked.

use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::core::task::Task;
use crate::core::types::TaskId;

/// FIFO queue of pending tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    inner: Mutex<VecDeque<Task>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a task to the back of the queue.
    pub async fn enqueue(&self, task: Task) {
        self.inner.lock().await.push_back(task);
    }

    /// Add a task to the back of the queue unless a task with the same id is
    /// already queued. Returns whether the task was inserted.
    ///
    /// Used by the control plane; the scheduler's own requeue path uses
    /// [`enqueue`](Self::enqueue) since it re-inserts a task it just removed.
    pub async fn enqueue_unique(&self, task: Task) -> bool {
        let mut queue = self.inner.lock().await;
        if queue.iter().any(|t| t.id() == task.id()) {
            return false;
        }
        queue.push_back(task);
        true
    }

    /// Remove and return the front task. Non-blocking poll semantics:
    /// returns `None` on an empty queue rather than suspending.
    pub async fn dequeue(&self) -> Option<Task> {
        self.inner.lock().await.pop_front()
    }

    /// Remove and return every queued task, in order. This is the
    /// scheduler's frozen per-tick view: tasks enqueued afterwards are seen
    /// on the next tick.
    pub async fn drain(&self) -> Vec<Task> {
        self.inner.lock().await.drain(..).collect()
    }

    /// Clone every queued task, in current order, without removing any.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.inner.lock().await.iter().cloned().collect()
    }

    /// Remove at most one task with the given id, preserving the relative
    /// order of the rest. Returns whether a match was found; an absent id is
    /// a no-op, not an error.
    pub async fn remove_by_id(&self, id: TaskId) -> bool {
        let mut queue = self.inner.lock().await;
        match queue.iter().position(|t| t.id() == id) {
            Some(index) => {
                queue.remove(index);
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
