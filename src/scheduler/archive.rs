//! Archive of terminal tasks.
//!
//! When a task runs out of recurrence it leaves the queue, but its result
//! history stays reachable here for `/results` and `/tasks/{id}` instead of
//! vanishing with the last dispatch. Retention is bounded: the oldest
//! retired task is dropped once the archive is full.

use std::collections::VecDeque;
use tokio::sync::Mutex;

use crate::core::task::Task;
use crate::core::types::TaskId;

pub const DEFAULT_ARCHIVE_CAPACITY: usize = 256;

/// Bounded drop-oldest store of completed tasks.
#[derive(Debug)]
pub struct Archive {
    capacity: usize,
    inner: Mutex<VecDeque<Task>>,
}

impl Archive {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(VecDeque::new()),
        }
    }

    /// Move a terminal task into the archive, evicting the oldest entry if
    /// the archive is full. A task retired twice under the same id replaces
    /// its older entry.
    pub async fn retire(&self, task: Task) {
        let mut archived = self.inner.lock().await;
        if let Some(index) = archived.iter().position(|t| t.id() == task.id()) {
            archived.remove(index);
        }
        while archived.len() >= self.capacity {
            archived.pop_front();
        }
        archived.push_back(task);
    }

    /// Look up an archived task by id.
    pub async fn get(&self, id: TaskId) -> Option<Task> {
        self.inner.lock().await.iter().find(|t| t.id() == id).cloned()
    }

    /// Clone every archived task, oldest first.
    pub async fn snapshot(&self) -> Vec<Task> {
        self.inner.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl Default for Archive {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probes::ProbeSpec;

    fn task(id: u64) -> Task {
        Task::new(
            TaskId::new(id),
            ProbeSpec::GetPage {
                url: "http://example.org".to_string(),
            },
            None,
            None,
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_retire_and_get() {
        let archive = Archive::new(8);
        archive.retire(task(1)).await;

        assert!(archive.get(TaskId::new(1)).await.is_some());
        assert!(archive.get(TaskId::new(2)).await.is_none());
        assert_eq!(archive.len().await, 1);
    }

    #[tokio::test]
    async fn test_capacity_drops_oldest() {
        let archive = Archive::new(2);
        archive.retire(task(1)).await;
        archive.retire(task(2)).await;
        archive.retire(task(3)).await;

        assert_eq!(archive.len().await, 2);
        assert!(archive.get(TaskId::new(1)).await.is_none());
        assert!(archive.get(TaskId::new(3)).await.is_some());
    }

    #[tokio::test]
    async fn test_retire_same_id_replaces() {
        let archive = Archive::new(8);
        archive.retire(task(1)).await;
        archive.retire(task(1)).await;
        assert_eq!(archive.len().await, 1);
    }
}
