//! Core identifier types for the poller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task ids generated locally fall in the same range the wire has always
/// used for controller-assigned ids.
const GENERATED_ID_MAX: u64 = 99_999;

/// Unique identifier for a scheduled task.
///
/// Ids normally arrive from the controller on the wire (`_id`); tasks created
/// without one get a generated id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(u64);

impl TaskId {
    /// Create a TaskId from a raw id value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Generate a random TaskId for tasks created without one.
    pub fn generate() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen_range(1..=GENERATED_ID_MAX))
    }

    /// Get the underlying id value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for TaskId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_creation() {
        let id = TaskId::new(42);
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_task_id_display() {
        let id = TaskId::new(7);
        assert_eq!(format!("{}", id), "7");
    }

    #[test]
    fn test_task_id_from_u64() {
        let id: TaskId = 13u64.into();
        assert_eq!(id, TaskId::new(13));
    }

    #[test]
    fn test_generated_id_in_range() {
        for _ in 0..100 {
            let id = TaskId::generate();
            assert!(id.value() >= 1 && id.value() <= 99_999);
        }
    }

    #[test]
    fn test_ids_are_hashable() {
        use std::collections::HashSet;

        let mut ids: HashSet<TaskId> = HashSet::new();
        ids.insert(TaskId::new(1));
        ids.insert(TaskId::new(2));
        ids.insert(TaskId::new(1)); // duplicate
        assert_eq!(ids.len(), 2);
    }
}
