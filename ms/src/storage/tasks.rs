//! Task collection persistence adapter

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::KvStore;
use crate::domain::Task;

/// Fixed key under which the task collection is stored
pub const TASKS_KEY: &str = "microstep_tasks";

/// Reads and writes the full task collection
#[derive(Clone)]
pub struct TaskStorage {
    kv: Arc<dyn KvStore>,
}

impl TaskStorage {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Load the stored collection
    ///
    /// Absent or unreadable data yields an empty collection. Tasks with no
    /// steps and repeated ids are dropped, and inconsistent completion flags
    /// are repaired.
    pub fn load(&self) -> Vec<Task> {
        debug!("load: called");
        let raw = match self.kv.get(TASKS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("load: no stored tasks");
                return Vec::new();
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored tasks");
                return Vec::new();
            }
        };

        let parsed: Vec<Task> = match serde_json::from_str(&raw) {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = %e, "Failed to parse stored tasks, starting empty");
                return Vec::new();
            }
        };

        let mut seen = HashSet::new();
        let mut tasks = Vec::with_capacity(parsed.len());
        for mut task in parsed {
            if task.steps().is_empty() {
                warn!(task_id = %task.id(), "load: dropping task with no steps");
                continue;
            }
            if !seen.insert(task.id().to_string()) {
                warn!(task_id = %task.id(), "load: dropping duplicate task id");
                continue;
            }
            if task.normalize() {
                warn!(task_id = %task.id(), "load: repaired completion state");
            }
            tasks.push(task);
        }

        info!(count = tasks.len(), "Loaded tasks");
        tasks
    }

    /// Write the full collection
    ///
    /// Returns false if the write failed; the previously stored value is left
    /// as it was.
    pub fn save(&self, tasks: &[Task]) -> bool {
        debug!(count = tasks.len(), "save: called");
        let json = match serde_json::to_string(tasks) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize tasks");
                return false;
            }
        };

        match self.kv.set(TASKS_KEY, &json) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save tasks");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PlanResult, PlannedStep};
    use crate::storage::{FileKvStore, MemoryKvStore};
    use tempfile::TempDir;

    fn task(title: &str, steps: usize) -> Task {
        let steps = (0..steps).map(|i| PlannedStep::new(format!("s{}", i), "ok")).collect();
        Task::from_plan(format!("goal for {}", title), PlanResult::new(title, steps, "go")).unwrap()
    }

    fn memory_storage() -> (Arc<MemoryKvStore>, TaskStorage) {
        let kv = Arc::new(MemoryKvStore::new());
        let storage = TaskStorage::new(kv.clone());
        (kv, storage)
    }

    #[test]
    fn test_load_absent_is_empty() {
        let (_, storage) = memory_storage();
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_is_empty() {
        let (kv, storage) = memory_storage();
        kv.set(TASKS_KEY, "{not json").unwrap();
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_load_wrong_shape_is_empty() {
        let (kv, storage) = memory_storage();
        kv.set(TASKS_KEY, r#"{"tasks": []}"#).unwrap();
        assert!(storage.load().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_order_and_fields() {
        let (_, storage) = memory_storage();
        let mut first = task("first", 2);
        let first_step = first.steps()[0].id().to_string();
        first.toggle_step(&first_step).unwrap();
        first.attach_image("data:image/png;base64,AAAA");
        let tasks = vec![task("newest", 3), first, task("oldest", 1)];

        assert!(storage.save(&tasks));
        assert_eq!(storage.load(), tasks);
    }

    #[test]
    fn test_save_of_load_is_stable() {
        let (_, storage) = memory_storage();
        let tasks = vec![task("a", 1), task("b", 2)];
        storage.save(&tasks);

        let loaded = storage.load();
        assert!(storage.save(&loaded));
        assert_eq!(storage.load(), tasks);
    }

    #[test]
    fn test_save_failure_keeps_prior_state() {
        let (kv, storage) = memory_storage();
        let original = vec![task("kept", 1)];
        assert!(storage.save(&original));

        kv.set_fail_writes(true);
        assert!(!storage.save(&[task("lost", 1)]));
        assert_eq!(storage.load(), original);
    }

    #[test]
    fn test_load_drops_duplicates_and_empty_tasks() {
        let (kv, storage) = memory_storage();
        let json = r#"[
            {"id": "a", "originalInput": "g", "title": "A", "steps": [{"id": "s", "text": "t", "encouragement": "e"}], "overallEncouragement": "o", "createdAt": 2},
            {"id": "a", "originalInput": "g", "title": "A2", "steps": [{"id": "s", "text": "t", "encouragement": "e"}], "overallEncouragement": "o", "createdAt": 1},
            {"id": "b", "originalInput": "g", "title": "B", "steps": [], "overallEncouragement": "o", "createdAt": 1}
        ]"#;
        kv.set(TASKS_KEY, json).unwrap();

        let tasks = storage.load();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title(), "A");
    }

    #[test]
    fn test_round_trip_through_files() {
        let temp = TempDir::new().unwrap();
        let tasks = vec![task("x", 2), task("y", 1)];
        {
            let storage = TaskStorage::new(Arc::new(FileKvStore::open(temp.path()).unwrap()));
            assert!(storage.save(&tasks));
        }

        let fresh = TaskStorage::new(Arc::new(FileKvStore::open(temp.path()).unwrap()));
        assert_eq!(fresh.load(), tasks);
    }
}
