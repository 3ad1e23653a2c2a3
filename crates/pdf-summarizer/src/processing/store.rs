//! In-memory task store
//!
//! The store owns every task record and the bounded history list. All access
//! goes through one mutex; callers only ever receive cloned snapshots.

use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::{HistoryEntry, ProcessingResult, Task, TaskId, TaskMetadata, TaskState};

/// Highest progress a task may report before it completes
pub const MAX_PROCESSING_PROGRESS: u8 = 99;

const DEFAULT_FAILURE_REASON: &str = "Processing failed for an unknown reason";

/// Counts reported by the stats endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_tasks: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub history_size: usize,
    pub history_capacity: usize,
}

struct StoreInner {
    tasks: HashMap<TaskId, Task>,
    /// Newest first
    history: VecDeque<HistoryEntry>,
}

impl StoreInner {
    fn id_in_use(&self, id: &TaskId) -> bool {
        self.tasks.contains_key(id) || self.history.iter().any(|entry| entry.task_id == *id)
    }

    /// Look up a task that must still be processing
    fn processing_task(&mut self, id: TaskId) -> Result<&mut Task> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))?;

        if task.is_terminal() {
            return Err(Error::InvalidTransition {
                task_id: id,
                state: task.state,
            });
        }

        Ok(task)
    }
}

/// Task records plus the bounded history of completed documents
pub struct TaskStore {
    inner: Mutex<StoreInner>,
    history_capacity: usize,
}

impl TaskStore {
    /// Create an empty store keeping at most `history_capacity` history entries
    pub fn new(history_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                tasks: HashMap::new(),
                history: VecDeque::with_capacity(history_capacity.max(1) + 1),
            }),
            history_capacity: history_capacity.max(1),
        }
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    /// Insert a new processing task and return its id
    pub fn create(&self, metadata: TaskMetadata) -> TaskId {
        let mut inner = self.inner.lock();

        let mut id = TaskId::new();
        while inner.id_in_use(&id) {
            id = TaskId::new();
        }

        inner.tasks.insert(id, Task::new(id, metadata));
        id
    }

    /// Snapshot of a task
    pub fn get(&self, id: TaskId) -> Result<Task> {
        self.inner
            .lock()
            .tasks
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Raise a processing task's progress, returning the stored value
    ///
    /// Progress never decreases and stays below 100 until the task completes.
    /// Terminal tasks reject the update with `InvalidTransition`.
    pub fn update_progress(&self, id: TaskId, progress: u8) -> Result<u8> {
        let mut inner = self.inner.lock();
        let task = inner.processing_task(id)?;

        let capped = progress.min(MAX_PROCESSING_PROGRESS);
        if capped > task.progress {
            task.progress = capped;
            task.updated_at = Utc::now();
        }

        Ok(task.progress)
    }

    /// Transition `processing -> completed` and record the history entry
    pub fn complete(&self, id: TaskId, result: ProcessingResult) -> Result<()> {
        let mut inner = self.inner.lock();
        let task = inner.processing_task(id)?;

        let now = Utc::now();
        let entry = HistoryEntry::from_result(id, &result);
        task.state = TaskState::Completed;
        task.progress = 100;
        task.result = Some(result);
        task.updated_at = now;
        task.completed_at = Some(now);

        inner.history.push_front(entry);
        while inner.history.len() > self.history_capacity {
            inner.history.pop_back();
        }

        Ok(())
    }

    /// Transition `processing -> failed` with a non-empty reason
    pub fn fail(&self, id: TaskId, error: impl Into<String>) -> Result<()> {
        let mut error = error.into();
        if error.trim().is_empty() {
            error = DEFAULT_FAILURE_REASON.to_string();
        }

        let mut inner = self.inner.lock();
        let task = inner.processing_task(id)?;

        let now = Utc::now();
        task.state = TaskState::Failed;
        task.error = Some(error);
        task.updated_at = now;
        task.completed_at = Some(now);

        Ok(())
    }

    /// Completed documents, most recent first
    pub fn list_history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        let mut stats = StoreStats {
            total_tasks: inner.tasks.len(),
            history_size: inner.history.len(),
            history_capacity: self.history_capacity,
            ..Default::default()
        };

        for task in inner.tasks.values() {
            match task.state {
                TaskState::Processing => stats.processing += 1,
                TaskState::Completed => stats.completed += 1,
                TaskState::Failed => stats.failed += 1,
            }
        }

        stats
    }

    /// Drop terminal tasks last touched more than `max_age` ago
    ///
    /// History entries are kept, so their ids stay reserved.
    pub fn prune_terminal(&self, max_age: Duration) -> usize {
        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            return 0;
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            return 0;
        };

        let mut inner = self.inner.lock();
        let before = inner.tasks.len();
        inner
            .tasks
            .retain(|_, task| !task.is_terminal() || task.updated_at > cutoff);
        before - inner.tasks.len()
    }
}
