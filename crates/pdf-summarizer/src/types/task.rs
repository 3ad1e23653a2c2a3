//! Task records and the values stored alongside them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a submitted document's processing task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    /// Generate a new random task id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Task lifecycle state
///
/// `Processing` is the only non-terminal state:
/// - Processing -> Completed
/// - Processing -> Failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Processing => "processing",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upload details captured when a task is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Original filename
    pub filename: String,
    /// File size in bytes
    pub file_size: u64,
}

impl TaskMetadata {
    pub fn new(filename: impl Into<String>, file_size: u64) -> Self {
        Self {
            filename: filename.into(),
            file_size,
        }
    }
}

/// Result of a successfully summarized document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    /// Original filename
    pub filename: String,
    /// AI-generated summary
    pub summary: String,
    /// Number of pages in the PDF
    pub page_count: u32,
    /// Processing completion timestamp
    pub processed_at: DateTime<Utc>,
    /// File size in bytes
    pub file_size: u64,
}

/// One submitted document's processing lifecycle record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub state: TaskState,
    /// Coarse pipeline position, 0-100
    pub progress: u8,
    pub filename: String,
    pub file_size: u64,
    /// Present only when `state` is `Completed`
    pub result: Option<ProcessingResult>,
    /// Present only when `state` is `Failed`
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(id: TaskId, metadata: TaskMetadata) -> Self {
        let now = Utc::now();
        Self {
            id,
            state: TaskState::Processing,
            progress: 0,
            filename: metadata.filename,
            file_size: metadata.file_size,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Immutable snapshot of a completed task kept in the recent-activity list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub task_id: TaskId,
    pub filename: String,
    pub summary: String,
    pub page_count: u32,
    pub processed_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_result(task_id: TaskId, result: &ProcessingResult) -> Self {
        Self {
            task_id,
            filename: result.filename.clone(),
            summary: result.summary.clone(),
            page_count: result.page_count,
            processed_at: result.processed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_display_round_trips() {
        let id = TaskId::new();
        let parsed: TaskId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-task".parse::<TaskId>().is_err());
    }

    #[test]
    fn test_new_task_starts_processing() {
        let task = Task::new(TaskId::new(), TaskMetadata::new("report.pdf", 1024));
        assert_eq!(task.state, TaskState::Processing);
        assert_eq!(task.progress, 0);
        assert!(task.result.is_none());
        assert!(task.error.is_none());
        assert!(!task.is_terminal());
    }

    #[test]
    fn test_state_serializes_lowercase() {
        let json = serde_json::to_string(&TaskState::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Processing.is_terminal());
    }
}
