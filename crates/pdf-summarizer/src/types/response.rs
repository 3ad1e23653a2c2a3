//! Response types for the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::{HistoryEntry, ProcessingResult, Task, TaskId, TaskState};
use crate::processing::{StoreStats, SubmitReceipt};

/// Response from the upload endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Unique task identifier for tracking
    pub task_id: TaskId,
    /// Current task status
    pub status: TaskState,
    /// Human-readable status message
    pub message: String,
}

impl From<SubmitReceipt> for UploadResponse {
    fn from(receipt: SubmitReceipt) -> Self {
        Self {
            task_id: receipt.task_id,
            status: receipt.status,
            message: receipt.message,
        }
    }
}

/// Response from the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    pub task_id: TaskId,
    pub status: TaskState,
    /// Progress percentage (0-100)
    pub progress: u8,
    pub result: Option<ProcessingResult>,
    pub error: Option<String>,
}

impl From<Task> for TaskStatusResponse {
    fn from(task: Task) -> Self {
        Self {
            task_id: task.id,
            status: task.state,
            progress: task.progress,
            result: task.result,
            error: task.error,
        }
    }
}

/// Response from the history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    /// Processed documents, most recent first
    pub documents: Vec<HistoryEntry>,
    pub total: usize,
}

impl From<Vec<HistoryEntry>> for HistoryResponse {
    fn from(documents: Vec<HistoryEntry>) -> Self {
        let total = documents.len();
        Self { documents, total }
    }
}

/// Response from the stats endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub tasks: StoreStats,
    /// Summarization backend name
    pub backend: String,
    pub model: String,
    /// Seconds since the server started
    pub uptime_secs: u64,
}

/// Response from the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TaskMetadata;

    #[test]
    fn test_status_response_keeps_null_fields() {
        let task = Task::new(TaskId::new(), TaskMetadata::new("a.pdf", 10));
        let json = serde_json::to_value(TaskStatusResponse::from(task)).unwrap();
        assert_eq!(json["status"], "processing");
        assert_eq!(json["progress"], 0);
        assert!(json["result"].is_null());
        assert!(json["error"].is_null());
    }
}
