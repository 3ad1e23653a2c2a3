//! Core types for the summarizer service

pub mod response;
pub mod task;

pub use response::{
    HealthResponse, HistoryResponse, StatsResponse, TaskStatusResponse, UploadResponse,
};
pub use task::{HistoryEntry, ProcessingResult, Task, TaskId, TaskMetadata, TaskState};
