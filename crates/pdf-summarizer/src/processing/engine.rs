//! Task engine driving each upload through extraction and summarization
//!
//! `submit` validates synchronously, creates the task and returns at once.
//! The pipeline then runs on its own tokio task and commits every state
//! change through the `TaskStore`.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::config::{ProcessingConfig, UploadConfig};
use crate::error::Result;
use crate::providers::{DocumentProcessor, ExtractedDocument, SummarizationClient};
use crate::types::{HistoryEntry, ProcessingResult, Task, TaskId, TaskMetadata, TaskState};

use super::store::{StoreStats, TaskStore};
use super::validation::{check_page_count, validate_upload, Upload};

/// Progress reported when extraction starts
pub const PROGRESS_EXTRACTING: u8 = 10;
/// Progress reported once text has been extracted
pub const PROGRESS_EXTRACTED: u8 = 50;

const INTERNAL_FAILURE: &str = "Processing failed: internal error";

/// Returned to the submitter as soon as the task exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub task_id: TaskId,
    pub status: TaskState,
    pub message: String,
}

/// Why a pipeline stopped, named by stage
#[derive(Debug, thiserror::Error)]
enum PipelineFailure {
    #[error("Extraction failed: {0}")]
    Extraction(String),
    #[error("Summarization failed: {0}")]
    Summarization(String),
}

/// Drives tasks from `processing` to `completed` or `failed`
#[derive(Clone)]
pub struct TaskEngine {
    store: Arc<TaskStore>,
    processor: Arc<dyn DocumentProcessor>,
    summarizer: Arc<dyn SummarizationClient>,
    limits: Arc<UploadConfig>,
    settings: Arc<ProcessingConfig>,
}

impl TaskEngine {
    pub fn new(
        store: Arc<TaskStore>,
        processor: Arc<dyn DocumentProcessor>,
        summarizer: Arc<dyn SummarizationClient>,
        limits: UploadConfig,
        settings: ProcessingConfig,
    ) -> Self {
        Self {
            store,
            processor,
            summarizer,
            limits: Arc::new(limits),
            settings: Arc::new(settings),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn summarizer(&self) -> &Arc<dyn SummarizationClient> {
        &self.summarizer
    }

    pub fn limits(&self) -> &UploadConfig {
        &self.limits
    }

    /// Validate an upload, create its task and start processing in the background
    ///
    /// Invalid uploads are rejected here and never produce a task.
    pub async fn submit(&self, upload: Upload) -> Result<SubmitReceipt> {
        validate_upload(&upload, &self.limits)?;

        if let Some(pages) = self.probe_page_count(&upload).await {
            check_page_count(pages, &self.limits)?;
        }

        let task_id = self
            .store
            .create(TaskMetadata::new(upload.filename.clone(), upload.size()));

        tracing::info!(
            "[TASK {}] Created for '{}' ({} bytes)",
            task_id,
            upload.filename,
            upload.size()
        );

        self.spawn_pipeline(task_id, upload);

        Ok(SubmitReceipt {
            task_id,
            status: TaskState::Processing,
            message: "PDF uploaded successfully. Processing started.".to_string(),
        })
    }

    /// Snapshot of a task
    pub fn status(&self, task_id: TaskId) -> Result<Task> {
        self.store.get(task_id)
    }

    /// Recently completed documents, most recent first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.store.list_history()
    }

    pub fn stats(&self) -> StoreStats {
        self.store.stats()
    }

    /// Periodically drop finished tasks older than the retention window
    pub fn spawn_retention_sweeper(&self) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let retention = self.settings.task_retention();
        let period = self.settings.sweep_interval().max(Duration::from_secs(1));

        tracing::info!(
            "Retention sweeper started: every {:?}, keeping finished tasks for {:?}",
            period,
            retention
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = store.prune_terminal(retention);
                if removed > 0 {
                    tracing::info!("Pruned {} finished task(s)", removed);
                }
            }
        })
    }

    async fn probe_page_count(&self, upload: &Upload) -> Option<u32> {
        let processor = Arc::clone(&self.processor);
        let data = upload.data.clone();

        match tokio::task::spawn_blocking(move || processor.probe_page_count(&data)).await {
            Ok(pages) => pages,
            Err(e) => {
                tracing::warn!("Page count probe aborted: {}", e);
                None
            }
        }
    }

    /// Run the pipeline on its own task; a panic inside it still fails the record
    fn spawn_pipeline(&self, task_id: TaskId, upload: Upload) {
        let engine = self.clone();

        tokio::spawn(async move {
            let runner = engine.clone();
            let outcome = tokio::spawn(async move { runner.run_pipeline(task_id, upload).await }).await;

            if let Err(e) = outcome {
                tracing::error!("[TASK {}] Pipeline aborted: {}", task_id, e);
                engine.record_failure(task_id, INTERNAL_FAILURE);
            }
        });
    }

    async fn run_pipeline(&self, task_id: TaskId, upload: Upload) {
        match self.execute(task_id, &upload).await {
            Ok(result) => {
                let summary_len = result.summary.len();
                match self.store.complete(task_id, result) {
                    Ok(()) => tracing::info!(
                        "[TASK {}] Completed, summary length: {} chars",
                        task_id,
                        summary_len
                    ),
                    Err(e) => tracing::warn!("[TASK {}] Could not complete: {}", task_id, e),
                }
            }
            Err(failure) => {
                tracing::error!("[TASK {}] {}", task_id, failure);
                self.record_failure(task_id, failure.to_string());
            }
        }
    }

    async fn execute(
        &self,
        task_id: TaskId,
        upload: &Upload,
    ) -> std::result::Result<ProcessingResult, PipelineFailure> {
        self.advance(task_id, PROGRESS_EXTRACTING);
        let document = self.extract(task_id, upload).await?;
        self.advance(task_id, PROGRESS_EXTRACTED);

        let summary = self.summarize(task_id, &document).await?;

        Ok(ProcessingResult {
            filename: upload.filename.clone(),
            summary,
            page_count: document.pages,
            processed_at: Utc::now(),
            file_size: upload.size(),
        })
    }

    async fn extract(
        &self,
        task_id: TaskId,
        upload: &Upload,
    ) -> std::result::Result<ExtractedDocument, PipelineFailure> {
        let limit = self.settings.extraction_timeout();
        tracing::info!(
            "[TASK {}] Extracting text with {} processor",
            task_id,
            self.processor.name()
        );

        let document = match timeout(limit, self.processor.extract(upload.data.clone())).await {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => return Err(PipelineFailure::Extraction(e.to_string())),
            Err(_) => {
                return Err(PipelineFailure::Extraction(format!(
                    "timed out after {}s",
                    limit.as_secs()
                )))
            }
        };

        if document.pages == 0 {
            return Err(PipelineFailure::Extraction(
                "document has no pages".to_string(),
            ));
        }
        check_page_count(document.pages, &self.limits)
            .map_err(|e| PipelineFailure::Extraction(e.to_string()))?;
        if document.is_blank() {
            return Err(PipelineFailure::Extraction(
                "no text could be extracted from the document".to_string(),
            ));
        }

        tracing::info!(
            "[TASK {}] Extracted {} page(s), {} chars",
            task_id,
            document.pages,
            document.content.len()
        );

        Ok(document)
    }

    async fn summarize(
        &self,
        task_id: TaskId,
        document: &ExtractedDocument,
    ) -> std::result::Result<String, PipelineFailure> {
        let limit = self.settings.summarization_timeout();
        tracing::info!(
            "[TASK {}] Summarizing with {} ({})",
            task_id,
            self.summarizer.name(),
            self.summarizer.model()
        );

        let summary = match timeout(limit, self.summarizer.summarize(&document.content)).await {
            Ok(Ok(summary)) => summary,
            Ok(Err(e)) => return Err(PipelineFailure::Summarization(e.to_string())),
            Err(_) => {
                return Err(PipelineFailure::Summarization(format!(
                    "timed out after {}s",
                    limit.as_secs()
                )))
            }
        };

        if summary.text.trim().is_empty() {
            return Err(PipelineFailure::Summarization(
                "backend returned an empty summary".to_string(),
            ));
        }

        Ok(summary.text)
    }

    fn advance(&self, task_id: TaskId, progress: u8) {
        if let Err(e) = self.store.update_progress(task_id, progress) {
            tracing::debug!("[TASK {}] Progress update skipped: {}", task_id, e);
        }
    }

    fn record_failure(&self, task_id: TaskId, reason: impl Into<String>) {
        if let Err(e) = self.store.fail(task_id, reason) {
            tracing::warn!("[TASK {}] Could not record failure: {}", task_id, e);
        }
    }
}
