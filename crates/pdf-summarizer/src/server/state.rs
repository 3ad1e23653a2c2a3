//! Application state for the summarizer server

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::SummarizerConfig;
use crate::error::Result;
use crate::ingestion::PdfProcessor;
use crate::processing::{TaskEngine, TaskStore};
use crate::providers::{build_summarizer, DocumentProcessor, SummarizationClient};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: SummarizerConfig,
    /// Task engine (owns the task store)
    engine: TaskEngine,
    /// Server start time
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Create state with the PDF processor and the configured summarization backend
    pub fn new(config: SummarizerConfig) -> Result<Self> {
        tracing::info!(
            "Initializing summarizer state (backend: {:?}, history size: {})",
            config.llm.backend,
            config.processing.history_size
        );

        let processor: Arc<dyn DocumentProcessor> =
            Arc::new(PdfProcessor::from_config(&config.processing));
        let summarizer = build_summarizer(&config.llm)?;

        Ok(Self::with_collaborators(config, processor, summarizer))
    }

    /// Create state around explicit collaborators
    pub fn with_collaborators(
        config: SummarizerConfig,
        processor: Arc<dyn DocumentProcessor>,
        summarizer: Arc<dyn SummarizationClient>,
    ) -> Self {
        let store = Arc::new(TaskStore::new(config.processing.history_size));
        let engine = TaskEngine::new(
            store,
            processor,
            summarizer,
            config.upload.clone(),
            config.processing.clone(),
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                engine,
                started_at: Utc::now(),
            }),
        }
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.inner.config
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.inner.engine
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Time since the state was created; zero if the clock went backwards
    pub fn uptime(&self) -> Duration {
        (Utc::now() - self.inner.started_at)
            .to_std()
            .unwrap_or_default()
    }

    /// Ready when the summarization backend answers its health check
    pub async fn is_ready(&self) -> bool {
        let summarizer = self.inner.engine.summarizer();
        match summarizer.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                tracing::warn!("{} health check failed: {}", summarizer.name(), e);
                false
            }
        }
    }
}
