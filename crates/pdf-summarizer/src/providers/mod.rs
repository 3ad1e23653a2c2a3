//! Collaborator abstractions for document extraction and summarization
//!
//! Trait-based so the engine can run against the real PDF parser and HTTP
//! backends in production and against stubs in tests.

pub mod document;
pub mod ollama;
pub mod openai;
pub mod summarizer;

use std::sync::Arc;

pub use document::{DocumentProcessor, ExtractedDocument};
pub use ollama::OllamaSummarizer;
pub use openai::OpenAiSummarizer;
pub use summarizer::{SummarizationClient, Summary};

use crate::config::{LlmConfig, SummarizerBackend};
use crate::error::Result;

/// Create the summarization backend selected in config
pub fn build_summarizer(config: &LlmConfig) -> Result<Arc<dyn SummarizationClient>> {
    let summarizer: Arc<dyn SummarizationClient> = match config.backend {
        SummarizerBackend::Ollama => Arc::new(OllamaSummarizer::new(config)?),
        SummarizerBackend::OpenAi => Arc::new(OpenAiSummarizer::new(config)?),
    };

    tracing::info!(
        "Using {} summarization backend with model {}",
        summarizer.name(),
        summarizer.model()
    );

    Ok(summarizer)
}
