//! PDF summarizer server binary
//!
//! Run with: cargo run -p pdf-summarizer --bin pdf-summarizer-server

use anyhow::Context;
use pdf_summarizer::{
    config::SummarizerConfig, ingestion::TesseractOcr, server::SummarizerServer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before logging so the level can come from it
    let config = SummarizerConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter_directive().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Configuration loaded");
    tracing::info!("  - Backend: {:?}", config.llm.backend);
    tracing::info!("  - Model: {}", config.llm.model());
    tracing::info!("  - Max file size: {} bytes", config.upload.max_file_size);
    tracing::info!("  - Max pages: {}", config.upload.max_pages);
    tracing::info!("  - History size: {}", config.processing.history_size);
    tracing::info!(
        "  - Timeouts: extraction {}s (pdf-extract {}s), summarization {}s",
        config.processing.extraction_timeout_secs,
        config.processing.pdf_extract_timeout_secs,
        config.processing.summarization_timeout_secs
    );

    let server = SummarizerServer::new(config.clone()).context("Failed to initialize server")?;

    // Check the summarization backend
    tracing::info!("Checking summarization backend at {}...", config.llm.base_url());
    if server.state().is_ready().await {
        tracing::info!("Summarization backend is reachable");
    } else {
        tracing::warn!(
            "Summarization backend not available at {}; uploads will fail until it is",
            config.llm.base_url()
        );
        if config.llm.backend == pdf_summarizer::config::SummarizerBackend::Ollama {
            tracing::warn!("Start Ollama with `ollama serve` and pull the model:");
            tracing::warn!("  ollama pull {}", config.llm.model());
        }
    }

    if config.processing.ocr.enabled
        && !TesseractOcr::new(config.processing.ocr.clone()).is_available()
    {
        tracing::warn!("OCR enabled but pdftoppm/tesseract not found; scanned PDFs will fail");
        tracing::warn!("  apt install poppler-utils tesseract-ocr");
    }

    tracing::info!("Health: http://{}/health", server.address());
    tracing::info!("Press Ctrl+C to stop");

    server.start().await?;

    Ok(())
}
