//! Configuration for the summarizer service
//!
//! Every field has a default. A TOML file named by `PDF_SUMMARIZER_CONFIG`
//! may override any subset, and a handful of environment variables override
//! the file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "PDF_SUMMARIZER_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Upload limits
    pub upload: UploadConfig,
    /// Task processing configuration
    pub processing: ProcessingConfig,
    /// Summarization backend configuration
    pub llm: LlmConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl SummarizerConfig {
    /// Load configuration from defaults, optional file and environment
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))
    }

    /// Apply overrides from a key lookup (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("PDF_SUMMARIZER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PDF_SUMMARIZER_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("Invalid PDF_SUMMARIZER_PORT: {}", port)))?;
        }
        if let Some(backend) = lookup("PDF_SUMMARIZER_BACKEND") {
            self.llm.backend = match backend.to_lowercase().as_str() {
                "ollama" => SummarizerBackend::Ollama,
                "openai" => SummarizerBackend::OpenAi,
                other => {
                    return Err(Error::Config(format!("Unknown summarizer backend: {}", other)))
                }
            };
        }
        if let Some(url) = lookup("OLLAMA_BASE_URL") {
            if self.llm.backend == SummarizerBackend::Ollama {
                self.llm.base_url = Some(url);
            }
        }
        if let Some(model) = lookup("PDF_SUMMARIZER_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(level) = lookup("PDF_SUMMARIZER_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Reject limits that would make the service unusable
    pub fn validate(&self) -> Result<()> {
        if self.upload.max_file_size == 0 {
            return Err(Error::Config("upload.max_file_size must be positive".into()));
        }
        if self.upload.max_pages == 0 {
            return Err(Error::Config("upload.max_pages must be positive".into()));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(Error::Config("upload.allowed_extensions must not be empty".into()));
        }
        if self.processing.history_size == 0 {
            return Err(Error::Config("processing.history_size must be positive".into()));
        }
        if self.processing.extraction_timeout_secs == 0
            || self.processing.summarization_timeout_secs == 0
        {
            return Err(Error::Config("processing timeouts must be positive".into()));
        }
        if self.processing.sweep_interval_secs == 0 {
            return Err(Error::Config("processing.sweep_interval_secs must be positive".into()));
        }
        if self.processing.pdf_extract_timeout_secs == 0
            || self.processing.pdf_extract_timeout_secs >= self.processing.extraction_timeout_secs
        {
            return Err(Error::Config(format!(
                "processing.pdf_extract_timeout_secs must be between 1 and {} (below extraction_timeout_secs)",
                self.processing.extraction_timeout_secs.saturating_sub(1)
            )));
        }
        if self.processing.ocr.enabled && self.processing.ocr.dpi == 0 {
            return Err(Error::Config("processing.ocr.dpi must be positive".into()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::Config("llm.timeout_secs must be positive".into()));
        }
        if self.llm.max_retries > LlmConfig::MAX_RETRIES {
            return Err(Error::Config(format!(
                "llm.max_retries must be at most {}",
                LlmConfig::MAX_RETRIES
            )));
        }
        let worst_case = self.llm.worst_case_duration();
        if worst_case > self.processing.summarization_timeout() {
            return Err(Error::Config(format!(
                "llm retries can take {}s, longer than processing.summarization_timeout_secs ({}s)",
                worst_case.as_secs(),
                self.processing.summarization_timeout_secs
            )));
        }
        if self.llm.backend == SummarizerBackend::OpenAi && self.llm.api_key.is_none() {
            return Err(Error::Config(
                "OpenAI backend selected but no API key configured (set OPENAI_API_KEY)".into(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Allowed CORS origins ("*" allows any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://localhost:8000".to_string(),
            ],
        }
    }
}

/// Upload limits, checked before a task is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum upload size in bytes (default: 50MB)
    pub max_file_size: u64,
    /// Maximum number of pages per document
    pub max_pages: u32,
    /// Accepted filename extensions, including the dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 50 * 1024 * 1024, // 50MB
            max_pages: 100,
            allowed_extensions: vec![".pdf".to_string()],
        }
    }
}

impl UploadConfig {
    /// Check a filename against the allowed extensions (case-insensitive)
    pub fn is_file_allowed(&self, filename: &str) -> bool {
        let lower = filename.to_lowercase();
        self.allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
    }

    /// Request body limit for multipart uploads (file plus form overhead)
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_file_size)
            .unwrap_or(usize::MAX)
            .saturating_add(1024 * 1024)
    }
}

/// Task processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of completed documents kept in history
    pub history_size: usize,
    /// Timeout for document extraction in seconds
    pub extraction_timeout_secs: u64,
    /// How long pdf-extract may run before the lopdf fallback takes over;
    /// must leave room inside `extraction_timeout_secs`
    pub pdf_extract_timeout_secs: u64,
    /// Timeout for the summarization call in seconds
    pub summarization_timeout_secs: u64,
    /// How long finished tasks stay queryable, in seconds (default: 24h)
    pub task_retention_secs: u64,
    /// How often the retention sweeper runs, in seconds (default: 1h)
    pub sweep_interval_secs: u64,
    /// OCR for image-only PDFs
    #[serde(default)]
    pub ocr: OcrConfig,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            history_size: 5,
            extraction_timeout_secs: 120,
            pdf_extract_timeout_secs: 60,
            summarization_timeout_secs: 300,
            task_retention_secs: 24 * 60 * 60,
            sweep_interval_secs: 60 * 60,
            ocr: OcrConfig::default(),
        }
    }
}

impl ProcessingConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn pdf_extract_timeout(&self) -> Duration {
        Duration::from_secs(self.pdf_extract_timeout_secs)
    }

    pub fn summarization_timeout(&self) -> Duration {
        Duration::from_secs(self.summarization_timeout_secs)
    }

    pub fn task_retention(&self) -> Duration {
        Duration::from_secs(self.task_retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// OCR fallback settings (pdftoppm + tesseract)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Run OCR when a PDF has no text layer
    pub enabled: bool,
    /// Tesseract language code
    pub language: String,
    /// Render resolution for pdftoppm
    pub dpi: u32,
    /// pdftoppm executable (poppler-utils)
    pub pdftoppm_bin: String,
    /// tesseract executable
    pub tesseract_bin: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: "eng".to_string(),
            dpi: 150, // 150 DPI is a good balance of quality and speed
            pdftoppm_bin: "pdftoppm".to_string(),
            tesseract_bin: "tesseract".to_string(),
        }
    }
}

/// Summarization backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SummarizerBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// OpenAI-compatible chat completions API
    #[serde(rename = "openai")]
    OpenAi,
}

/// Summarization backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Backend provider
    pub backend: SummarizerBackend,
    /// Base URL (backend default when unset)
    pub base_url: Option<String>,
    /// Model name (backend default when unset)
    pub model: Option<String>,
    /// API key for the OpenAI-compatible backend
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Temperature for generation
    pub temperature: f32,
    /// Maximum tokens in the generated summary
    pub max_tokens: u32,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Retries for transient failures inside the client
    pub max_retries: u32,
    /// Extracted text beyond this many characters is truncated before prompting
    pub max_input_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: SummarizerBackend::Ollama,
            base_url: None,
            model: None,
            api_key: None,
            temperature: 0.3, // Lower for more factual summaries
            max_tokens: 1000,
            timeout_secs: 90,
            max_retries: 2,
            max_input_chars: 48_000,
        }
    }
}

impl LlmConfig {
    /// Upper bound for `max_retries`
    pub const MAX_RETRIES: u32 = 5;

    /// Longest a summarize call can take: every attempt timing out plus backoff
    pub fn worst_case_duration(&self) -> Duration {
        let attempts = u64::from(self.max_retries) + 1;
        let backoff = 2u64.saturating_pow(self.max_retries).saturating_sub(1);
        Duration::from_secs(
            self.timeout_secs
                .saturating_mul(attempts)
                .saturating_add(backoff),
        )
    }

    pub fn base_url(&self) -> &str {
        match (&self.base_url, self.backend) {
            (Some(url), _) => url.trim_end_matches('/'),
            (None, SummarizerBackend::Ollama) => "http://localhost:11434",
            (None, SummarizerBackend::OpenAi) => "https://api.openai.com",
        }
    }

    pub fn model(&self) -> &str {
        match (&self.model, self.backend) {
            (Some(model), _) => model,
            (None, SummarizerBackend::Ollama) => "phi3",
            (None, SummarizerBackend::OpenAi) => "gpt-4o-mini",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for this crate's logs (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Default `EnvFilter` directive when `RUST_LOG` is unset
    pub fn filter_directive(&self) -> String {
        format!("pdf_summarizer={},tower_http=info", self.level.to_lowercase())
    }
}
