//! pdf-summarizer: Upload PDFs and poll for AI-generated summaries
//!
//! Each upload becomes a task that is processed in the background: text is
//! extracted from the PDF, then summarized by an LLM backend (Ollama or an
//! OpenAI-compatible API). Clients poll task status and progress, and the
//! most recently completed summaries are kept in a short history.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod processing;
pub mod providers;
pub mod server;
pub mod types;

pub use config::SummarizerConfig;
pub use error::{Error, Result};
pub use processing::{TaskEngine, TaskStore, Upload};
pub use server::SummarizerServer;
pub use types::{HistoryEntry, ProcessingResult, Task, TaskId, TaskState};
