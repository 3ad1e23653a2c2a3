//! Document processor trait for turning uploads into text

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Text and page count extracted from a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDocument {
    /// Number of pages in the document
    pub pages: u32,
    /// Extracted text
    pub content: String,
}

impl ExtractedDocument {
    pub fn new(pages: u32, content: impl Into<String>) -> Self {
        Self {
            pages,
            content: content.into(),
        }
    }

    /// True when no readable text came out of the document
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Trait for document text extraction
///
/// Implementations:
/// - `PdfProcessor`: pdf-extract with a per-page lopdf fallback and optional OCR
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    /// Extract page count and text, or fail with `Error::Content`
    async fn extract(&self, data: Bytes) -> Result<ExtractedDocument>;

    /// Cheap page count used before a task is created
    ///
    /// `None` means the count could not be determined without a full parse.
    fn probe_page_count(&self, data: &[u8]) -> Option<u32>;

    /// Get processor name for logging
    fn name(&self) -> &str;
}
