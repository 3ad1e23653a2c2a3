//! PDF text extraction
//!
//! Text comes from pdf-extract. When that fails, hangs or yields nothing,
//! lopdf is used to pull text page by page. Scanned PDFs with no text layer
//! go through OCR when an engine is configured.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use super::ocr::{PageOcr, TesseractOcr};
use crate::config::ProcessingConfig;
use crate::error::{Error, Result};
use crate::providers::{DocumentProcessor, ExtractedDocument};

/// Unicode glyph names that leak into extracted text from some PDF fonts
const GLYPH_NAMES: &[(&str, &str)] = &[
    ("uni2010", "-"),
    ("uni2011", "-"),
    ("uni2013", "-"),
    ("uni2014", "--"),
    ("uni2018", "'"),
    ("uni2019", "'"),
    ("uni201C", "\""),
    ("uni201D", "\""),
    ("uni2022", "* "),
    ("uni2026", "..."),
    ("uni00A0", " "),
    ("uni20AC", "\u{20AC}"),
    ("uni00A9", "\u{00A9}"),
    ("uni00AE", "\u{00AE}"),
    ("uni2122", "\u{2122}"),
];

/// Replace glyph names, typographic punctuation and ligatures with plain text
pub fn cleanup_pdf_text(text: &str) -> String {
    let mut result = text.replace('\0', "");

    for &(glyph_name, replacement) in GLYPH_NAMES {
        result = result
            .replace(&format!("({})", glyph_name), replacement)
            .replace(&format!("<{}>", glyph_name), replacement)
            .replace(glyph_name, replacement);
    }

    result = result
        .replace(['\u{2010}', '\u{2011}', '\u{2013}'], "-")
        .replace('\u{2014}', "--")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl");

    result
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// `DocumentProcessor` backed by pdf-extract, lopdf and optional OCR
#[derive(Clone)]
pub struct PdfProcessor {
    /// How long to wait for pdf-extract before switching to the fallback
    pdf_extract_timeout: Duration,
    /// Used when neither text path finds anything
    ocr: Option<Arc<dyn PageOcr>>,
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl PdfProcessor {
    pub fn new(pdf_extract_timeout: Duration) -> Self {
        Self {
            pdf_extract_timeout,
            ocr: None,
        }
    }

    /// Processor with the configured pdf-extract timeout and OCR engine
    pub fn from_config(config: &ProcessingConfig) -> Self {
        let processor = Self::new(config.pdf_extract_timeout());
        if config.ocr.enabled {
            processor.with_ocr(Arc::new(TesseractOcr::new(config.ocr.clone())))
        } else {
            processor
        }
    }

    pub fn with_ocr(mut self, ocr: Arc<dyn PageOcr>) -> Self {
        self.ocr = Some(ocr);
        self
    }

    /// Blocking extraction; run on the blocking pool
    fn extract_blocking(&self, data: &[u8]) -> Result<ExtractedDocument> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::content(format!("Failed to read PDF: {}", e)))?;

        let page_count = doc.get_pages().len() as u32;
        if page_count == 0 {
            return Err(Error::content("PDF contains no pages"));
        }

        let text = match Self::extract_with_timeout(data, self.pdf_extract_timeout) {
            Some(text) if !text.trim().is_empty() => text,
            _ => match Self::extract_text_fallback(&doc) {
                Ok(text) => text,
                Err(no_text) => self.recognize(data, no_text)?,
            },
        };

        let content = cleanup_pdf_text(&text);
        if content.is_empty() {
            return Err(Error::content(
                "No text content could be extracted from PDF (it may be image-based or encrypted)",
            ));
        }

        tracing::debug!(
            "Extracted {} characters from {} page(s)",
            content.len(),
            page_count
        );

        Ok(ExtractedDocument::new(page_count, content))
    }

    /// Run pdf-extract on a separate thread so problematic fonts cannot hang us
    fn extract_with_timeout(data: &[u8], timeout: Duration) -> Option<String> {
        use std::sync::mpsc;
        use std::thread;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(timeout) {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                tracing::warn!("pdf-extract failed: {}, trying fallback", e);
                None
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!(
                    "pdf-extract timed out after {:?}, PDF may have complex fonts",
                    timeout
                );
                None
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("pdf-extract thread crashed");
                None
            }
        }
    }

    /// OCR the document, or return `no_text` when no engine is configured
    fn recognize(&self, data: &[u8], no_text: Error) -> Result<String> {
        let Some(ocr) = &self.ocr else {
            return Err(no_text);
        };

        tracing::info!("No text layer found, running OCR with {}", ocr.name());
        match ocr.recognize_pdf(data) {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => Err(Error::content(
                "PDF appears to be image-based and OCR found no text",
            )),
            Err(e) => Err(Error::content(format!(
                "PDF appears to be image-based and OCR failed: {}",
                e
            ))),
        }
    }

    /// Page-by-page extraction with lopdf
    fn extract_text_fallback(doc: &lopdf::Document) -> Result<String> {
        let mut all_text = String::new();

        for (page_num, page_id) in doc.get_pages() {
            let text = match doc.extract_text(&[page_num]) {
                Ok(text) if !text.trim().is_empty() => text,
                _ => match doc.get_page_content(page_id) {
                    Ok(content) => extract_text_from_content(&content),
                    Err(e) => {
                        tracing::debug!("Could not get content for page {}: {}", page_num, e);
                        continue;
                    }
                },
            };

            if !text.trim().is_empty() {
                all_text.push_str(&format!("\n--- Page {} ---\n", page_num));
                all_text.push_str(&text);
            }
        }

        if all_text.trim().is_empty() {
            tracing::warn!("Fallback extraction produced no text, PDF may be image-based or encrypted");
            return Err(Error::content(
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(all_text)
    }
}

/// Pull string operands of `Tj`/`TJ` operators out of a content stream
fn extract_text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;
    let mut current_text = String::new();

    for line in content_str.lines() {
        let line = line.trim();

        if line == "BT" {
            in_text_block = true;
            continue;
        }

        if line == "ET" {
            in_text_block = false;
            if !current_text.is_empty() {
                text.push_str(&current_text);
                text.push(' ');
                current_text.clear();
            }
            continue;
        }

        if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) {
            if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                if start < end {
                    let decoded = line[start + 1..end]
                        .replace("\\n", "\n")
                        .replace("\\r", "\r")
                        .replace("\\t", "\t")
                        .replace("\\(", "(")
                        .replace("\\)", ")")
                        .replace("\\\\", "\\");
                    current_text.push_str(&decoded);
                }
            }
        }
    }

    text
}

#[async_trait]
impl DocumentProcessor for PdfProcessor {
    async fn extract(&self, data: Bytes) -> Result<ExtractedDocument> {
        let processor = self.clone();
        tokio::task::spawn_blocking(move || processor.extract_blocking(&data))
            .await
            .map_err(|e| Error::content(format!("PDF extraction task failed: {}", e)))?
    }

    fn probe_page_count(&self, data: &[u8]) -> Option<u32> {
        match lopdf::Document::load_mem(data) {
            Ok(doc) => Some(doc.get_pages().len() as u32),
            Err(e) => {
                tracing::debug!("Page count probe failed: {}", e);
                None
            }
        }
    }

    fn name(&self) -> &str {
        "pdf"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_pdf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// OCR engine returning canned text
    struct CannedOcr {
        result: std::result::Result<String, String>,
        calls: AtomicUsize,
    }

    impl CannedOcr {
        fn new(result: std::result::Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                result: result.map(str::to_string).map_err(str::to_string),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl PageOcr for CannedOcr {
        fn recognize_pdf(&self, _data: &[u8]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone().map_err(Error::content)
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_cleanup_replaces_glyphs_and_blank_lines() {
        let cleaned = cleanup_pdf_text("  first\u{2014}line  \n\n\u{FB01}nal uni2019s\0\n");
        assert_eq!(cleaned, "first--line\nfinal 's");
    }

    #[test]
    fn test_content_stream_text() {
        let stream = b"BT\n/F1 12 Tf\n(Hello \\(world\\)) Tj\nET\nBT\n(Second) Tj\nET\n";
        assert_eq!(extract_text_from_content(stream), "Hello (world) Second ");
    }

    #[test]
    fn test_probe_counts_pages() {
        let processor = PdfProcessor::default();
        let pdf = sample_pdf(&["one", "two", "three"]);
        assert_eq!(processor.probe_page_count(&pdf), Some(3));
        assert_eq!(processor.probe_page_count(b"%PDF-1.4 garbage"), None);
    }

    #[tokio::test]
    async fn test_extracts_pages_and_text() {
        let processor = PdfProcessor::default();
        let pdf = sample_pdf(&[
            "Quarterly report for the northern region",
            "Revenue increased across all product lines",
        ]);

        let doc = processor.extract(pdf).await.unwrap();
        assert_eq!(doc.pages, 2);
        assert!(doc.content.contains("Quarterly"));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_content_error() {
        let processor = PdfProcessor::default();
        let err = processor
            .extract(Bytes::from_static(b"%PDF-1.7\nnot really a pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Content(_)));
    }

    #[tokio::test]
    async fn test_image_only_pdf_without_ocr_fails() {
        let processor = PdfProcessor::default();
        let err = processor.extract(sample_pdf(&["", ""])).await.unwrap_err();
        assert!(matches!(err, Error::Content(ref msg) if msg.contains("image-based")));
    }

    #[tokio::test]
    async fn test_image_only_pdf_uses_ocr() {
        let ocr = CannedOcr::new(Ok("\n--- Page 1 ---\nScanned invoice total 42\n"));
        let processor = PdfProcessor::default().with_ocr(ocr.clone());

        let doc = processor.extract(sample_pdf(&["", ""])).await.unwrap();
        assert_eq!(doc.pages, 2);
        assert!(doc.content.contains("Scanned invoice total 42"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_text_pdf_skips_ocr() {
        let ocr = CannedOcr::new(Ok("should not be used"));
        let processor = PdfProcessor::default().with_ocr(ocr.clone());

        let doc = processor
            .extract(sample_pdf(&["Minutes of the annual meeting"]))
            .await
            .unwrap();
        assert!(doc.content.contains("annual meeting"));
        assert_eq!(ocr.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ocr_failure_is_reported() {
        let processor =
            PdfProcessor::default().with_ocr(CannedOcr::new(Err("tesseract exited with 1")));

        let err = processor.extract(sample_pdf(&[""])).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Content(ref msg) if msg.contains("OCR failed") && msg.contains("tesseract exited")
        ));
    }

    #[tokio::test]
    async fn test_fallback_runs_when_pdf_extract_times_out() {
        // A zero budget hands the document to lopdf straight away
        let processor = PdfProcessor::new(Duration::ZERO);
        let doc = processor
            .extract(sample_pdf(&["Board approved the budget", "Next steps"]))
            .await
            .unwrap();
        assert_eq!(doc.pages, 2);
        assert!(doc.content.contains("budget"));
    }

    #[test]
    fn test_from_config_wires_ocr_toggle() {
        let mut config = ProcessingConfig::default();
        assert!(PdfProcessor::from_config(&config).ocr.is_some());
        assert_eq!(
            PdfProcessor::from_config(&config).pdf_extract_timeout,
            Duration::from_secs(60)
        );

        config.ocr.enabled = false;
        assert!(PdfProcessor::from_config(&config).ocr.is_none());
    }
}
