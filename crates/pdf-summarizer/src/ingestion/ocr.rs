//! OCR for PDFs without a text layer
//!
//! Pages are rendered to PNG with pdftoppm and read back with tesseract.
//! Both tools run as child processes inside a temporary directory.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::OcrConfig;
use crate::error::{Error, Result};

/// Recognizes text in a rendered PDF
///
/// Called from the blocking pool, so implementations may block.
pub trait PageOcr: Send + Sync {
    /// Text of every page, separated by `--- Page N ---` markers
    fn recognize_pdf(&self, data: &[u8]) -> Result<String>;

    /// Get OCR engine name for logging
    fn name(&self) -> &str;
}

/// pdftoppm + tesseract
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Check that both executables can be started
    pub fn is_available(&self) -> bool {
        // pdftoppm -v prints to stderr and may exit non-zero; starting is enough
        let has_pdftoppm = Command::new(&self.config.pdftoppm_bin)
            .arg("-v")
            .output()
            .is_ok();
        let has_tesseract = Command::new(&self.config.tesseract_bin)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        has_pdftoppm && has_tesseract
    }

    fn render_pages(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>> {
        let output = Command::new(&self.config.pdftoppm_bin)
            .arg("-png")
            .arg("-r")
            .arg(self.config.dpi.to_string())
            .arg(pdf_path)
            .arg(out_dir.join("page"))
            .output()?;

        if !output.status.success() {
            return Err(Error::content(format!(
                "pdftoppm error: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // pdftoppm zero-pads page numbers, so name order is page order
        let mut images: Vec<PathBuf> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
            .collect();
        images.sort();

        if images.is_empty() {
            return Err(Error::content("pdftoppm produced no images"));
        }
        Ok(images)
    }

    fn read_page(&self, image: &Path) -> Result<Option<String>> {
        let output = Command::new(&self.config.tesseract_bin)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.language)
            .output()?;

        if !output.status.success() {
            tracing::warn!(
                "tesseract failed on {}: {}",
                image.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Ok(None);
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        Ok((!text.trim().is_empty()).then_some(text))
    }
}

impl PageOcr for TesseractOcr {
    fn recognize_pdf(&self, data: &[u8]) -> Result<String> {
        if !self.is_available() {
            return Err(Error::content(format!(
                "OCR requires {} and {} (apt install poppler-utils tesseract-ocr)",
                self.config.pdftoppm_bin, self.config.tesseract_bin
            )));
        }

        // Removed on drop
        let workdir = tempfile::Builder::new()
            .prefix("pdf-summarizer-ocr-")
            .tempdir()?;
        let pdf_path = workdir.path().join("input.pdf");
        std::fs::write(&pdf_path, data)?;

        let images = self.render_pages(&pdf_path, workdir.path())?;

        let mut all_text = String::new();
        for (index, image) in images.iter().enumerate() {
            if let Some(text) = self.read_page(image)? {
                all_text.push_str(&format!("\n--- Page {} ---\n", index + 1));
                all_text.push_str(&text);
            }
        }

        if all_text.trim().is_empty() {
            return Err(Error::content("OCR produced no text"));
        }

        tracing::info!(
            "OCR extracted {} characters from {} page(s)",
            all_text.len(),
            images.len()
        );
        Ok(all_text)
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}
