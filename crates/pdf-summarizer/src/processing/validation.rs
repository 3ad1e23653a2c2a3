//! Upload checks run before a task exists

use bytes::Bytes;

use crate::config::UploadConfig;
use crate::error::{Error, Result};

/// Content types accepted for PDF uploads
const ACCEPTED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/x-pdf",
    "application/octet-stream",
];

/// PDF signature; readers accept it anywhere in the first 1024 bytes
const PDF_MAGIC: &[u8] = b"%PDF-";
const MAGIC_SEARCH_WINDOW: usize = 1024;

/// A submitted file
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Check name, type, size and signature of an upload
pub fn validate_upload(upload: &Upload, limits: &UploadConfig) -> Result<()> {
    let filename = upload.filename.trim();
    if filename.is_empty() {
        return Err(Error::validation("No filename provided"));
    }

    if !limits.is_file_allowed(filename) {
        return Err(Error::UnsupportedFileType(format!(
            "{}. Allowed: {}",
            extension_of(filename),
            limits.allowed_extensions.join(", ")
        )));
    }

    if let Some(content_type) = &upload.content_type {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if !ACCEPTED_CONTENT_TYPES.contains(&essence.as_str()) {
            return Err(Error::validation(format!(
                "Invalid content type: {}. Expected application/pdf",
                content_type
            )));
        }
    }

    if upload.data.is_empty() {
        return Err(Error::validation("Uploaded file is empty"));
    }

    if upload.size() > limits.max_file_size {
        return Err(Error::FileTooLarge {
            size: Some(upload.size()),
            max: limits.max_file_size,
        });
    }

    if !has_pdf_signature(&upload.data) {
        return Err(Error::validation("File does not appear to be a valid PDF"));
    }

    Ok(())
}

/// Reject documents over the page ceiling
pub fn check_page_count(pages: u32, limits: &UploadConfig) -> Result<()> {
    if pages > limits.max_pages {
        return Err(Error::TooManyPages {
            pages,
            max: limits.max_pages,
        });
    }
    Ok(())
}

fn has_pdf_signature(data: &[u8]) -> bool {
    let window = &data[..data.len().min(MAGIC_SEARCH_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|candidate| candidate == PDF_MAGIC)
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!(".{}", ext.to_lowercase()),
        _ => "(no extension)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_upload(filename: &str) -> Upload {
        Upload::new(filename, &b"%PDF-1.7\n%test\n"[..])
    }

    #[test]
    fn test_valid_upload() {
        let upload = pdf_upload("Report.PDF").with_content_type("application/pdf");
        assert!(validate_upload(&upload, &UploadConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_other_extensions() {
        let err = validate_upload(&pdf_upload("notes.txt"), &UploadConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(ref msg) if msg.starts_with(".txt")));

        let err = validate_upload(&pdf_upload("README"), &UploadConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_rejects_wrong_content_type() {
        let upload = pdf_upload("a.pdf").with_content_type("text/html; charset=utf-8");
        assert!(matches!(
            validate_upload(&upload, &UploadConfig::default()),
            Err(Error::Validation(_))
        ));

        let upload = pdf_upload("a.pdf").with_content_type("application/pdf; qs=0.9");
        assert!(validate_upload(&upload, &UploadConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        let empty = Upload::new("a.pdf", Bytes::new());
        assert!(validate_upload(&empty, &UploadConfig::default()).unwrap_err().is_validation());

        let limits = UploadConfig {
            max_file_size: 8,
            ..Default::default()
        };
        let err = validate_upload(&pdf_upload("a.pdf"), &limits).unwrap_err();
        assert!(matches!(err, Error::FileTooLarge { max: 8, .. }));
    }

    #[test]
    fn test_signature_check() {
        let fake = Upload::new("a.pdf", &b"PK\x03\x04 not a pdf"[..]);
        assert!(validate_upload(&fake, &UploadConfig::default()).is_err());

        let mut prefixed = vec![b' '; 100];
        prefixed.extend_from_slice(b"%PDF-1.4");
        assert!(validate_upload(&Upload::new("a.pdf", prefixed), &UploadConfig::default()).is_ok());
    }

    #[test]
    fn test_page_ceiling() {
        let limits = UploadConfig::default();
        assert!(check_page_count(100, &limits).is_ok());
        assert!(matches!(
            check_page_count(101, &limits),
            Err(Error::TooManyPages { pages: 101, max: 100 })
        ));
    }
}
