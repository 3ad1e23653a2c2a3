//! Document ingestion: PDF parsing, OCR and text clean-up

mod ocr;
mod parser;

pub use ocr::{PageOcr, TesseractOcr};
pub use parser::{cleanup_pdf_text, PdfProcessor};
