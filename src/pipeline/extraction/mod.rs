pub mod types;
pub mod ocr;
pub mod remote_ocr;
pub mod text_only;
pub mod docx;
pub mod pdf;
pub mod orchestrator;

pub use types::*;
pub use ocr::*;
pub use remote_ocr::*;
pub use orchestrator::*;

use thiserror::Error;

/// Marker recorded when a text-like file cannot be read
pub const TEXT_FAILURE_MARKER: &str = "Text extraction failed.";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Text encoding error: {0}")]
    Decode(String),

    #[error("CSV parsing failed: {0}")]
    Csv(String),

    #[error("DOCX parsing failed: {0}")]
    Docx(String),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),
}

impl ExtractionError {
    /// Human-readable text stored in place of the extracted text.
    pub fn failure_marker(&self) -> String {
        match self {
            Self::Ocr(e) => ocr_failure_marker(e),
            other => format!("{TEXT_FAILURE_MARKER} {other}"),
        }
    }
}
