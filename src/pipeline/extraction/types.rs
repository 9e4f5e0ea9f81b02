use serde::{Deserialize, Serialize};

use super::ocr::OcrError;
use super::ExtractionError;
use crate::models::Artifact;

/// Result of text extraction from a single artifact.
///
/// `text` is always populated: when extraction fails it holds a failure
/// marker and `failure` carries the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub method: ExtractionMethod,
    pub text: String,
    pub failure: Option<String>,
}

impl ExtractionResult {
    pub fn success(method: ExtractionMethod, text: String) -> Self {
        Self {
            method,
            text,
            failure: None,
        }
    }

    /// Absorb an extraction error into a marker text.
    pub fn failed(method: ExtractionMethod, error: &ExtractionError) -> Self {
        Self {
            method,
            text: error.failure_marker(),
            failure: Some(error.to_string()),
        }
    }

    /// Build from a strategy outcome, absorbing any error.
    pub fn from_outcome(method: ExtractionMethod, outcome: Result<String, ExtractionError>) -> Self {
        match outcome {
            Ok(text) => Self::success(method, text),
            Err(e) => {
                tracing::warn!(method = method.as_str(), error = %e, "Extraction failed, recording marker");
                Self::failed(method, &e)
            }
        }
    }

    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

/// How text was extracted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    PlainTextRead,
    CsvTable,
    DocxParagraphs,
    PdfDirect,
    PdfOcrFallback,
    RemoteOcr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainTextRead => "plain_text_read",
            Self::CsvTable => "csv_table",
            Self::DocxParagraphs => "docx_paragraphs",
            Self::PdfDirect => "pdf_direct",
            Self::PdfOcrFallback => "pdf_ocr_fallback",
            Self::RemoteOcr => "remote_ocr",
        }
    }
}

/// One extraction strategy. Implementations never fail: errors are
/// absorbed into the returned result.
pub trait TextExtractor {
    /// Method this strategy reports when it succeeds on its primary path
    fn method(&self) -> ExtractionMethod;

    fn extract(&self, artifact: &Artifact) -> ExtractionResult;
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine {
    /// Recognize the text in an image (or scanned PDF) payload.
    fn recognize(&self, image_bytes: &[u8], file_name: &str) -> Result<String, OcrError>;
}

/// PDF text layer abstraction
pub trait PdfExtractor {
    /// Embedded text of each page, in page order
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}
