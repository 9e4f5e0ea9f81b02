use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use super::types::{ExtractionMethod, ExtractionResult, OcrEngine, PdfExtractor, TextExtractor};
use super::ExtractionError;
use crate::models::Artifact;

/// PDF text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        // pdf-extract panics on some malformed inputs instead of erroring
        let parsed = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }))
        .map_err(|_| ExtractionError::PdfParsing("parser aborted on malformed input".into()))?;

        parsed.map_err(|e| ExtractionError::PdfParsing(e.to_string()))
    }
}

/// PDF strategy: embedded text first, OCR when there is none.
///
/// The OCR fallback sends the whole PDF to the engine, which accepts
/// PDF payloads directly.
pub struct PdfDocumentExtractor {
    pdf: Box<dyn PdfExtractor + Send + Sync>,
    ocr: Arc<dyn OcrEngine + Send + Sync>,
}

impl PdfDocumentExtractor {
    pub fn new(
        pdf: Box<dyn PdfExtractor + Send + Sync>,
        ocr: Arc<dyn OcrEngine + Send + Sync>,
    ) -> Self {
        Self { pdf, ocr }
    }

    fn ocr_fallback(&self, artifact: &Artifact) -> ExtractionResult {
        let outcome = self
            .ocr
            .recognize(artifact.bytes(), artifact.name())
            .map_err(ExtractionError::from);
        ExtractionResult::from_outcome(ExtractionMethod::PdfOcrFallback, outcome)
    }
}

impl TextExtractor for PdfDocumentExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PdfDirect
    }

    fn extract(&self, artifact: &Artifact) -> ExtractionResult {
        match self.pdf.extract_pages(artifact.bytes()) {
            Ok(pages) => {
                let text = pages.join("\n");
                if text.trim().is_empty() {
                    tracing::info!(
                        file = %artifact.name(),
                        pages = pages.len(),
                        "No embedded text layer, falling back to OCR"
                    );
                    return self.ocr_fallback(artifact);
                }
                tracing::debug!(pages = pages.len(), chars = text.len(), "PDF text layer read");
                ExtractionResult::success(self.method(), text)
            }
            Err(e) => {
                tracing::warn!(file = %artifact.name(), error = %e, "PDF parsing failed, falling back to OCR");
                self.ocr_fallback(artifact)
            }
        }
    }
}

/// Mock PDF text layer for unit testing.
pub struct MockPdfExtractor {
    pages: Result<Vec<String>, String>,
}

impl MockPdfExtractor {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: Ok(pages.iter().map(|p| p.to_string()).collect()),
        }
    }

    /// Scanned document: pages exist but carry no text.
    pub fn empty(page_count: usize) -> Self {
        Self {
            pages: Ok(vec![String::new(); page_count]),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            pages: Err(reason.to_string()),
        }
    }
}

impl PdfExtractor for MockPdfExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        self.pages.clone().map_err(ExtractionError::PdfParsing)
    }
}
