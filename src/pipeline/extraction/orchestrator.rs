use std::collections::HashMap;
use std::sync::Arc;

use super::docx::DocxExtractor;
use super::ocr::ImageOcrExtractor;
use super::pdf::{PdfDocumentExtractor, PdfTextExtractor};
use super::text_only::{PlainTextExtractor, TabularExtractor};
use super::types::{ExtractionResult, OcrEngine, TextExtractor};
use crate::models::Artifact;
use crate::pipeline::import::FormatTag;

/// Dispatch table from format to extraction strategy.
/// Strategies are trait objects so any of them can be swapped out in tests.
pub struct DocumentExtractor {
    strategies: HashMap<FormatTag, Box<dyn TextExtractor + Send + Sync>>,
}

impl DocumentExtractor {
    /// Default strategies for every supported format, sharing one OCR engine.
    pub fn new(ocr: Arc<dyn OcrEngine + Send + Sync>) -> Self {
        let mut strategies: HashMap<FormatTag, Box<dyn TextExtractor + Send + Sync>> =
            HashMap::new();
        strategies.insert(FormatTag::PlainText, Box::new(PlainTextExtractor));
        strategies.insert(FormatTag::Tabular, Box::new(TabularExtractor));
        strategies.insert(FormatTag::StructuredDocument, Box::new(DocxExtractor));
        strategies.insert(
            FormatTag::Pdf,
            Box::new(PdfDocumentExtractor::new(Box::new(PdfTextExtractor), ocr.clone())),
        );
        strategies.insert(FormatTag::Image, Box::new(ImageOcrExtractor::new(ocr)));
        Self { strategies }
    }

    /// Replace the strategy registered for `tag`.
    pub fn with_strategy(mut self, tag: FormatTag, strategy: Box<dyn TextExtractor + Send + Sync>) -> Self {
        self.strategies.insert(tag, strategy);
        self
    }

    pub fn supports(&self, tag: FormatTag) -> bool {
        self.strategies.contains_key(&tag)
    }

    /// Run the strategy for `tag`. `None` when no strategy handles it.
    pub fn extract(&self, artifact: &Artifact, tag: FormatTag) -> Option<ExtractionResult> {
        let strategy = self.strategies.get(&tag)?;

        tracing::info!(
            file = %artifact.name(),
            format = tag.as_str(),
            method = strategy.method().as_str(),
            "Starting text extraction"
        );

        let result = strategy.extract(artifact);

        tracing::info!(
            method = result.method.as_str(),
            chars = result.text.len(),
            failed = result.is_failure(),
            "Extraction complete"
        );
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::pdf::MockPdfExtractor;
    use crate::pipeline::extraction::{ExtractionMethod, MockOcrEngine};

    fn extractor(ocr_text: &str) -> DocumentExtractor {
        DocumentExtractor::new(Arc::new(MockOcrEngine::new(ocr_text)))
    }

    #[test]
    fn every_supported_tag_has_a_strategy() {
        let ex = extractor("");
        for tag in [
            FormatTag::PlainText,
            FormatTag::Tabular,
            FormatTag::StructuredDocument,
            FormatTag::Pdf,
            FormatTag::Image,
        ] {
            assert!(ex.supports(tag), "{tag:?} should be handled");
        }
        assert!(!ex.supports(FormatTag::Unsupported));
    }

    #[test]
    fn unsupported_yields_none() {
        let artifact = Artifact::upload("archive.rar", None, vec![1, 2, 3]);
        assert!(extractor("").extract(&artifact, FormatTag::Unsupported).is_none());
    }

    #[test]
    fn plain_text_dispatch() {
        let artifact = Artifact::upload("notes.txt", None, b"Hello\nWorld".to_vec());
        let result = extractor("").extract(&artifact, FormatTag::PlainText).unwrap();
        assert_eq!(result.method, ExtractionMethod::PlainTextRead);
        assert_eq!(result.text, "Hello\nWorld");
    }

    #[test]
    fn image_dispatch_goes_to_ocr() {
        let artifact = Artifact::upload("scan.png", None, vec![0x89, b'P', b'N', b'G']);
        let result = extractor("INVOICE 42").extract(&artifact, FormatTag::Image).unwrap();
        assert_eq!(result.method, ExtractionMethod::RemoteOcr);
        assert_eq!(result.text, "INVOICE 42");
    }

    #[test]
    fn pdf_strategy_can_be_replaced() {
        let ocr: Arc<dyn OcrEngine + Send + Sync> = Arc::new(MockOcrEngine::new("unused"));
        let ex = DocumentExtractor::new(ocr.clone()).with_strategy(
            FormatTag::Pdf,
            Box::new(PdfDocumentExtractor::new(
                Box::new(MockPdfExtractor::with_pages(&["Consignee: Jansen BV"])),
                ocr,
            )),
        );
        let artifact = Artifact::upload("bl.pdf", None, b"%PDF-1.4".to_vec());
        let result = ex.extract(&artifact, FormatTag::Pdf).unwrap();
        assert_eq!(result.method, ExtractionMethod::PdfDirect);
        assert_eq!(result.text, "Consignee: Jansen BV");
    }
}
