use std::sync::Arc;

use thiserror::Error;

use super::types::{ExtractionMethod, ExtractionResult, OcrEngine, TextExtractor};
use super::ExtractionError;
use crate::models::Artifact;

/// Text recorded when OCR produced nothing usable
pub const OCR_FAILURE_MARKER: &str = "OCR failed to extract text.";

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("OCR client initialization failed: {0}")]
    ClientInit(String),

    #[error("Cannot reach OCR endpoint at {0}")]
    Connection(String),

    #[error("OCR request timed out after {0}s")]
    Timeout(u64),

    #[error("OCR transport error: {0}")]
    Transport(String),

    #[error("OCR endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("OCR endpoint reported a processing error: {}", .0.join("; "))]
    Processing(Vec<String>),

    #[error("Unexpected OCR response: {0}")]
    MalformedResponse(String),
}

/// Marker text for an OCR failure. Embeds the endpoint's own messages when it sent any.
pub fn ocr_failure_marker(error: &OcrError) -> String {
    match error {
        OcrError::Processing(messages) if !messages.is_empty() => {
            format!(
                "{}: {}",
                OCR_FAILURE_MARKER.trim_end_matches('.'),
                messages.join("; ")
            )
        }
        _ => OCR_FAILURE_MARKER.to_string(),
    }
}

/// Image strategy: every image goes to the OCR engine.
pub struct ImageOcrExtractor {
    engine: Arc<dyn OcrEngine + Send + Sync>,
}

impl ImageOcrExtractor {
    pub fn new(engine: Arc<dyn OcrEngine + Send + Sync>) -> Self {
        Self { engine }
    }
}

impl TextExtractor for ImageOcrExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::RemoteOcr
    }

    fn extract(&self, artifact: &Artifact) -> ExtractionResult {
        let outcome = self
            .engine
            .recognize(artifact.bytes(), artifact.name())
            .map_err(ExtractionError::from);
        ExtractionResult::from_outcome(self.method(), outcome)
    }
}

/// Mock OCR engine for unit testing without the network.
pub struct MockOcrEngine {
    response: Result<String, String>,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            response: Ok(text.to_string()),
        }
    }

    /// Engine whose every call fails as if the endpoint reported `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
        }
    }
}

impl OcrEngine for MockOcrEngine {
    fn recognize(&self, _image_bytes: &[u8], _file_name: &str) -> Result<String, OcrError> {
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(OcrError::Processing(vec![message.clone()])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_embeds_endpoint_messages() {
        let err = OcrError::Processing(vec![
            "E301: Unable to recognize the file type".into(),
            "Timed out waiting for results".into(),
        ]);
        assert_eq!(
            ocr_failure_marker(&err),
            "OCR failed to extract text: E301: Unable to recognize the file type; Timed out waiting for results"
        );
    }

    #[test]
    fn marker_is_fixed_without_messages() {
        assert_eq!(ocr_failure_marker(&OcrError::Processing(vec![])), OCR_FAILURE_MARKER);
        assert_eq!(ocr_failure_marker(&OcrError::Timeout(5)), OCR_FAILURE_MARKER);
        assert_eq!(
            ocr_failure_marker(&OcrError::HttpStatus {
                status: 503,
                body: "busy".into()
            }),
            OCR_FAILURE_MARKER
        );
    }

    #[test]
    fn image_extractor_returns_ocr_text() {
        let extractor = ImageOcrExtractor::new(Arc::new(MockOcrEngine::new("INVOICE #123")));
        let artifact = Artifact::upload("photo.png", None, vec![0x89, 0x50, 0x4E, 0x47]);
        let result = extractor.extract(&artifact);

        assert_eq!(result.method, ExtractionMethod::RemoteOcr);
        assert_eq!(result.text, "INVOICE #123");
        assert!(!result.is_failure());
    }

    #[test]
    fn image_extractor_absorbs_ocr_failure() {
        let extractor = ImageOcrExtractor::new(Arc::new(MockOcrEngine::failing("quota exceeded")));
        let artifact = Artifact::upload("photo.jpg", None, vec![0xFF, 0xD8, 0xFF]);
        let result = extractor.extract(&artifact);

        assert!(result.is_failure());
        assert_eq!(result.text, "OCR failed to extract text: quota exceeded");
    }
}
