//! Document pipeline: classify → extract → persist.
//!
//! Stateless service object. Callers hand it an `Artifact` and render the
//! returned `PipelineOutcome`; no presentation concerns live here.

use std::sync::Arc;

use serde::Serialize;

use crate::config::AppConfig;
use crate::models::{Artifact, DocumentType};
use crate::pipeline::extraction::{
    DocumentExtractor, ExtractionResult, OcrEngine, OcrError, RemoteOcrClient,
};
use crate::pipeline::import::{classify, FormatTag, SUPPORTED_EXTENSIONS};
use crate::pipeline::storage::{DocumentRecord, PersistenceLedger, StorageError};

const DOWNLOAD_CONTENT_TYPE: &str = "text/plain";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Fatal pipeline errors. Rejections and extraction failures are outcomes, not errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),

    #[error("OCR client initialization failed: {0}")]
    OcrClient(#[from] OcrError),
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Where an artifact is in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Received,
    Classified,
    Extracted,
    Persisted,
    Rejected,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Classified => "classified",
            Self::Extracted => "extracted",
            Self::Persisted => "persisted",
            Self::Rejected => "rejected",
        }
    }
}

/// Extracted text offered back to the caller as a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextDownload {
    pub file_name: String,
    pub content_type: &'static str,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Persisted {
        extraction: ExtractionResult,
        record: DocumentRecord,
        download: TextDownload,
    },
    Rejected {
        file_name: String,
        reason: String,
    },
}

impl PipelineOutcome {
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Persisted { .. } => PipelineStage::Persisted,
            Self::Rejected { .. } => PipelineStage::Rejected,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct DocumentPipeline {
    extractor: DocumentExtractor,
    ledger: PersistenceLedger,
    max_upload_bytes: u64,
}

impl DocumentPipeline {
    pub fn new(extractor: DocumentExtractor, ledger: PersistenceLedger, max_upload_bytes: u64) -> Self {
        Self {
            extractor,
            ledger,
            max_upload_bytes,
        }
    }

    /// Production pipeline: remote OCR client and on-disk ledger from `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, PipelineError> {
        let ocr: Arc<dyn OcrEngine + Send + Sync> = Arc::new(RemoteOcrClient::new(&config.ocr)?);
        tracing::info!(
            endpoint = %config.ocr.endpoint,
            data_dir = %config.storage.data_dir.display(),
            "Document pipeline ready"
        );
        Ok(Self::new(
            DocumentExtractor::new(ocr),
            PersistenceLedger::new(&config.storage),
            config.max_upload_bytes,
        ))
    }

    /// Reject on size alone, before the bytes are loaded.
    /// `None` when an artifact of `size_bytes` would be admitted.
    pub fn check_size(&self, file_name: &str, size_bytes: u64) -> Option<PipelineOutcome> {
        let reason = self.oversize_reason(file_name, size_bytes)?;
        Some(reject(file_name, reason))
    }

    /// Run one artifact through the pipeline.
    ///
    /// Rejected artifacts are neither extracted nor persisted. Extraction
    /// failures still persist, with the failure marker as text. Only storage
    /// failures are returned as errors.
    pub fn process(
        &self,
        artifact: Artifact,
        document_type: Option<DocumentType>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let _span = tracing::info_span!(
            "pipeline",
            file = %artifact.name(),
            source = artifact.source().as_str()
        )
        .entered();
        log_stage(PipelineStage::Received, &artifact);

        if let Some(rejected) = self.check_size(artifact.name(), artifact.size_bytes()) {
            return Ok(rejected);
        }

        let tag = classify(artifact.name());
        tracing::debug!(format = tag.as_str(), "Classified");
        log_stage(PipelineStage::Classified, &artifact);

        let Some(extraction) = self.extractor.extract(&artifact, tag) else {
            return Ok(reject(artifact.name(), unsupported_reason(&artifact, tag)));
        };
        log_stage(PipelineStage::Extracted, &artifact);

        let record = self.ledger.persist(&artifact, &extraction, document_type)?;
        log_stage(PipelineStage::Persisted, &artifact);

        let download = TextDownload {
            file_name: record
                .text_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| format!("{}.txt", record.key)),
            content_type: DOWNLOAD_CONTENT_TYPE,
            bytes: extraction.text.as_bytes().to_vec(),
        };

        Ok(PipelineOutcome::Persisted {
            extraction,
            record,
            download,
        })
    }

    fn oversize_reason(&self, file_name: &str, size_bytes: u64) -> Option<String> {
        if size_bytes <= self.max_upload_bytes {
            return None;
        }
        Some(format!(
            "{file_name} is {:.2} MB, above the {:.0} MB upload limit",
            size_bytes as f64 / BYTES_PER_MB,
            self.max_upload_bytes as f64 / BYTES_PER_MB
        ))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn log_stage(stage: PipelineStage, artifact: &Artifact) {
    tracing::debug!(stage = stage.as_str(), bytes = artifact.size_bytes(), "Pipeline stage");
}

fn reject(file_name: &str, reason: String) -> PipelineOutcome {
    tracing::warn!(stage = PipelineStage::Rejected.as_str(), reason = %reason, "Artifact rejected");
    PipelineOutcome::Rejected {
        file_name: file_name.to_string(),
        reason,
    }
}

fn unsupported_reason(artifact: &Artifact, tag: FormatTag) -> String {
    let detail = match artifact.extension() {
        Some(ext) if tag == FormatTag::Unsupported => format!("'.{ext}' files are not supported"),
        Some(_) => "no extractor is registered for this format".to_string(),
        None => "the file name has no extension".to_string(),
    };
    format!(
        "Unsupported file type for text extraction: {detail}. Supported: {}",
        SUPPORTED_EXTENSIONS.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OcrConfig, StorageConfig};
    use crate::models::CaptureSource;
    use crate::pipeline::extraction::{ExtractionMethod, MockOcrEngine, OCR_FAILURE_MARKER};
    use std::path::Path;

    fn build_test_pipeline(root: &Path, ocr: impl OcrEngine + Send + Sync + 'static) -> DocumentPipeline {
        DocumentPipeline::new(
            DocumentExtractor::new(Arc::new(ocr)),
            PersistenceLedger::new(&StorageConfig::new(root)),
            AppConfig::default().max_upload_bytes,
        )
    }

    fn count_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
    }

    fn expect_persisted(outcome: PipelineOutcome) -> (ExtractionResult, DocumentRecord, TextDownload) {
        match outcome {
            PipelineOutcome::Persisted {
                extraction,
                record,
                download,
            } => (extraction, record, download),
            other => panic!("expected Persisted, got {other:?}"),
        }
    }

    #[test]
    fn text_upload_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), MockOcrEngine::new("unused"));
        let artifact = Artifact::upload("invoice.txt", Some("text/plain"), b"Hello\nWorld".to_vec());

        let outcome = pipeline
            .process(artifact, Some(DocumentType::CommercialInvoice))
            .unwrap();
        assert_eq!(outcome.stage(), PipelineStage::Persisted);
        let (extraction, record, download) = expect_persisted(outcome);

        assert_eq!(extraction.text, "Hello\nWorld");
        assert_eq!(extraction.method, ExtractionMethod::PlainTextRead);
        assert_eq!(record.metadata.content_type, "text/plain");
        assert_eq!(record.metadata.document_type, Some(DocumentType::CommercialInvoice));
        assert_eq!(std::fs::read(&record.text_path).unwrap(), b"Hello\nWorld");
        assert_eq!(std::fs::read(&record.artifact_path).unwrap(), b"Hello\nWorld");

        let sidecar = std::fs::read_to_string(&record.metadata_path).unwrap();
        assert!(sidecar.contains("File Type: text/plain"));
        assert!(sidecar.contains("Document Type: Commercial Invoice"));

        assert_eq!(download.content_type, "text/plain");
        assert_eq!(download.bytes, b"Hello\nWorld");
        assert_eq!(download.file_name, format!("{}.txt", record.key));
    }

    #[test]
    fn image_upload_goes_through_ocr() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), MockOcrEngine::new("INVOICE #123"));
        let artifact = Artifact::upload("photo.png", None, vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A]);

        let (extraction, record, _) = expect_persisted(pipeline.process(artifact, None).unwrap());

        assert_eq!(extraction.text, "INVOICE #123");
        assert_eq!(extraction.method, ExtractionMethod::RemoteOcr);
        assert!(record.artifact_path.exists());
        assert_eq!(std::fs::read_to_string(&record.text_path).unwrap(), "INVOICE #123");
    }

    #[test]
    fn image_upload_against_mocked_ocr_endpoint() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/parse/image")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ParsedResults":[{"ParsedText":"INVOICE #123"}],"IsErroredOnProcessing":false}"#)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            ocr: OcrConfig {
                endpoint: format!("{}/parse/image", server.url()),
                ..OcrConfig::default()
            },
            ..AppConfig::default()
        }
        .with_data_dir(dir.path());
        let pipeline = DocumentPipeline::from_config(&config).unwrap();

        let artifact = Artifact::upload("photo.png", None, vec![0x89, b'P', b'N', b'G']);
        let (extraction, record, _) = expect_persisted(pipeline.process(artifact, None).unwrap());

        assert_eq!(extraction.text, "INVOICE #123");
        assert!(record.text_path.starts_with(dir.path()));
        mock.assert();
    }

    #[test]
    fn unsupported_upload_is_rejected_without_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), MockOcrEngine::new("unused"));
        let artifact = Artifact::upload("archive.zip", None, vec![b'P', b'K', 3, 4]);

        let outcome = pipeline.process(artifact, None).unwrap();

        match &outcome {
            PipelineOutcome::Rejected { file_name, reason } => {
                assert_eq!(file_name, "archive.zip");
                assert!(reason.contains(".zip"));
                assert!(reason.contains("Unsupported"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(count_files(&dir.path().join("uploaded_files")), 0);
        assert_eq!(count_files(&dir.path().join("extracted_text")), 0);
    }

    #[test]
    fn ocr_failure_still_persists_marker() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), FailingOcr);
        let artifact = Artifact::upload("scan.jpg", None, vec![0xFF, 0xD8, 0xFF, 0xE0]);

        let (extraction, record, download) = expect_persisted(pipeline.process(artifact, None).unwrap());

        assert_eq!(extraction.text, OCR_FAILURE_MARKER);
        assert!(extraction.is_failure());
        assert_eq!(std::fs::read_to_string(&record.text_path).unwrap(), OCR_FAILURE_MARKER);
        assert!(record.metadata.extraction_failed);
        assert_eq!(download.bytes, OCR_FAILURE_MARKER.as_bytes());
    }

    #[test]
    fn camera_capture_persisted_under_camera_key() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), MockOcrEngine::new("BILL OF LADING"));
        let frame = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

        let (_, record, _) = expect_persisted(pipeline.process(Artifact::camera_capture(frame), None).unwrap());

        assert!(record.key.ends_with("_camera"));
        assert!(record.artifact_path.to_string_lossy().ends_with("_camera.png"));
        assert_eq!(record.metadata.source, CaptureSource::Camera);
    }

    #[test]
    fn empty_text_upload_persists_full_triad() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), MockOcrEngine::new("unused"));

        let outcome = pipeline
            .process(Artifact::upload("notes.txt", Some("text/plain"), vec![]), None)
            .unwrap();
        let (extraction, record, download) = expect_persisted(outcome);

        assert_eq!(extraction.text, "");
        assert!(!extraction.is_failure());
        assert_eq!(std::fs::read(&record.artifact_path).unwrap(), b"");
        assert_eq!(std::fs::read(&record.text_path).unwrap(), b"");
        assert!(record.metadata_path.exists());
        assert!(download.bytes.is_empty());
        assert_eq!(count_files(&dir.path().join("uploaded_files")), 1);
        assert_eq!(count_files(&dir.path().join("extracted_text")), 2);
    }

    #[test]
    fn long_file_name_keeps_its_format() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), MockOcrEngine::new("unused"));
        let name = format!("{}.txt", "a".repeat(260));

        let outcome = pipeline
            .process(Artifact::upload(&name, None, b"hi".to_vec()), None)
            .unwrap();
        let (extraction, record, _) = expect_persisted(outcome);

        assert_eq!(extraction.method, ExtractionMethod::PlainTextRead);
        assert_eq!(extraction.text, "hi");
        assert!(record.artifact_path.to_string_lossy().ends_with(".txt"));
    }

    #[test]
    fn oversized_upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = DocumentPipeline::new(
            DocumentExtractor::new(Arc::new(MockOcrEngine::new("unused"))),
            PersistenceLedger::new(&StorageConfig::new(dir.path())),
            4,
        );

        let outcome = pipeline
            .process(Artifact::upload("notes.txt", None, b"12345".to_vec()), None)
            .unwrap();
        match outcome {
            PipelineOutcome::Rejected { reason, .. } => assert!(reason.contains("upload limit")),
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert!(pipeline.check_size("notes.txt", 4).is_none());
        assert_eq!(count_files(&dir.path().join("extracted_text")), 0);
    }

    #[test]
    fn storage_failure_is_a_pipeline_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("occupied");
        std::fs::write(&blocker, "not a directory").unwrap();
        let pipeline = build_test_pipeline(&blocker, MockOcrEngine::new("unused"));

        let err = pipeline
            .process(Artifact::upload("invoice.txt", None, b"x".to_vec()), None)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Persistence(_)));
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = build_test_pipeline(dir.path(), MockOcrEngine::new("unused"));

        let rejected = pipeline
            .process(Artifact::upload("archive.zip", None, vec![1]), None)
            .unwrap();
        let json = serde_json::to_value(&rejected).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["file_name"], "archive.zip");

        let persisted = pipeline
            .process(Artifact::upload("a.txt", None, b"abc".to_vec()), None)
            .unwrap();
        let json = serde_json::to_value(&persisted).unwrap();
        assert_eq!(json["status"], "persisted");
        assert_eq!(json["extraction"]["method"], "plain_text_read");
        assert_eq!(json["extraction"]["text"], "abc");
        assert_eq!(json["download"]["content_type"], "text/plain");
        assert!(json["download"].get("bytes").is_none());
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DocumentPipeline>();
    }

    /// Engine that fails like a transport error: fixed marker, no endpoint messages.
    struct FailingOcr;

    impl OcrEngine for FailingOcr {
        fn recognize(&self, _image_bytes: &[u8], _file_name: &str) -> Result<String, OcrError> {
            Err(OcrError::Timeout(30))
        }
    }
}
