use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{Artifact, CaptureSource, DocumentType};
use crate::pipeline::extraction::{ExtractionMethod, ExtractionResult};

/// Sidecar timestamp layout
pub const CAPTURED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Metadata written next to the extracted text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMetadata {
    pub file_name: String,
    pub size_mb: f64,
    pub content_type: String,
    pub document_type: Option<DocumentType>,
    pub source: CaptureSource,
    pub captured_at: NaiveDateTime,
    pub extraction_method: ExtractionMethod,
    pub extraction_failed: bool,
}

impl DocumentMetadata {
    pub fn new(
        artifact: &Artifact,
        extraction: &ExtractionResult,
        document_type: Option<DocumentType>,
        captured_at: NaiveDateTime,
    ) -> Self {
        Self {
            file_name: artifact.name().to_string(),
            size_mb: artifact.size_mb(),
            content_type: artifact.content_type().to_string(),
            document_type,
            source: artifact.source(),
            captured_at,
            extraction_method: extraction.method,
            extraction_failed: extraction.is_failure(),
        }
    }

    /// Render as `Key: value` lines.
    pub fn to_sidecar(&self) -> String {
        let document_type = self
            .document_type
            .map(|t| t.label())
            .unwrap_or("Not specified");
        let status = if self.extraction_failed { "failed" } else { "ok" };

        format!(
            "File Name: {}\n\
             File Size: {:.2} MB\n\
             File Type: {}\n\
             Document Type: {}\n\
             Source: {}\n\
             Captured At: {}\n\
             Extraction Method: {}\n\
             Extraction Status: {}\n",
            self.file_name,
            self.size_mb,
            self.content_type,
            document_type,
            self.source.as_str(),
            self.captured_at.format(CAPTURED_AT_FORMAT),
            self.extraction_method.as_str(),
            status,
        )
    }
}

/// One persisted triad. All three paths share `key`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub key: String,
    pub artifact_path: PathBuf,
    pub text_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: DocumentMetadata,
}
