//! Filesystem ledger for (artifact, text, metadata) triads.
//!
//! Layout under the data root:
//! - `uploaded_files/{key}.{ext}`: original bytes
//! - `extracted_text/{key}.txt`: extracted text
//! - `extracted_text/{key}_meta.txt`: metadata sidecar
//!
//! Each file is staged as a temporary file in its destination directory and
//! moved into place without clobbering. When any of the three paths is
//! taken, the files already placed for that key are removed and the next
//! key (`_2`, `_3`, ...) is tried. Any other failure also removes them, so
//! no partial triad is left behind.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tempfile::NamedTempFile;

use super::types::{DocumentMetadata, DocumentRecord};
use super::StorageError;
use crate::config::StorageConfig;
use crate::models::{Artifact, CaptureSource, DocumentType, CAMERA_CAPTURE_STEM};
use crate::pipeline::extraction::ExtractionResult;
use crate::pipeline::import::base_name;

/// Timestamp prefix of every storage key
pub const KEY_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Extension for originals whose name has none
const FALLBACK_EXTENSION: &str = "bin";

const MAX_KEY_ATTEMPTS: u32 = 1000;

pub struct PersistenceLedger {
    artifacts_dir: PathBuf,
    texts_dir: PathBuf,
}

impl PersistenceLedger {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            artifacts_dir: config.artifacts_dir(),
            texts_dir: config.texts_dir(),
        }
    }

    /// Persist a triad stamped with the current local time.
    pub fn persist(
        &self,
        artifact: &Artifact,
        extraction: &ExtractionResult,
        document_type: Option<DocumentType>,
    ) -> Result<DocumentRecord, StorageError> {
        self.persist_at(artifact, extraction, document_type, Local::now().naive_local())
    }

    /// Persist a triad stamped with `captured_at`.
    pub fn persist_at(
        &self,
        artifact: &Artifact,
        extraction: &ExtractionResult,
        document_type: Option<DocumentType>,
        captured_at: NaiveDateTime,
    ) -> Result<DocumentRecord, StorageError> {
        let _span = tracing::info_span!("persist", file = %artifact.name()).entered();

        self.ensure_dirs()?;

        let metadata = DocumentMetadata::new(artifact, extraction, document_type, captured_at);
        let base_key = storage_key(artifact, captured_at);
        let extension = artifact
            .extension()
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        let sidecar = metadata.to_sidecar();

        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let key = if attempt == 1 {
                base_key.clone()
            } else {
                format!("{base_key}_{attempt}")
            };
            let paths = TriadPaths {
                text: self.texts_dir.join(format!("{key}.txt")),
                artifact: self.artifacts_dir.join(format!("{key}.{extension}")),
                metadata: self.texts_dir.join(format!("{key}_meta.txt")),
            };

            let placement = self.write_triad(
                &paths,
                extraction.text.as_bytes(),
                artifact.bytes(),
                sidecar.as_bytes(),
            )?;
            match placement {
                Placement::Taken => {
                    tracing::debug!(key = %key, "Storage key taken, trying next suffix");
                }
                Placement::Done => {
                    tracing::info!(
                        key = %key,
                        artifact = %paths.artifact.display(),
                        text = %paths.text.display(),
                        "Document persisted"
                    );
                    return Ok(DocumentRecord {
                        key,
                        artifact_path: paths.artifact,
                        text_path: paths.text,
                        metadata_path: paths.metadata,
                        metadata,
                    });
                }
            }
        }

        Err(StorageError::KeyExhausted(base_key))
    }

    fn ensure_dirs(&self) -> Result<(), StorageError> {
        for dir in [&self.artifacts_dir, &self.texts_dir] {
            std::fs::create_dir_all(dir).map_err(|source| StorageError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Stage all three files, then move them into place text first.
    /// Any file that would clobber an existing one undoes the placements
    /// made so far and reports the key as taken.
    fn write_triad(
        &self,
        paths: &TriadPaths,
        text: &[u8],
        original: &[u8],
        sidecar: &[u8],
    ) -> Result<Placement, StorageError> {
        let staged = [
            (stage(&self.texts_dir, text)?, &paths.text),
            (stage(&self.artifacts_dir, original)?, &paths.artifact),
            (stage(&self.texts_dir, sidecar)?, &paths.metadata),
        ];

        let mut placed: Vec<&Path> = Vec::with_capacity(staged.len());
        for (tmp, path) in staged {
            if let Err(e) = tmp.persist_noclobber(path) {
                rollback(&placed);
                if e.error.kind() == ErrorKind::AlreadyExists {
                    return Ok(Placement::Taken);
                }
                return Err(StorageError::Write {
                    path: path.clone(),
                    source: e.error,
                });
            }
            placed.push(path);
        }
        Ok(Placement::Done)
    }
}

struct TriadPaths {
    text: PathBuf,
    artifact: PathBuf,
    metadata: PathBuf,
}

enum Placement {
    Done,
    Taken,
}

/// `{timestamp}_{base name}` for uploads, `{timestamp}_camera` for captures.
pub fn storage_key(artifact: &Artifact, captured_at: NaiveDateTime) -> String {
    let stem = match artifact.source() {
        CaptureSource::Camera => CAMERA_CAPTURE_STEM.to_string(),
        CaptureSource::Upload => base_name(artifact.name()),
    };
    format!("{}_{stem}", captured_at.format(KEY_TIMESTAMP_FORMAT))
}

fn stage(dir: &Path, bytes: &[u8]) -> Result<NamedTempFile, StorageError> {
    let write_err = |source| StorageError::Write {
        path: dir.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    Ok(tmp)
}

fn rollback(placed: &[&Path]) {
    if placed.is_empty() {
        return;
    }
    for path in placed {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::error!(path = %path.display(), error = %e, "Rollback could not remove file");
        }
    }
    tracing::warn!(files = placed.len(), "Partial persist rolled back");
}
