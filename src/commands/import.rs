//! Upload and camera-capture commands.
//!
//! Thin layer: turns a file on disk (or stdin) into an `Artifact`, runs the
//! pipeline and hands back its outcome. No business rules live here.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ConfigError;
use crate::models::{Artifact, DocumentType};
use crate::pipeline::import::sanitize_filename;
use crate::pipeline::processor::{DocumentPipeline, PipelineError, PipelineOutcome};

/// Read camera frames from stdin when given as the source
pub const STDIN_SOURCE: &str = "-";

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot read camera frame from stdin: {0}")]
    Stdin(std::io::Error),

    #[error("Cannot write extracted text to {path}: {source}")]
    Download {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Cannot render outcome: {0}")]
    Render(#[from] serde_json::Error),

    #[error("Cannot print outcome: {0}")]
    Output(std::io::Error),
}

/// Run an uploaded file through the pipeline.
/// Files above the upload limit are rejected from their size on disk, unread.
pub fn upload_document(
    pipeline: &DocumentPipeline,
    path: &Path,
    document_type: Option<DocumentType>,
    content_type: Option<&str>,
) -> Result<PipelineOutcome, CommandError> {
    let read_err = |source: std::io::Error| CommandError::Read {
        path: path.to_path_buf(),
        source,
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let size = std::fs::metadata(path).map_err(read_err)?.len();
    if let Some(rejected) = pipeline.check_size(&sanitize_filename(&name), size) {
        return Ok(rejected);
    }

    let bytes = std::fs::read(path).map_err(read_err)?;

    tracing::info!(file = %name, bytes = bytes.len(), "Upload received");
    let artifact = Artifact::upload(&name, content_type, bytes);
    Ok(pipeline.process(artifact, document_type)?)
}

/// Run a camera frame through the pipeline. `source` is a path or `-`.
pub fn capture_document(
    pipeline: &DocumentPipeline,
    source: &str,
) -> Result<PipelineOutcome, CommandError> {
    let bytes = if source == STDIN_SOURCE {
        let mut buf = Vec::new();
        std::io::stdin()
            .lock()
            .read_to_end(&mut buf)
            .map_err(CommandError::Stdin)?;
        buf
    } else {
        std::fs::read(source).map_err(|e| CommandError::Read {
            path: PathBuf::from(source),
            source: e,
        })?
    };

    tracing::info!(bytes = bytes.len(), "Camera frame received");
    Ok(pipeline.process(Artifact::camera_capture(bytes), None)?)
}

/// Write the extracted text of a persisted outcome to `target`.
/// Returns `false` when there is nothing to write (rejected artifact).
pub fn save_download(outcome: &PipelineOutcome, target: &Path) -> Result<bool, CommandError> {
    let PipelineOutcome::Persisted { download, .. } = outcome else {
        tracing::debug!("No download for a rejected artifact");
        return Ok(false);
    };

    std::fs::write(target, &download.bytes).map_err(|source| CommandError::Download {
        path: target.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %target.display(),
        suggested_name = %download.file_name,
        "Extracted text written"
    );
    Ok(true)
}

/// Print the outcome as JSON, then write the download copy if asked.
/// A failed download write is reported but does not fail the command:
/// the triad is already on disk and the printed record points at it.
pub fn report(
    outcome: &PipelineOutcome,
    download: Option<&Path>,
    out: &mut impl Write,
) -> Result<(), CommandError> {
    serde_json::to_writer_pretty(&mut *out, outcome)?;
    writeln!(out).map_err(CommandError::Output)?;

    if let Some(target) = download {
        if let Err(e) = save_download(outcome, target) {
            tracing::error!(error = %e, "Download copy not written");
            eprintln!("warning: {e}");
        }
    }
    Ok(())
}
