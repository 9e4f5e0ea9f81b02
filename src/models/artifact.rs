use serde::Serialize;

use super::enums::CaptureSource;
use crate::pipeline::import::format::{
    content_type_for, extension_of, sanitize_filename, sniff_image_type,
};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Stem used for camera captures, both in the declared name and in storage keys
pub const CAMERA_CAPTURE_STEM: &str = "camera";

/// A file received from an upload or a camera capture.
/// Immutable once built; owned by a single pipeline invocation.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    name: String,
    content_type: String,
    source: CaptureSource,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl Artifact {
    /// Build an uploaded artifact. The name is reduced to its final path component;
    /// a missing content type is guessed from the extension.
    pub fn upload(name: &str, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let name = sanitize_filename(name);
        let content_type = content_type_for(&name, content_type);
        Self {
            name,
            content_type,
            source: CaptureSource::Upload,
            bytes,
        }
    }

    /// Build an artifact from a captured camera frame.
    /// The image type is sniffed from magic bytes, defaulting to PNG.
    pub fn camera_capture(bytes: Vec<u8>) -> Self {
        let (extension, mime) = sniff_image_type(&bytes).unwrap_or(("png", "image/png"));
        Self {
            name: format!("{CAMERA_CAPTURE_STEM}.{extension}"),
            content_type: mime.to_string(),
            source: CaptureSource::Camera,
            bytes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn source(&self) -> CaptureSource {
        self.source
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Size in MB rounded to 2 decimals
    pub fn size_mb(&self) -> f64 {
        (self.bytes.len() as f64 / BYTES_PER_MB * 100.0).round() / 100.0
    }

    /// Lowercased last dot-delimited segment of the name, if any
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}
