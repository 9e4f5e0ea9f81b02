use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which extraction strategy applies to an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatTag {
    PlainText,
    Tabular,
    StructuredDocument,
    Pdf,
    Image,
    Unsupported,
}

impl FormatTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlainText => "plain_text",
            Self::Tabular => "tabular",
            Self::StructuredDocument => "structured_document",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Unsupported => "unsupported",
        }
    }
}

/// Extensions accepted for upload, as advertised to callers.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "csv", "docx", "pdf", "jpg", "jpeg", "png", "gif", "bmp", "tif", "tiff",
];

/// Classify an artifact by the case-insensitive last dot-delimited segment of its name.
pub fn classify(name: &str) -> FormatTag {
    let Some(ext) = extension_of(name) else {
        return FormatTag::Unsupported;
    };

    match ext.as_str() {
        "txt" => FormatTag::PlainText,
        "csv" => FormatTag::Tabular,
        "docx" => FormatTag::StructuredDocument,
        "pdf" => FormatTag::Pdf,
        "jpg" | "jpeg" | "png" | "gif" | "bmp" | "tif" | "tiff" => FormatTag::Image,
        _ => FormatTag::Unsupported,
    }
}

/// Lowercased last dot-delimited segment of the final path component.
/// Dotfiles (`.env`) and trailing dots have no extension.
pub fn extension_of(name: &str) -> Option<String> {
    let file_name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Detect common image formats from magic bytes.
/// Returns (extension, MIME type).
pub fn sniff_image_type(bytes: &[u8]) -> Option<(&'static str, &'static str)> {
    match bytes {
        // JPEG: starts with FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some(("jpg", "image/jpeg")),
        // PNG: starts with 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some(("png", "image/png")),
        // TIFF: little-endian (49 49 2A 00) or big-endian (4D 4D 00 2A)
        [0x49, 0x49, 0x2A, 0x00, ..] | [0x4D, 0x4D, 0x00, 0x2A, ..] => {
            Some(("tiff", "image/tiff"))
        }
        [b'G', b'I', b'F', b'8', ..] => Some(("gif", "image/gif")),
        [b'B', b'M', ..] => Some(("bmp", "image/bmp")),
        _ => None,
    }
}

/// The declared content type if present, otherwise a guess from the extension.
pub fn content_type_for(name: &str, declared: Option<&str>) -> String {
    if let Some(declared) = declared.map(str::trim).filter(|d| !d.is_empty()) {
        return declared.to_string();
    }
    mime_guess::from_path(name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

const MAX_NAME_CHARS: usize = 255;

/// Reduce a name to its final path component, without NULs, at most 255 chars.
/// Long names lose the end of their stem, never their extension.
pub fn sanitize_filename(original: &str) -> String {
    let name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document");

    let clean: String = name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | '\0'))
        .collect();

    if clean.is_empty() {
        "document".to_string()
    } else {
        truncate_keeping_extension(&clean, MAX_NAME_CHARS)
    }
}

fn truncate_keeping_extension(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        // At least one stem char must survive or the name turns into a dotfile
        Some((stem, ext))
            if !stem.is_empty() && !ext.is_empty() && ext.chars().count() + 2 <= max_chars =>
        {
            let keep = max_chars - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            format!("{stem}.{ext}")
        }
        _ => name.chars().take(max_chars).collect(),
    }
}

/// Storage-safe stem of a filename: extension dropped, anything outside
/// `[A-Za-z0-9._-]` replaced by `_`.
pub fn base_name(original: &str) -> String {
    let name = sanitize_filename(original);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name.as_str(),
    };

    let clean: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(120)
        .collect();

    let clean = clean.trim_matches('.').to_string();
    if clean.is_empty() {
        "document".to_string()
    } else {
        clean
    }
}
