//! DOCX text extraction.
//!
//! A DOCX file is a zip container; the body lives in `word/document.xml`.
//! Body-level paragraphs (`w:p`) are read in document order, one line each.
//! Paragraphs inside tables or nested in text boxes are not part of the
//! body paragraph list and are skipped.

use std::borrow::Cow;
use std::io::{Cursor, Read};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::{ExtractionMethod, ExtractionResult, TextExtractor};
use super::ExtractionError;
use crate::models::Artifact;

const DOCUMENT_PART: &str = "word/document.xml";

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9A-Fa-f]+|#[0-9]+|amp|lt|gt|quot|apos);").unwrap());

pub struct DocxExtractor;

impl TextExtractor for DocxExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::DocxParagraphs
    }

    fn extract(&self, artifact: &Artifact) -> ExtractionResult {
        let outcome = read_document_xml(artifact.bytes()).map(|xml| {
            let paragraphs = body_paragraphs(&xml);
            tracing::debug!(paragraphs = paragraphs.len(), "DOCX paragraphs read");
            paragraphs.join("\n")
        });
        ExtractionResult::from_outcome(self.method(), outcome)
    }
}

fn read_document_xml(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::Docx(format!("not a DOCX archive: {e}")))?;

    let mut part = archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| ExtractionError::Docx(format!("missing {DOCUMENT_PART}")))?;

    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(format!("unreadable {DOCUMENT_PART}: {e}")))?;
    Ok(xml)
}

enum TagKind {
    Open,
    Close,
    Empty,
}

/// Split `<...>` into its kind and qualified name. Declarations,
/// processing instructions and comments yield `None`.
fn parse_tag(tag: &str) -> Option<(TagKind, &str, &str)> {
    let inner = tag.strip_prefix('<')?.strip_suffix('>')?;
    if inner.starts_with('?') || inner.starts_with('!') {
        return None;
    }

    let (kind, inner) = if let Some(rest) = inner.strip_prefix('/') {
        (TagKind::Close, rest)
    } else if let Some(rest) = inner.strip_suffix('/') {
        (TagKind::Empty, rest)
    } else {
        (TagKind::Open, inner)
    };

    let name_end = inner
        .find(|c: char| c.is_whitespace())
        .unwrap_or(inner.len());
    Some((kind, &inner[..name_end], &inner[name_end..]))
}

/// Text of each body-level paragraph, in document order.
fn body_paragraphs(xml: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut paragraph_depth = 0usize;
    let mut table_depth = 0usize;
    let mut run_depth = 0usize;
    let mut in_text = false;
    let mut cursor = 0usize;

    for tag_match in TAG_RE.find_iter(xml) {
        let in_body_paragraph = paragraph_depth == 1 && table_depth == 0;

        if in_text && in_body_paragraph {
            current.push_str(&unescape_xml(&xml[cursor..tag_match.start()]));
        }
        cursor = tag_match.end();

        let Some((kind, name, attrs)) = parse_tag(tag_match.as_str()) else {
            continue;
        };

        match (kind, name) {
            (TagKind::Open, "w:tbl") => table_depth += 1,
            (TagKind::Close, "w:tbl") => table_depth = table_depth.saturating_sub(1),

            (TagKind::Open, "w:p") => {
                paragraph_depth += 1;
                if paragraph_depth == 1 {
                    current.clear();
                }
            }
            (TagKind::Close, "w:p") => {
                if paragraph_depth == 1 && table_depth == 0 {
                    paragraphs.push(std::mem::take(&mut current));
                }
                paragraph_depth = paragraph_depth.saturating_sub(1);
            }
            (TagKind::Empty, "w:p") => {
                if paragraph_depth == 0 && table_depth == 0 {
                    paragraphs.push(String::new());
                }
            }

            (TagKind::Open, "w:r") => run_depth += 1,
            (TagKind::Close, "w:r") => run_depth = run_depth.saturating_sub(1),

            (TagKind::Open, "w:t") => in_text = true,
            (TagKind::Close, "w:t") => in_text = false,

            (TagKind::Empty, "w:tab") if run_depth > 0 && in_body_paragraph => {
                current.push('\t');
            }
            (TagKind::Empty, "w:br") if run_depth > 0 && in_body_paragraph => {
                // Page and column breaks carry no text
                if !attrs.contains("w:type=\"page\"") && !attrs.contains("w:type=\"column\"") {
                    current.push('\n');
                }
            }
            (TagKind::Empty, "w:cr") if run_depth > 0 && in_body_paragraph => {
                current.push('\n');
            }
            _ => {}
        }
    }

    paragraphs
}

/// Resolve the predefined XML entities and numeric character references.
fn unescape_xml(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    ENTITY_RE.replace_all(raw, |caps: &Captures| {
        let entity = &caps[1];
        let resolved = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => {
                let code = match entity.strip_prefix("#x") {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => entity[1..].parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            }
        };
        resolved
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    })
}
