//! Text-only strategies: no network, no document parsing beyond the bytes.
//!
//! - `PlainTextExtractor`: strict UTF-8 decode, text kept byte-for-byte
//! - `TabularExtractor`: CSV rendered as an aligned, row-indexed text table

use super::types::{ExtractionMethod, ExtractionResult, TextExtractor};
use super::ExtractionError;
use crate::models::Artifact;

/// Column separator in rendered tables
const COLUMN_GAP: &str = "  ";

pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::PlainTextRead
    }

    fn extract(&self, artifact: &Artifact) -> ExtractionResult {
        let outcome = decode_utf8(artifact.bytes());
        ExtractionResult::from_outcome(self.method(), outcome)
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String, ExtractionError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| ExtractionError::Decode(e.to_string()))
}

pub struct TabularExtractor;

impl TextExtractor for TabularExtractor {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::CsvTable
    }

    fn extract(&self, artifact: &Artifact) -> ExtractionResult {
        let outcome = render_csv(artifact.bytes());
        ExtractionResult::from_outcome(self.method(), outcome)
    }
}

/// Render CSV as a text table: header row first, then one line per record
/// prefixed by its 0-based index. Columns are right-aligned.
fn render_csv(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = decode_utf8(bytes)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ExtractionError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractionError::Csv(e.to_string()))?;
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }

    if headers.iter().all(|h| h.is_empty()) && rows.is_empty() {
        return Ok(String::new());
    }

    let column_count = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);

    let mut widths = vec![0usize; column_count];
    for (i, header) in headers.iter().enumerate() {
        widths[i] = widths[i].max(header.chars().count());
    }
    for row in &rows {
        for (i, field) in row.iter().enumerate() {
            widths[i] = widths[i].max(field.chars().count());
        }
    }
    let index_width = rows.len().saturating_sub(1).to_string().len();

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(render_line(" ".repeat(index_width), &headers, &widths));
    for (idx, row) in rows.iter().enumerate() {
        lines.push(render_line(format!("{idx:<index_width$}"), row, &widths));
    }

    Ok(lines
        .into_iter()
        .map(|l| l.trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n"))
}

fn render_line(index: String, fields: &[String], widths: &[usize]) -> String {
    let mut line = index;
    for (i, width) in widths.iter().enumerate() {
        let field = fields.get(i).map(String::as_str).unwrap_or("");
        let pad = width.saturating_sub(field.chars().count());
        line.push_str(COLUMN_GAP);
        line.push_str(&" ".repeat(pad));
        line.push_str(field);
    }
    line
}
