//! Remote OCR client for the OCR.space `parse/image` API.
//!
//! One blocking multipart POST per call, bounded by the configured timeout,
//! no retries. Every transport or payload problem comes back as an
//! [`OcrError`]; the extraction layer turns it into a failure marker.

use std::time::{Duration, Instant};

use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

use super::ocr::OcrError;
use super::types::OcrEngine;
use crate::config::OcrConfig;
use crate::pipeline::import::format::{content_type_for, extension_of};

/// Longest response body excerpt kept in an `HttpStatus` error
const MAX_ERROR_BODY_CHARS: usize = 500;

/// HTTP client for the OCR.space endpoint.
pub struct RemoteOcrClient {
    endpoint: String,
    api_key: String,
    language: String,
    overlay: bool,
    timeout_secs: u64,
    client: reqwest::blocking::Client,
}

impl RemoteOcrClient {
    pub fn new(config: &OcrConfig) -> Result<Self, OcrError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OcrError::ClientInit(e.to_string()))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
            overlay: config.overlay,
            timeout_secs: config.timeout_secs,
            client,
        })
    }

    fn build_form(&self, image_bytes: &[u8], file_name: &str) -> Result<Form, OcrError> {
        let mime = content_type_for(file_name, None);
        let part = Part::bytes(image_bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(&mime)
            .map_err(|e| OcrError::Transport(e.to_string()))?;

        let mut form = Form::new()
            .part("file", part)
            .text("apikey", self.api_key.clone())
            .text("language", self.language.clone());

        if self.overlay {
            form = form.text("isOverlayRequired", "true");
        }
        if let Some(file_type) = ocr_file_type(file_name) {
            form = form.text("filetype", file_type);
        }
        Ok(form)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> OcrError {
        if e.is_timeout() {
            OcrError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            OcrError::Connection(self.endpoint.clone())
        } else {
            OcrError::Transport(e.to_string())
        }
    }
}

impl OcrEngine for RemoteOcrClient {
    fn recognize(&self, image_bytes: &[u8], file_name: &str) -> Result<String, OcrError> {
        let _span = tracing::info_span!(
            "remote_ocr",
            endpoint = %self.endpoint,
            file = %file_name,
            size = image_bytes.len(),
        )
        .entered();
        let start = Instant::now();

        let form = self.build_form(image_bytes, file_name)?;
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        let body = response.text().map_err(|e| self.map_transport_error(e))?;
        if !status.is_success() {
            return Err(OcrError::HttpStatus {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let text = parse_ocr_response(&body)?;

        tracing::info!(
            elapsed_ms = %start.elapsed().as_millis(),
            text_len = text.len(),
            "Remote OCR complete"
        );
        Ok(text)
    }
}

/// Response body of `parse/image`. Only the fields the pipeline reads.
#[derive(Debug, Deserialize)]
struct OcrSpaceResponse {
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored_on_processing: bool,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<ErrorMessages>,
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Option<Vec<ParsedResult>>,
}

/// The endpoint sends either a single message or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorMessages {
    One(String),
    Many(Vec<String>),
}

impl ErrorMessages {
    fn into_vec(self) -> Vec<String> {
        let messages = match self {
            Self::One(message) => vec![message],
            Self::Many(messages) => messages,
        };
        messages
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct ParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: Option<String>,
}

/// Interpret a `parse/image` payload: the first parsed result's text, edge
/// whitespace trimmed, or the endpoint's error.
fn parse_ocr_response(body: &str) -> Result<String, OcrError> {
    let response: OcrSpaceResponse =
        serde_json::from_str(body).map_err(|e| OcrError::MalformedResponse(e.to_string()))?;

    if response.is_errored_on_processing {
        let messages = response
            .error_message
            .map(ErrorMessages::into_vec)
            .unwrap_or_default();
        return Err(OcrError::Processing(messages));
    }

    let first = response
        .parsed_results
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| OcrError::MalformedResponse("no ParsedResults entry".into()))?;

    first
        .parsed_text
        .map(|text| text.trim().to_string())
        .ok_or_else(|| OcrError::MalformedResponse("ParsedResults[0] has no ParsedText".into()))
}

/// `filetype` hint understood by the endpoint, from the file extension.
fn ocr_file_type(file_name: &str) -> Option<&'static str> {
    match extension_of(file_name)?.as_str() {
        "pdf" => Some("PDF"),
        "png" => Some("PNG"),
        "jpg" | "jpeg" => Some("JPG"),
        "gif" => Some("GIF"),
        "bmp" => Some("BMP"),
        "tif" | "tiff" => Some("TIF"),
        _ => None,
    }
}
