use std::path::{Path, PathBuf};

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Clearance";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Storage root used when no data directory is configured (relative to the working directory)
pub const DEFAULT_DATA_DIR: &str = "saved_documents";
pub const UPLOADED_FILES_SUBDIR: &str = "uploaded_files";
pub const EXTRACTED_TEXT_SUBDIR: &str = "extracted_text";

pub const DEFAULT_OCR_ENDPOINT: &str = "https://api.ocr.space/parse/image";
/// OCR.space public demo key. Rate-limited; set CLEARANCE_OCR_API_KEY for real use.
pub const DEFAULT_OCR_API_KEY: &str = "helloworld";
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 200;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "clearance=debug,clearance_lib=debug"
    } else {
        "clearance=info,clearance_lib=info"
    }
}

/// Where the document triads are written.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Originals, written verbatim
    pub fn artifacts_dir(&self) -> PathBuf {
        self.data_dir.join(UPLOADED_FILES_SUBDIR)
    }

    /// Extracted text and metadata sidecars
    pub fn texts_dir(&self) -> PathBuf {
        self.data_dir.join(EXTRACTED_TEXT_SUBDIR)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DATA_DIR)
    }
}

/// Remote OCR endpoint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    pub endpoint: String,
    pub api_key: String,
    pub language: String,
    pub timeout_secs: u64,
    /// Ask the endpoint for word overlay coordinates. Only the parsed text is kept.
    pub overlay: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OCR_ENDPOINT.to_string(),
            api_key: DEFAULT_OCR_API_KEY.to_string(),
            language: DEFAULT_OCR_LANGUAGE.to_string(),
            timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
            overlay: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    pub max_upload_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            ocr: OcrConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * BYTES_PER_MB,
        }
    }
}

impl AppConfig {
    /// Build the configuration from `CLEARANCE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get("CLEARANCE_DATA_DIR") {
            config.storage = StorageConfig::new(dir);
        }
        if let Some(url) = get("CLEARANCE_OCR_URL") {
            config.ocr.endpoint = url;
        }
        match get("CLEARANCE_OCR_API_KEY") {
            Some(key) => config.ocr.api_key = key,
            None => tracing::warn!("CLEARANCE_OCR_API_KEY not set, using the OCR.space demo key"),
        }
        if let Some(lang) = get("CLEARANCE_OCR_LANGUAGE") {
            config.ocr.language = lang;
        }
        if let Some(raw) = get("CLEARANCE_OCR_TIMEOUT_SECS") {
            config.ocr.timeout_secs = parse_positive("CLEARANCE_OCR_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = get("CLEARANCE_OCR_OVERLAY") {
            config.ocr.overlay = parse_flag("CLEARANCE_OCR_OVERLAY", &raw)?;
        }
        if let Some(raw) = get("CLEARANCE_MAX_UPLOAD_MB") {
            config.max_upload_bytes = parse_positive("CLEARANCE_MAX_UPLOAD_MB", &raw)?
                .checked_mul(BYTES_PER_MB)
                .ok_or_else(|| ConfigError::InvalidValue {
                    var: "CLEARANCE_MAX_UPLOAD_MB",
                    value: raw.clone(),
                    reason: "too large".into(),
                })?;
        }

        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: &Path) -> Self {
        self.storage = StorageConfig::new(dir);
        self
    }
}

fn parse_positive(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    let value: u64 = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
        ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: e.to_string(),
        }
    })?;
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(value)
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: "expected true/false".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_environment_empty() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.ocr.language, "eng");
        assert_eq!(config.ocr.timeout_secs, 30);
        assert_eq!(config.max_upload_bytes, 200 * 1024 * 1024);
    }

    #[test]
    fn storage_dirs_under_data_dir() {
        let storage = StorageConfig::new("/srv/clearance");
        assert_eq!(
            storage.artifacts_dir(),
            PathBuf::from("/srv/clearance/uploaded_files")
        );
        assert_eq!(
            storage.texts_dir(),
            PathBuf::from("/srv/clearance/extracted_text")
        );
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("CLEARANCE_DATA_DIR", "/tmp/docs"),
            ("CLEARANCE_OCR_URL", "http://localhost:9000/parse"),
            ("CLEARANCE_OCR_API_KEY", "secret"),
            ("CLEARANCE_OCR_LANGUAGE", "fre"),
            ("CLEARANCE_OCR_TIMEOUT_SECS", "5"),
            ("CLEARANCE_OCR_OVERLAY", "yes"),
            ("CLEARANCE_MAX_UPLOAD_MB", "10"),
        ]))
        .unwrap();

        assert_eq!(config.storage.data_dir, PathBuf::from("/tmp/docs"));
        assert_eq!(config.ocr.endpoint, "http://localhost:9000/parse");
        assert_eq!(config.ocr.api_key, "secret");
        assert_eq!(config.ocr.language, "fre");
        assert_eq!(config.ocr.timeout_secs, 5);
        assert!(config.ocr.overlay);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn blank_values_are_ignored() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("CLEARANCE_OCR_LANGUAGE", "  ")])).unwrap();
        assert_eq!(config.ocr.language, "eng");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("CLEARANCE_OCR_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLEARANCE_OCR_TIMEOUT_SECS"));
    }

    #[test]
    fn non_numeric_upload_limit_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("CLEARANCE_MAX_UPLOAD_MB", "lots")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn bad_overlay_flag_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[("CLEARANCE_OCR_OVERLAY", "maybe")]));
        assert!(result.is_err());
    }

    #[test]
    fn huge_upload_limit_rejected() {
        let result = AppConfig::from_lookup(lookup_from(&[(
            "CLEARANCE_MAX_UPLOAD_MB",
            "18446744073709551615",
        )]));
        match result {
            Err(ConfigError::InvalidValue { var, reason, .. }) => {
                assert_eq!(var, "CLEARANCE_MAX_UPLOAD_MB");
                assert_eq!(reason, "too large");
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }
}
