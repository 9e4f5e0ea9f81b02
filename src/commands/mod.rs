pub mod import;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::AppConfig;
use crate::models::DocumentType;
use crate::pipeline::processor::{DocumentPipeline, PipelineOutcome};

pub use import::CommandError;

#[derive(Parser, Debug)]
#[command(name = "clearance")]
#[command(about = "Extract and file customs documents from uploads or camera captures")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags that override the `CLEARANCE_*` environment.
#[derive(Args, Debug, Default, Clone)]
pub struct Settings {
    /// Storage root for originals, texts and sidecars
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// OCR endpoint URL
    #[arg(long, global = true)]
    pub ocr_url: Option<String>,

    #[arg(long, global = true)]
    pub ocr_api_key: Option<String>,

    /// OCR language code (e.g. eng, fre, ger)
    #[arg(long, global = true)]
    pub ocr_language: Option<String>,

    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub ocr_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(dir) = &self.data_dir {
            config = config.with_data_dir(dir);
        }
        if let Some(url) = &self.ocr_url {
            config.ocr.endpoint = url.clone();
        }
        if let Some(key) = &self.ocr_api_key {
            config.ocr.api_key = key.clone();
        }
        if let Some(language) = &self.ocr_language {
            config.ocr.language = language.clone();
        }
        if let Some(secs) = self.ocr_timeout_secs {
            config.ocr.timeout_secs = secs;
        }
        config
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract and store an uploaded document
    Upload {
        path: PathBuf,

        /// Commercial Invoice, Bill of Lading, Packing List, Certificate of Origin or Other
        #[arg(long)]
        doc_type: Option<DocumentType>,

        /// Declared MIME type; guessed from the extension when omitted
        #[arg(long)]
        content_type: Option<String>,

        /// Also write the extracted text to this path
        #[arg(long)]
        download: Option<PathBuf>,
    },
    /// Extract and store a camera frame read from a file, or stdin with `-`
    Capture {
        source: String,

        #[arg(long)]
        download: Option<PathBuf>,
    },
}

/// Run one CLI invocation and print its outcome as JSON on stdout.
/// The exit code follows the outcome even if the download copy fails.
pub fn execute(cli: Cli) -> Result<PipelineOutcome, CommandError> {
    let config = cli.settings.apply(AppConfig::from_env()?);
    let pipeline = DocumentPipeline::from_config(&config)?;

    let (outcome, download) = match cli.command {
        Command::Upload {
            path,
            doc_type,
            content_type,
            download,
        } => (
            import::upload_document(&pipeline, &path, doc_type, content_type.as_deref())?,
            download,
        ),
        Command::Capture { source, download } => {
            (import::capture_document(&pipeline, &source)?, download)
        }
    };

    import::report(&outcome, download.as_deref(), &mut std::io::stdout().lock())?;
    Ok(outcome)
}
