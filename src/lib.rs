pub mod commands;
pub mod config;
pub mod models;
pub mod pipeline;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::Cli;
use crate::pipeline::processor::PipelineOutcome;

/// Exit status when the artifact was rejected before extraction
const EXIT_REJECTED: u8 = 2;

pub fn run() -> ExitCode {
    // Logs go to stderr; stdout carries the JSON outcome
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("{} v{}", config::APP_NAME, config::APP_VERSION);

    match commands::execute(cli) {
        Ok(PipelineOutcome::Persisted { .. }) => ExitCode::SUCCESS,
        Ok(PipelineOutcome::Rejected { .. }) => ExitCode::from(EXIT_REJECTED),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
