//! Error types for the CLI runtime.

use std::io;

use camino::Utf8PathBuf;
use freud_config::ConfigError;
use freud_launcher::LaunchError;
use thiserror::Error;

use crate::lifecycle::LifecycleError;
use crate::telemetry::TelemetryError;

pub(crate) const USAGE: &str = "usage: freud [OPTIONS] <COMMAND> [FILE] [STAGE] [-- ARGS...]";

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("{USAGE}")]
    MissingDescriptor,
    #[error("usage: freud generate <FILE>")]
    MissingScaffoldPath,
    #[error("can't open: {path}")]
    DescriptorNotFound { path: String },
    #[error("file exists: {path}")]
    ScaffoldExists { path: Utf8PathBuf },
    #[error("failed to write descriptor '{path}': {source}")]
    WriteScaffold {
        path: Utf8PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to render configuration: {0}")]
    Render(#[source] serde_json::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Launch(#[from] LaunchError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}
