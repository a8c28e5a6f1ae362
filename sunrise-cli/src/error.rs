//! CLI error type.

use std::path::PathBuf;

use sunrise::config::ConfigError;
use sunrise::downloader::DownloaderState;
use sunrise::host::HostError;
use sunrise::logging::LoggingError;
use sunrise::manifest::CatalogError;
use sunrise::resolver::ResolveError;
use sunrise::store::StoreError;
use thiserror::Error;

/// Errors surfaced to the user.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Failed to set signal handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("No manifests found. Pass --manifest or place *.json files in {}", .0.display())]
    NoManifests(PathBuf),

    #[error("Session ended with {state}: {detail}")]
    SessionFailed {
        state: DownloaderState,
        detail: String,
    },
}
