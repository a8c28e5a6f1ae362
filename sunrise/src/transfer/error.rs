//! Error types for single-file transfers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors raised by a single transfer attempt.
///
/// None of these end a session on their own: the transfer unit moves on to
/// the next candidate and only reports failure once every source is spent.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("failed reading body of {url}: {source}")]
    Read { url: String, source: io::Error },

    #[error("{url} ended after {actual} of {expected} bytes")]
    Truncated {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to create directory {path}: {source}")]
    CreateDirFailed { path: PathBuf, source: io::Error },

    #[error("failed to read local copy {path}: {source}")]
    CopyFailed { path: PathBuf, source: io::Error },

    #[error("no source URLs declared for {name}")]
    NoSources { name: String },
}
