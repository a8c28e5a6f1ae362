//! Session states and failure context.

use std::fmt;
use std::path::PathBuf;

/// State of a downloader session.
///
/// ```text
/// New ─► Downloading ─┬─► Complete
///     └► Verifying ───┼─► DownloadFailed
///                     ├─► VerificationFailed
///                     └─► Missing            (verify only)
///
/// Downloading / Verifying ─► Paused | Shutdown   (interrupt)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DownloaderState {
    #[default]
    New,
    Downloading,
    Verifying,
    Paused,
    Shutdown,
    Complete,
    DownloadFailed,
    VerificationFailed,
    Missing,
}

impl DownloaderState {
    /// Whether the session is still working.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Downloading | Self::Verifying)
    }

    /// Whether the session has stopped, for whatever reason.
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::New | Self::Downloading | Self::Verifying)
    }

    /// Whether the session stopped because something went wrong.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Self::DownloadFailed | Self::VerificationFailed | Self::Missing
        )
    }

    /// Whether the session stopped on request and may be resumed.
    pub fn is_interrupted(self) -> bool {
        matches!(self, Self::Paused | Self::Shutdown)
    }
}

impl fmt::Display for DownloaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Downloading => "downloading",
            Self::Verifying => "verifying",
            Self::Paused => "paused",
            Self::Shutdown => "shutdown",
            Self::Complete => "complete",
            Self::DownloadFailed => "download failed",
            Self::VerificationFailed => "verification failed",
            Self::Missing => "missing",
        };
        f.write_str(name)
    }
}

/// Identity of the file a state change concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContext {
    pub container_id: String,
    pub file_name: String,
    pub digest: String,
    pub path: PathBuf,
}

impl fmt::Display for FileContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} in {} ({})",
            self.file_name,
            self.container_id,
            self.path.display()
        )
    }
}
