//! Event surface observed by callers.
//!
//! Events for one file are always ordered `FileStarted → FileProgress* →
//! FileCompleted`, and a container's `ContainerStarted` precedes all of its
//! file events.

use std::path::PathBuf;
use std::sync::mpsc::Sender;

use parking_lot::Mutex;

use super::state::{DownloaderState, FileContext};

/// Something a session wants its caller to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadEvent {
    StateChanged {
        state: DownloaderState,
        file: Option<FileContext>,
    },
    ContainerStarted {
        name: String,
        file_count: usize,
    },
    /// Files finished so far in the current container.
    OverallProgress {
        completed: usize,
    },
    FileStarted {
        expected_size: u64,
        display_name: String,
    },
    /// Cumulative bytes written or hashed for the current file.
    FileProgress {
        bytes: u64,
    },
    FileCompleted {
        digest: String,
        path: PathBuf,
        mtime: u64,
    },
    /// Combined digest of every file processed in the session so far.
    ///
    /// `partial` is set when exclusions dropped some of the container's
    /// files, so the digest does not describe the whole container.
    ContainerCompleted {
        container_id: String,
        digest: String,
        partial: bool,
    },
    /// A content map entry failed re-verification and was pruned.
    InvalidCacheEntry {
        digest: String,
        path: PathBuf,
    },
}

/// Receiver of session events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}

impl EventSink for Sender<DownloadEvent> {
    fn emit(&self, event: DownloadEvent) {
        // A dropped receiver just means nobody is watching.
        let _ = self.send(event);
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<DownloadEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events emitted so far.
    pub fn events(&self) -> Vec<DownloadEvent> {
        self.events.lock().clone()
    }

    /// Every state the session went through, in order.
    pub fn states(&self) -> Vec<DownloaderState> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                DownloadEvent::StateChanged { state, .. } => Some(*state),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&DownloadEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: DownloadEvent) {
        self.events.lock().push(event);
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: DownloadEvent) {}
}
