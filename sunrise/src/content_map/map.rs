//! Digest to path map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Content map shared between a session and the persistence layer.
///
/// Every read-modify-write goes through the one lock so concurrent
/// completions can never record the same entry twice.
pub type SharedContentMap = Arc<Mutex<ContentMap>>;

/// One known location of a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub path: PathBuf,
    /// Modification time in milliseconds since the Unix epoch.
    pub mtime: u64,
}

/// Summary counts for a content map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentMapStats {
    pub digests: usize,
    pub entries: usize,
}

/// Mapping from lowercase hex digest to the verified local copies of it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentMap {
    entries: BTreeMap<String, Vec<ContentEntry>>,
}

impl ContentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the map for sharing with a session.
    pub fn shared(self) -> SharedContentMap {
        Arc::new(Mutex::new(self))
    }

    /// All known locations of a digest.
    pub fn lookup(&self, digest: &str) -> &[ContentEntry] {
        self.entries
            .get(&digest.to_ascii_lowercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The entry for `digest` at exactly `path`, if recorded.
    pub fn entry_at(&self, digest: &str, path: &Path) -> Option<&ContentEntry> {
        self.lookup(digest).iter().find(|e| e.path == path)
    }

    /// Whether `path` is recorded for `digest` with the given mtime.
    ///
    /// This is the cheap "nothing changed since we verified it" test.
    pub fn is_current(&self, digest: &str, path: &Path, mtime: u64) -> bool {
        self.entry_at(digest, path).is_some_and(|e| e.mtime == mtime)
    }

    /// Record a verified copy.
    ///
    /// New locations are appended; a digest may resolve to several paths and
    /// no other path's entry is ever touched. The one exception: recording a
    /// `(digest, path)` pair that is already present replaces that pair's
    /// mtime instead of appending a duplicate. Returns true if the map changed.
    pub fn record(&mut self, digest: &str, path: impl Into<PathBuf>, mtime: u64) -> bool {
        let path = path.into();
        let list = self.entries.entry(digest.to_ascii_lowercase()).or_default();

        match list.iter_mut().find(|e| e.path == path) {
            Some(existing) if existing.mtime == mtime => false,
            Some(existing) => {
                existing.mtime = mtime;
                true
            }
            None => {
                debug!(digest = %digest, path = %path.display(), "Recording content map entry");
                list.push(ContentEntry { path, mtime });
                true
            }
        }
    }

    /// Remove one `(digest, path)` entry. Returns true if it existed.
    pub fn remove(&mut self, digest: &str, path: &Path) -> bool {
        let key = digest.to_ascii_lowercase();
        let Some(list) = self.entries.get_mut(&key) else {
            return false;
        };

        let before = list.len();
        list.retain(|e| e.path != path);
        let removed = list.len() != before;

        if list.is_empty() {
            self.entries.remove(&key);
        }
        removed
    }

    /// Drop every entry whose path no longer exists. Returns the number
    /// of entries removed.
    pub fn prune_missing(&mut self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, list| {
            let before = list.len();
            list.retain(|e| e.path.is_file());
            removed += before - list.len();
            !list.is_empty()
        });
        removed
    }

    pub fn stats(&self) -> ContentMapStats {
        ContentMapStats {
            digests: self.entries.len(),
            entries: self.entries.values().map(Vec::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Modification time of a file in milliseconds since the Unix epoch.
///
/// Returns 0 when the time cannot be read.
pub fn modified_millis(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
