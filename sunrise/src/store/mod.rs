//! Persisted content map and container check records.
//!
//! Both live in `cache.json` in the cache directory:
//!
//! ```json
//! {
//!   "file_map": { "<digest>": [{ "path": "...", "mtime": 1700000000000 }] },
//!   "container_checks": { "<id>": { "remote": "...", "local": "..." } }
//! }
//! ```
//!
//! Saves write a sibling temp file and rename it over the old one, so a crash
//! mid-save never leaves a truncated cache.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::content_map::{ContainerChecks, ContentMap};

/// Cache file name inside the cache directory.
pub const CACHE_FILE: &str = "cache.json";

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while loading or saving the cache file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read cache {path}: {source}")]
    ReadFailed { path: PathBuf, source: io::Error },

    #[error("failed to parse cache {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to write cache {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    #[error("failed to serialize cache: {0}")]
    SerializeFailed(#[source] serde_json::Error),
}

/// Everything persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheData {
    #[serde(default)]
    pub file_map: ContentMap,
    #[serde(default)]
    pub container_checks: ContainerChecks,
}

/// Reads and writes `cache.json`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// Store backed by `cache.json` in `directory`.
    pub fn new(directory: impl AsRef<Path>) -> Self {
        Self {
            path: directory.as_ref().join(CACHE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache. A missing file is an empty cache.
    pub fn load(&self) -> StoreResult<CacheData> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No cache file yet");
                return Ok(CacheData::default());
            }
            Err(e) => {
                return Err(StoreError::ReadFailed {
                    path: self.path.clone(),
                    source: e,
                })
            }
        };

        let cache: CacheData =
            serde_json::from_str(&data).map_err(|e| StoreError::ParseFailed {
                path: self.path.clone(),
                source: e,
            })?;

        let stats = cache.file_map.stats();
        info!(
            path = %self.path.display(),
            digests = stats.digests,
            entries = stats.entries,
            "Loaded cache"
        );
        Ok(cache)
    }

    /// Save both maps.
    pub fn save(&self, file_map: &ContentMap, container_checks: &ContainerChecks) -> StoreResult<()> {
        #[derive(Serialize)]
        struct CacheRef<'a> {
            file_map: &'a ContentMap,
            container_checks: &'a ContainerChecks,
        }

        let json = serde_json::to_vec_pretty(&CacheRef {
            file_map,
            container_checks,
        })
        .map_err(StoreError::SerializeFailed)?;

        let write_failed = |e| StoreError::WriteFailed {
            path: self.path.clone(),
            source: e,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, json).map_err(write_failed)?;
        fs::rename(&temp, &self.path).map_err(write_failed)?;

        debug!(path = %self.path.display(), "Saved cache");
        Ok(())
    }
}
