//! In-process fetcher serving bodies from memory.
//!
//! Used by tests and by callers that already hold file contents. URLs that
//! were never registered behave like an unreachable host.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use super::error::{TransferError, TransferResult};
use super::fetcher::{FetchResponse, Fetcher};

#[derive(Debug, Clone)]
enum Entry {
    Body {
        data: Vec<u8>,
        declare_length: bool,
    },
    Status(u16),
}

/// Fetcher backed by an in-memory URL table.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    entries: RwLock<HashMap<String, Entry>>,
    requests: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `data` at `url` with a declared content length.
    pub fn with_file(self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(url, data);
        self
    }

    /// Answer `url` with a non-success status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.entries.write().insert(url.into(), Entry::Status(status));
        self
    }

    /// Serve `data` at `url` without declaring a content length.
    pub fn with_undeclared_length(self, url: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.entries.write().insert(
            url.into(),
            Entry::Body {
                data: data.into(),
                declare_length: false,
            },
        );
        self
    }

    /// Register or replace a body.
    pub fn insert(&self, url: impl Into<String>, data: impl Into<Vec<u8>>) {
        self.entries.write().insert(
            url.into(),
            Entry::Body {
                data: data.into(),
                declare_length: true,
            },
        );
    }

    /// Make `url` unreachable.
    pub fn remove(&self, url: &str) {
        self.entries.write().remove(url);
    }

    /// Number of fetches attempted so far, successful or not.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// URLs requested so far, in order.
    pub fn requested_urls(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl Fetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> TransferResult<FetchResponse> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(url.to_string());

        match self.entries.read().get(url).cloned() {
            Some(Entry::Body {
                data,
                declare_length,
            }) => Ok(FetchResponse {
                content_length: declare_length.then_some(data.len() as u64),
                body: Box::new(Cursor::new(data)),
            }),
            Some(Entry::Status(status)) => Err(TransferError::Status {
                url: url.to_string(),
                status,
            }),
            None => Err(TransferError::Request {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}
