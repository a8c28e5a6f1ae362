//! Engine settings passed explicitly into the host and sessions.

use std::time::Duration;

use crate::checksum::DEFAULT_BLOCK_SIZE;
use crate::transfer::DEFAULT_TIMEOUT_SECS;

/// Default time a new session waits for the previous one to stop.
const DEFAULT_SHUTDOWN_WAIT_SECS: u64 = 10;

/// Settings for download sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloaderConfig {
    /// Connect/read timeout for each HTTP attempt.
    pub timeout: Duration,
    /// Hashing block size in bytes.
    pub block_size: usize,
    /// Hash existing files even when the content map says they are unchanged.
    pub full_verify: bool,
    /// Accept a size match for files that already exist.
    pub fast_check: bool,
    /// How long a new session waits for the previous one to stop.
    pub shutdown_wait: Duration,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            block_size: DEFAULT_BLOCK_SIZE,
            full_verify: false,
            fast_check: false,
            shutdown_wait: Duration::from_secs(DEFAULT_SHUTDOWN_WAIT_SECS),
        }
    }
}

impl DownloaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the hashing block size (minimum 1 byte).
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size.max(1);
        self
    }

    pub fn with_full_verify(mut self, full_verify: bool) -> Self {
        self.full_verify = full_verify;
        self
    }

    pub fn with_fast_check(mut self, fast_check: bool) -> Self {
        self.fast_check = fast_check;
        self
    }

    pub fn with_shutdown_wait(mut self, wait: Duration) -> Self {
        self.shutdown_wait = wait;
        self
    }
}
