//! File transfer unit.
//!
//! Realises one [`FileSpec`](crate::manifest::FileSpec) at a destination path
//! by exactly one of:
//! - a local copy from a content-map entry ([`FileTransfer::copy_from`])
//! - a single attempt against the container's mirror
//! - a round-robin pass over the declared URLs, starting at a random index
//!
//! # Architecture
//!
//! ```text
//! FileTransfer ──► Fetcher (trait)
//!      │              ├── HttpFetcher   (reqwest, bounded timeouts)
//!      │              └── MemoryFetcher (in-process, tests/embedding)
//!      │
//!      └── TransferObserver (start / cumulative progress)
//! ```
//!
//! The unit does not verify digests; the downloader re-verifies every
//! completed write through the checksum engine.

mod error;
mod fetcher;
mod memory;
mod unit;

pub use error::{TransferError, TransferResult};
pub use fetcher::{FetchResponse, Fetcher, HttpFetcher, DEFAULT_TIMEOUT_SECS};
pub use memory::MemoryFetcher;
pub use unit::{
    candidate_order, mirror_url, FileTransfer, NoopObserver, TransferObserver, TransferOutcome,
};
