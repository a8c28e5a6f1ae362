//! Content-addressed dedup cache.
//!
//! The [`ContentMap`] records every local path known to hold a verified copy
//! of a digest so another install can copy the bytes instead of fetching them.
//! [`ContainerChecks`] keeps the per-container remote/local combined digests
//! used to detect available updates.
//!
//! Both structures are plain in-memory data; persistence belongs to
//! [`crate::store`].

mod checks;
mod map;

pub use checks::{CheckRecord, ContainerChecks};
pub use map::{modified_millis, ContentEntry, ContentMap, ContentMapStats, SharedContentMap};
