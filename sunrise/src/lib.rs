//! Sunrise - content-addressed download and verification engine
//!
//! This library installs and verifies the runtimes and applications a game
//! launcher offers. A manifest declares containers of files with their size,
//! digest and candidate URLs; the engine turns an install target into those
//! files on disk, reusing identical content that is already installed
//! elsewhere.
//!
//! # Layers
//!
//! ```text
//! host ──► downloader ──┬─► transfer ──► Fetcher (HTTP)
//!                       ├─► checksum
//!                       └─► content_map ◄── store (cache.json)
//! resolver ──► manifest
//! ```
//!
//! Callers resolve a target with [`resolver::resolve`], hand the containers
//! to a [`host::DownloadHost`] (or run a [`downloader::Downloader`] directly)
//! and observe [`downloader::DownloadEvent`]s.

pub mod checksum;
pub mod config;
pub mod content_map;
pub mod downloader;
pub mod host;
pub mod interrupt;
pub mod logging;
pub mod manifest;
pub mod resolver;
pub mod store;
pub mod transfer;
