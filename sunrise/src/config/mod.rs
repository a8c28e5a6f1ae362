//! Configuration.
//!
//! [`ConfigFile`] is the user-editable INI file. [`DownloaderConfig`] is the
//! plain struct the engine is built from; nothing in the engine reads the
//! file directly.

mod downloader;
mod file;

pub use downloader::DownloaderConfig;
pub use file::{
    config_file_path, format_size, CacheSettings, ConfigError, ConfigFile, ConfigResult,
    DownloadSettings, LoggingSettings, PathsSettings,
};
