//! INI configuration file.
//!
//! ```ini
//! [paths]
//! bin_path = bin
//! run_path = run
//!
//! [download]
//! timeout_secs = 10
//! hash_block_mb = 32
//! full_verify = false
//! fast_check = false
//! shutdown_wait_secs = 10
//!
//! [cache]
//! directory = ~/.cache/sunrise
//!
//! [logging]
//! directory = ~/.local/share/sunrise/logs
//! level = info
//! ```
//!
//! Relative `[paths]` entries are resolved against the data directory.
//! Missing keys fall back to their defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::downloader::DownloaderConfig;
use crate::logging::LoggingConfig;

const APP_DIR: &str = "sunrise";
const CONFIG_FILE: &str = "config.ini";

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while reading or writing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    ReadFailed { path: PathBuf, source: ini::Error },

    #[error("failed to write config {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid value '{value}' for [{section}] {key}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    #[error("could not determine the user configuration directory")]
    NoConfigDir,
}

/// `[paths]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsSettings {
    /// Install root for containers.
    pub bin_path: PathBuf,
    /// Working directory for launched applications.
    pub run_path: PathBuf,
}

/// `[download]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    pub timeout_secs: u64,
    pub hash_block_mb: usize,
    pub full_verify: bool,
    pub fast_check: bool,
    pub shutdown_wait_secs: u64,
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Directory holding `cache.json`.
    pub directory: PathBuf,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub level: String,
}

/// The whole configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub paths: PathsSettings,
    pub download: DownloadSettings,
    pub cache: CacheSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            paths: PathsSettings {
                bin_path: PathBuf::from("bin"),
                run_path: PathBuf::from("run"),
            },
            download: DownloadSettings {
                timeout_secs: 10,
                hash_block_mb: 32,
                full_verify: false,
                fast_check: false,
                shutdown_wait_secs: 10,
            },
            cache: CacheSettings {
                directory: dirs::cache_dir()
                    .map(|d| d.join(APP_DIR))
                    .unwrap_or_else(|| data_dir.join("cache")),
            },
            logging: LoggingSettings {
                directory: data_dir.join("logs"),
                level: "info".to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// Load from the default location; a missing file yields defaults.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&config_file_path()?)
    }

    /// Load from `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(v) = get(ini, "paths", "bin_path") {
            config.paths.bin_path = PathBuf::from(v);
        }
        if let Some(v) = get(ini, "paths", "run_path") {
            config.paths.run_path = PathBuf::from(v);
        }

        let download = &mut config.download;
        parse_into(ini, "download", "timeout_secs", &mut download.timeout_secs)?;
        parse_into(ini, "download", "hash_block_mb", &mut download.hash_block_mb)?;
        parse_into(ini, "download", "full_verify", &mut download.full_verify)?;
        parse_into(ini, "download", "fast_check", &mut download.fast_check)?;
        parse_into(
            ini,
            "download",
            "shutdown_wait_secs",
            &mut download.shutdown_wait_secs,
        )?;
        if download.hash_block_mb == 0 {
            return Err(invalid("download", "hash_block_mb", "0"));
        }

        if let Some(v) = get(ini, "cache", "directory") {
            config.cache.directory = PathBuf::from(v);
        }
        if let Some(v) = get(ini, "logging", "directory") {
            config.logging.directory = PathBuf::from(v);
        }
        if let Some(v) = get(ini, "logging", "level") {
            config.logging.level = v.to_string();
        }

        Ok(config)
    }

    /// Write to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&config_file_path()?)
    }

    /// Write to `path`, creating its directory if needed.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let write_failed = |e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_failed)?;
        }
        self.to_ini().write_to_file(path).map_err(write_failed)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("paths"))
            .set("bin_path", self.paths.bin_path.display().to_string())
            .set("run_path", self.paths.run_path.display().to_string());
        ini.with_section(Some("download"))
            .set("timeout_secs", self.download.timeout_secs.to_string())
            .set("hash_block_mb", self.download.hash_block_mb.to_string())
            .set("full_verify", self.download.full_verify.to_string())
            .set("fast_check", self.download.fast_check.to_string())
            .set(
                "shutdown_wait_secs",
                self.download.shutdown_wait_secs.to_string(),
            );
        ini.with_section(Some("cache"))
            .set("directory", self.cache.directory.display().to_string());
        ini.with_section(Some("logging"))
            .set("directory", self.logging.directory.display().to_string())
            .set("level", self.logging.level.clone());
        ini
    }

    /// Absolute install root.
    pub fn install_root(&self) -> PathBuf {
        absolute(&self.paths.bin_path)
    }

    /// Absolute run directory.
    pub fn run_root(&self) -> PathBuf {
        absolute(&self.paths.run_path)
    }

    /// Engine settings described by the `[download]` section.
    pub fn downloader_config(&self) -> DownloaderConfig {
        DownloaderConfig::new()
            .with_timeout(Duration::from_secs(self.download.timeout_secs))
            .with_block_size(self.download.hash_block_mb.saturating_mul(1024 * 1024))
            .with_full_verify(self.download.full_verify)
            .with_fast_check(self.download.fast_check)
            .with_shutdown_wait(Duration::from_secs(self.download.shutdown_wait_secs))
    }

    /// Logging settings described by the `[logging]` section.
    pub fn logging_config(&self) -> LoggingConfig {
        LoggingConfig::new(&self.logging.directory).with_level(&self.logging.level)
    }
}

/// Default location of the configuration file.
pub fn config_file_path() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join(CONFIG_FILE))
        .ok_or(ConfigError::NoConfigDir)
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64 / 1024.0;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".").join(APP_DIR))
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir().join(path)
    }
}

fn get<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.get_from(Some(section), key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_into<T: FromStr>(ini: &Ini, section: &str, key: &str, target: &mut T) -> ConfigResult<()> {
    if let Some(value) = get(ini, section, key) {
        *target = value
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| invalid(section, key, value))?;
    }
    Ok(())
}

fn invalid(section: &str, key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("config.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_partial_file_overrides() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(
            &path,
            "[paths]\nbin_path = /games\n\n[download]\ntimeout_secs = 3\nfull_verify = True\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();

        assert_eq!(config.paths.bin_path, PathBuf::from("/games"));
        assert_eq!(config.install_root(), PathBuf::from("/games"));
        assert_eq!(config.download.timeout_secs, 3);
        assert!(config.download.full_verify);
        assert_eq!(config.download.hash_block_mb, 32);
    }

    #[test]
    fn test_invalid_value() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[download]\ntimeout_secs = soon\n").unwrap();

        let err = ConfigFile::load_from(&path).unwrap_err();
        match err {
            ConfigError::InvalidValue {
                section,
                key,
                value,
            } => {
                assert_eq!(section, "download");
                assert_eq!(key, "timeout_secs");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        fs::write(&path, "[download]\nhash_block_mb = 0\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.ini");
        let mut config = ConfigFile::default();
        config.download.fast_check = true;
        config.cache.directory = temp.path().join("cache");
        config.logging.level = "debug".to_string();

        config.save_to(&path).unwrap();
        let loaded = ConfigFile::load_from(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_downloader_config() {
        let mut config = ConfigFile::default();
        config.download.hash_block_mb = 2;
        config.download.timeout_secs = 4;
        config.download.fast_check = true;

        let engine = config.downloader_config();

        assert_eq!(engine.block_size, 2 * 1024 * 1024);
        assert_eq!(engine.timeout, Duration::from_secs(4));
        assert!(engine.fast_check);
        assert!(!engine.full_verify);
    }

    #[test]
    fn test_relative_bin_path_is_under_data_dir() {
        let config = ConfigFile::default();
        assert!(config.install_root().is_absolute() || dirs::data_local_dir().is_none());
        assert!(config.install_root().ends_with("bin"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
