//! Shared setup for every command: configuration, logging, manifests and
//! the cache file.

use std::fs;
use std::path::{Path, PathBuf};

use sunrise::config::ConfigFile;
use sunrise::logging::{self, LoggingConfig, WorkerGuard};
use sunrise::manifest::Catalog;
use sunrise::resolver::{resolve, InstallTarget, ResolvedContainer};
use sunrise::store::{CacheData, CacheStore};
use tracing::info;

use crate::error::CliError;

/// Options accepted by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub manifests: Vec<PathBuf>,
    pub verbose: bool,
}

/// Loaded configuration plus the handles commands need.
pub struct CliRunner {
    config: ConfigFile,
    manifests: Vec<PathBuf>,
    store: CacheStore,
    _log_guard: WorkerGuard,
}

impl CliRunner {
    /// Load the configuration and install logging.
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let config = match &options.config {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let mut logging_config: LoggingConfig = config.logging_config().with_stderr(options.verbose);
        if options.verbose {
            logging_config = logging_config.with_level("debug");
        }
        let guard = logging::init(&logging_config)?;

        let manifests = if options.manifests.is_empty() {
            discover_manifests(&default_manifest_dir())
        } else {
            options.manifests.clone()
        };

        let store = CacheStore::new(&config.cache.directory);

        Ok(Self {
            config,
            manifests,
            store,
            _log_guard: guard,
        })
    }

    /// Log the command being run.
    pub fn log_startup(&self, command: &str) {
        info!(
            command,
            version = env!("CARGO_PKG_VERSION"),
            install_root = %self.config.install_root().display(),
            cache = %self.store.path().display(),
            "Sunrise starting"
        );
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn load_cache(&self) -> Result<CacheData, CliError> {
        Ok(self.store.load()?)
    }

    /// Merge every manifest into one catalog.
    pub fn load_catalog(&self) -> Result<Catalog, CliError> {
        if self.manifests.is_empty() {
            return Err(CliError::NoManifests(default_manifest_dir()));
        }
        Ok(Catalog::load_files(&self.manifests)?)
    }

    /// Resolve an id to containers. Server ids install their application.
    pub fn resolve(
        &self,
        catalog: &Catalog,
        id: &str,
        runtime: Option<String>,
    ) -> Result<Vec<ResolvedContainer>, CliError> {
        let mut target = if catalog.server(id).is_some() {
            InstallTarget::for_server(catalog, id)?
        } else {
            InstallTarget::new(id)
        };
        target.runtime = runtime.or(target.runtime);

        Ok(resolve(catalog, &target, &self.config.install_root())?)
    }
}

/// Directory searched for manifests when none are given.
pub fn default_manifest_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("sunrise").join("manifests"))
        .unwrap_or_else(|| PathBuf::from("manifests"))
}

/// Every `*.json` file directly in `dir`, sorted by name.
pub fn discover_manifests(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut manifests: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    manifests.sort();
    manifests
}
