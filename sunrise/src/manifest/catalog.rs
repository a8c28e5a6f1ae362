//! Catalog of the containers declared by the active manifests.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::types::{Container, ContainerKind};

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while loading manifest documents.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read manifest {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// An already-mapped manifest, as produced by the manifest collaborator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub runtimes: Vec<Container>,
    #[serde(default)]
    pub applications: Vec<Container>,
    #[serde(default)]
    pub servers: Vec<Container>,
}

impl ManifestDocument {
    /// Load a manifest document from a JSON file.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let data = fs::read_to_string(path).map_err(|e| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&data).map_err(|e| CatalogError::ParseFailed {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Containers keyed by id, one map per kind.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    runtimes: HashMap<String, Arc<Container>>,
    applications: HashMap<String, Arc<Container>>,
    servers: HashMap<String, Arc<Container>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a single manifest document.
    pub fn from_document(document: ManifestDocument) -> Self {
        let mut catalog = Self::new();
        catalog.merge(document);
        catalog
    }

    /// Load and merge every manifest file in order.
    pub fn load_files<P: AsRef<Path>>(paths: &[P]) -> CatalogResult<Self> {
        let mut catalog = Self::new();
        for path in paths {
            let document = ManifestDocument::load(path.as_ref())?;
            info!(path = %path.as_ref().display(), name = %document.name, "Loaded manifest");
            catalog.merge(document);
        }
        Ok(catalog)
    }

    /// Merge a manifest into the catalog.
    ///
    /// Containers with an id already present are replaced, never patched.
    pub fn merge(&mut self, document: ManifestDocument) {
        Self::replace_all(&mut self.runtimes, document.runtimes, ContainerKind::Runtime);
        Self::replace_all(
            &mut self.applications,
            document.applications,
            ContainerKind::Application,
        );
        Self::replace_all(&mut self.servers, document.servers, ContainerKind::Server);
    }

    fn replace_all(
        map: &mut HashMap<String, Arc<Container>>,
        containers: Vec<Container>,
        kind: ContainerKind,
    ) {
        for mut container in containers {
            container.kind = kind;
            debug!(id = %container.id, %kind, files = container.files.len(), "Catalog entry");
            map.insert(container.id.clone(), Arc::new(container));
        }
    }

    /// Add a single container, replacing any previous one with the same id.
    pub fn insert(&mut self, container: Container) {
        let kind = container.kind;
        Self::replace_all(self.map_mut(kind), vec![container], kind);
    }

    fn map_mut(&mut self, kind: ContainerKind) -> &mut HashMap<String, Arc<Container>> {
        match kind {
            ContainerKind::Runtime => &mut self.runtimes,
            ContainerKind::Application => &mut self.applications,
            ContainerKind::Server => &mut self.servers,
        }
    }

    pub fn runtime(&self, id: &str) -> Option<&Arc<Container>> {
        self.runtimes.get(id)
    }

    pub fn application(&self, id: &str) -> Option<&Arc<Container>> {
        self.applications.get(id)
    }

    pub fn server(&self, id: &str) -> Option<&Arc<Container>> {
        self.servers.get(id)
    }

    /// Look a container up in any kind, applications first.
    pub fn get(&self, id: &str) -> Option<&Arc<Container>> {
        self.applications
            .get(id)
            .or_else(|| self.runtimes.get(id))
            .or_else(|| self.servers.get(id))
    }

    /// Application a server entry points at.
    ///
    /// Servers are not downloadable themselves; installing one means
    /// installing this application.
    pub fn target_for_server(&self, id: &str) -> Option<&str> {
        self.servers.get(id).and_then(|s| s.application.as_deref())
    }

    /// Runtimes sorted by id.
    pub fn runtimes(&self) -> Vec<&Arc<Container>> {
        Self::sorted(&self.runtimes)
    }

    /// Applications sorted by id.
    pub fn applications(&self) -> Vec<&Arc<Container>> {
        Self::sorted(&self.applications)
    }

    /// Servers sorted by id.
    pub fn servers(&self) -> Vec<&Arc<Container>> {
        Self::sorted(&self.servers)
    }

    fn sorted(map: &HashMap<String, Arc<Container>>) -> Vec<&Arc<Container>> {
        let mut containers: Vec<_> = map.values().collect();
        containers.sort_by(|a, b| a.id.cmp(&b.id));
        containers
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty() && self.applications.is_empty() && self.servers.is_empty()
    }
}
