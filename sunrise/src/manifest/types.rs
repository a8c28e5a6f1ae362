//! Container and file declaration types.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::algorithm::HashAlgorithm;

/// A declared unit of content.
///
/// `size` is authoritative: verification compares it before any hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    /// Path relative to the container's install directory.
    pub name: String,
    /// Expected size in bytes.
    pub size: u64,
    /// Expected digest, lowercase hex.
    pub check: String,
    /// Algorithm `check` was computed with.
    #[serde(default)]
    pub algo: HashAlgorithm,
    /// Candidate source URLs, in manifest order.
    #[serde(default)]
    pub urls: Vec<String>,
}

impl FileSpec {
    /// Create a file declaration.
    pub fn new(
        name: impl Into<String>,
        size: u64,
        check: impl Into<String>,
        algo: HashAlgorithm,
        urls: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            check: check.into().to_ascii_lowercase(),
            algo,
            urls,
        }
    }

    /// Final path component of `name`, used for progress display.
    pub fn display_name(&self) -> &str {
        self.name
            .rsplit(['/', '\\'])
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.name)
    }
}

/// Transport a [`Source`] is reachable through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Http,
    /// Declared by some manifests; never used for transfers.
    Torrent,
}

/// A mirror descriptor attached to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub transport: Transport,
    /// Base URL (http) or magnet link (torrent).
    pub src: String,
}

impl Source {
    /// Create an HTTP mirror descriptor.
    pub fn http(src: impl Into<String>) -> Self {
        Self {
            transport: Transport::Http,
            src: src.into(),
        }
    }
}

/// Kind of installable container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Base layer with no further dependency.
    Runtime,
    /// May depend on a runtime.
    #[default]
    Application,
    /// References an application; never downloaded on its own.
    Server,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime => f.write_str("runtime"),
            Self::Application => f.write_str("application"),
            Self::Server => f.write_str("server"),
        }
    }
}

/// A named bundle of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kind: ContainerKind,
    #[serde(default)]
    pub files: Vec<FileSpec>,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// File names to skip when this container is layered with another.
    #[serde(default)]
    pub exclusions: BTreeSet<String>,
    /// Installed into its own directory even when it has a runtime.
    #[serde(default)]
    pub standalone: bool,
    /// Runtime this application depends on.
    #[serde(default)]
    pub runtime: Option<String>,
    /// Application a server references.
    #[serde(default)]
    pub application: Option<String>,
}

impl Container {
    fn new(id: impl Into<String>, name: impl Into<String>, kind: ContainerKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            files: Vec::new(),
            sources: Vec::new(),
            exclusions: BTreeSet::new(),
            standalone: false,
            runtime: None,
            application: None,
        }
    }

    /// Create an empty runtime container.
    pub fn runtime(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, ContainerKind::Runtime)
    }

    /// Create an empty application container.
    pub fn application(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, ContainerKind::Application)
    }

    /// Create a server entry referencing an application.
    pub fn server(
        id: impl Into<String>,
        name: impl Into<String>,
        application: impl Into<String>,
    ) -> Self {
        let mut server = Self::new(id, name, ContainerKind::Server);
        server.application = Some(application.into());
        server
    }

    pub fn with_files(mut self, files: Vec<FileSpec>) -> Self {
        self.files = files;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_exclusion(mut self, name: impl Into<String>) -> Self {
        self.exclusions.insert(name.into());
        self
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    pub fn with_standalone(mut self, standalone: bool) -> Self {
        self.standalone = standalone;
        self
    }

    /// Mirrors usable by the HTTP transfer path.
    pub fn http_mirrors(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .filter(|s| s.transport == Transport::Http)
            .map(|s| s.src.as_str())
    }

    /// Name shown to users; falls back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}
