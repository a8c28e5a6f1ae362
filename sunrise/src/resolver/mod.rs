//! Expands an install target into the ordered containers to process.
//!
//! Runtimes always come before the application that depends on them. When an
//! application is layered over a runtime, the runtime's file list is filtered
//! by the combined exclusion set of both containers; the application's own
//! list is kept whole.
//!
//! The install directory of every container is fixed here, once, before the
//! downloader computes any file path:
//!
//! ```text
//! runtime                      -> <root>/<runtime id>
//! application, not standalone  -> <root>/<runtime id>
//! application, standalone      -> <root>/<application id>
//! application without runtime  -> <root>/<application id>
//! ```

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::manifest::{Catalog, Container, FileSpec};

/// Result type for resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Errors raised while resolving an install target.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown container '{id}'")]
    UnknownContainer { id: String },

    #[error("'{id}' is a server entry and cannot be downloaded directly")]
    NotDownloadable { id: String },

    #[error("runtime '{runtime}' required by '{application}' is not in the catalog")]
    UnknownRuntime { application: String, runtime: String },

    #[error("file '{name}' of '{container}' would be written outside its install directory")]
    UnsafePath { container: String, name: String },
}

/// What the caller asked to install or verify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallTarget {
    /// Application or runtime id.
    pub id: String,
    /// Runtime to use instead of the one the application declares.
    pub runtime: Option<String>,
}

impl InstallTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            runtime: None,
        }
    }

    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Target for the application a server entry references.
    pub fn for_server(catalog: &Catalog, server_id: &str) -> ResolveResult<Self> {
        match catalog.target_for_server(server_id) {
            Some(application) => Ok(Self::new(application)),
            None if catalog.server(server_id).is_some() => Err(ResolveError::NotDownloadable {
                id: server_id.to_string(),
            }),
            None => Err(ResolveError::UnknownContainer {
                id: server_id.to_string(),
            }),
        }
    }
}

/// A container ready for the downloader: directory fixed, files filtered.
#[derive(Debug, Clone)]
pub struct ResolvedContainer {
    pub container: Arc<Container>,
    pub destination: PathBuf,
    pub files: Vec<FileSpec>,
}

impl ResolvedContainer {
    /// A container installed into `destination` with its full file list.
    pub fn new(container: Arc<Container>, destination: impl Into<PathBuf>) -> Self {
        let files = container.files.clone();
        Self {
            container,
            destination: destination.into(),
            files,
        }
    }

    pub fn id(&self) -> &str {
        &self.container.id
    }

    pub fn name(&self) -> &str {
        self.container.display_name()
    }

    /// Whether exclusions removed any of the container's declared files.
    pub fn is_filtered(&self) -> bool {
        self.files.len() != self.container.files.len()
    }

    /// HTTP mirror bases declared by the container.
    pub fn mirrors(&self) -> Vec<String> {
        self.container.http_mirrors().map(str::to_string).collect()
    }

    /// Absolute destination of one of this container's files.
    ///
    /// Names are relative paths using `/` or `\\`. Absolute names, parent
    /// references and drive prefixes are rejected so every file stays under
    /// `destination`.
    pub fn path_for(&self, file: &FileSpec) -> ResolveResult<PathBuf> {
        let unsafe_path = || ResolveError::UnsafePath {
            container: self.id().to_string(),
            name: file.name.clone(),
        };

        if file.name.starts_with(['/', '\\']) {
            return Err(unsafe_path());
        }

        let mut path = self.destination.clone();
        for part in file.name.split(['/', '\\']).filter(|p| !p.is_empty() && *p != ".") {
            let mut components = Path::new(part).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => path.push(part),
                _ => return Err(unsafe_path()),
            }
        }

        if path == self.destination {
            return Err(unsafe_path());
        }
        Ok(path)
    }
}

/// Resolve `target` against the catalog, rooting install directories at
/// `install_root`.
///
/// Fails if any file name would land outside its container's directory.
pub fn resolve(
    catalog: &Catalog,
    target: &InstallTarget,
    install_root: &Path,
) -> ResolveResult<Vec<ResolvedContainer>> {
    let containers = resolve_containers(catalog, target, install_root)?;
    for container in &containers {
        for file in &container.files {
            container.path_for(file)?;
        }
    }
    Ok(containers)
}

fn resolve_containers(
    catalog: &Catalog,
    target: &InstallTarget,
    install_root: &Path,
) -> ResolveResult<Vec<ResolvedContainer>> {
    if let Some(application) = catalog.application(&target.id) {
        return resolve_application(catalog, application, target, install_root);
    }

    if let Some(runtime) = catalog.runtime(&target.id) {
        debug!(runtime = %runtime.id, "Resolved runtime target");
        return Ok(vec![ResolvedContainer::new(
            Arc::clone(runtime),
            install_root.join(&runtime.id),
        )]);
    }

    if catalog.server(&target.id).is_some() {
        return Err(ResolveError::NotDownloadable {
            id: target.id.clone(),
        });
    }

    Err(ResolveError::UnknownContainer {
        id: target.id.clone(),
    })
}

fn resolve_application(
    catalog: &Catalog,
    application: &Arc<Container>,
    target: &InstallTarget,
    install_root: &Path,
) -> ResolveResult<Vec<ResolvedContainer>> {
    let runtime_id = target.runtime.as_ref().or(application.runtime.as_ref());

    let runtime = match runtime_id {
        Some(id) => Some(catalog.runtime(id).ok_or_else(|| ResolveError::UnknownRuntime {
            application: application.id.clone(),
            runtime: id.clone(),
        })?),
        None => None,
    };

    let Some(runtime) = runtime else {
        debug!(application = %application.id, "Resolved application without runtime");
        return Ok(vec![ResolvedContainer::new(
            Arc::clone(application),
            install_root.join(&application.id),
        )]);
    };

    let runtime_dir = install_root.join(&runtime.id);
    let application_dir = if application.standalone {
        install_root.join(&application.id)
    } else {
        runtime_dir.clone()
    };

    let excluded: BTreeSet<&str> = runtime
        .exclusions
        .iter()
        .chain(application.exclusions.iter())
        .map(String::as_str)
        .collect();

    let mut layered = ResolvedContainer::new(Arc::clone(runtime), runtime_dir);
    layered
        .files
        .retain(|file| !excluded.contains(file.name.as_str()));

    debug!(
        application = %application.id,
        runtime = %runtime.id,
        excluded = runtime.files.len() - layered.files.len(),
        standalone = application.standalone,
        "Resolved application target"
    );

    Ok(vec![
        layered,
        ResolvedContainer::new(Arc::clone(application), application_dir),
    ])
}
