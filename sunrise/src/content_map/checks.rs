//! Per-container combined digests used to detect updates.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checksum::CombinedDigest;
use crate::manifest::Catalog;
use crate::resolver::{resolve, InstallTarget};

/// Remote and local combined digests of one container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRecord {
    /// Computed from the manifest on every (re)load.
    #[serde(default)]
    pub remote: Option<String>,
    /// Reported by the last completed download or verify pass.
    #[serde(default)]
    pub local: Option<String>,
}

/// Check records keyed by container id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerChecks {
    records: BTreeMap<String, CheckRecord>,
}

impl ContainerChecks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute the remote digest of every runtime and application.
    ///
    /// An application's digest covers what installing it processes: the
    /// exclusion-filtered runtime files followed by its own files.
    pub fn refresh_remote(&mut self, catalog: &Catalog) {
        let ids = catalog
            .runtimes()
            .into_iter()
            .chain(catalog.applications())
            .map(|c| c.id.clone())
            .collect::<Vec<_>>();

        for id in ids {
            let resolved = match resolve(catalog, &InstallTarget::new(&id), Path::new("")) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(container = %id, error = %e, "Skipping remote check");
                    continue;
                }
            };

            let mut digest = CombinedDigest::new();
            for file in resolved.iter().flat_map(|c| c.files.iter()) {
                digest.update(&file.check);
            }

            let remote = digest.hex();
            debug!(container = %id, remote = %remote, "Remote check");
            self.records.entry(id).or_default().remote = Some(remote);
        }
    }

    /// Store the digest reported when a container finished.
    pub fn record_local(&mut self, id: &str, digest: impl Into<String>) {
        self.records.entry(id.to_string()).or_default().local = Some(digest.into());
    }

    /// Record a completed pass over a container.
    ///
    /// A partial pass (exclusion-filtered file list) is not recorded: its
    /// digest can never equal the remote digest of the whole container.
    /// Returns true if the local digest was stored.
    pub fn record_completed(&mut self, id: &str, digest: impl Into<String>, partial: bool) -> bool {
        if partial {
            debug!(container = %id, "Partial pass, local check unchanged");
            return false;
        }
        self.record_local(id, digest);
        true
    }

    pub fn get(&self, id: &str) -> Option<&CheckRecord> {
        self.records.get(id)
    }

    /// True when the container was installed and its manifest has changed
    /// since.
    pub fn update_available(&self, id: &str) -> bool {
        match self.records.get(id) {
            Some(CheckRecord {
                remote: Some(remote),
                local: Some(local),
            }) => remote != local,
            _ => false,
        }
    }

    /// Whether a completed pass has ever been recorded for the container.
    pub fn is_installed(&self, id: &str) -> bool {
        self.records.get(id).is_some_and(|r| r.local.is_some())
    }
}
