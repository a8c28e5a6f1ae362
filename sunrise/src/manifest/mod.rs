//! Manifest data model.
//!
//! Containers and file declarations as handed over by the manifest
//! collaborator. Parsing the launcher's XML manifests is not done here; the
//! types derive `serde` so an already-mapped document (JSON) can be loaded
//! into a [`Catalog`].
//!
//! Containers are read-only snapshots. A manifest reload replaces them
//! wholesale through [`Catalog::merge`]; nothing mutates a container in place.

mod algorithm;
mod catalog;
mod types;

pub use algorithm::HashAlgorithm;
pub use catalog::{Catalog, CatalogError, CatalogResult, ManifestDocument};
pub use types::{Container, ContainerKind, FileSpec, Source, Transport};
