//! The catalog: users, collections, tags and export definitions.
//!
//! The browsing core only ever talks to the [`Catalog`] trait; the backing
//! store is a collaborator, not part of the core. [`MemoryCatalog`] is the
//! bundled implementation: rows in process, snapshotted to disk as toml.

mod export;
mod memory;

pub use export::ExportReport;
pub use memory::MemoryCatalog;

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type UserId = i64;
pub type CollectionId = i64;
pub type ExportId = i64;

/// Interactive-path failures are recoverable by design: a bad id or a
/// missing export source must surface as a status message, never take the
/// session down.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("collection {0} does not exist")]
    CollectionNotFound(CollectionId),
    #[error("export {0} does not exist")]
    ExportNotFound(ExportId),
    #[error("user {0} does not exist")]
    UserNotFound(UserId),
    #[error("export source is missing: {0}")]
    MissingSource(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("catalog snapshot: {0}")]
    Snapshot(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub id: CollectionId,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
    pub file_path: PathBuf,
    pub collection_name: String,
    pub subcollection: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    pub id: ExportId,
    pub name: String,
    pub output_dir: PathBuf,
    /// Concrete exports hard-link the sources; abstract ones symlink.
    pub concrete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub auto_audition: bool,
    pub target_collection: Option<CollectionSummary>,
    pub target_subcollection: String,
    pub root: Option<PathBuf>,
}

/// Subcollection labels are stored path-style with a leading slash; an
/// empty label means "no subcollection".
pub fn normalize_subcollection(label: &str) -> String {
    if label.is_empty() || label.starts_with('/') {
        label.to_string()
    } else {
        format!("/{label}")
    }
}

pub trait Catalog: Send + Sync {
    /// Find a user by name, creating one on first sight.
    fn resolve_user(&self, name: &str) -> Result<User, CatalogError>;

    /// The first known user, if any (launch without `--user`).
    fn first_user(&self) -> Result<Option<User>, CatalogError>;

    fn set_root(&self, user: UserId, root: &Path) -> Result<(), CatalogError>;

    fn set_auto_audition(&self, user: UserId, enabled: bool) -> Result<(), CatalogError>;

    fn set_target_collection(&self, user: UserId, collection: CollectionId)
        -> Result<(), CatalogError>;

    fn set_target_subcollection(&self, user: UserId, label: &str) -> Result<(), CatalogError>;

    fn list_collections(&self, user: UserId) -> Result<Vec<CollectionSummary>, CatalogError>;

    /// Creates the collection and makes it the user's target.
    fn create_collection(
        &self,
        user: UserId,
        name: &str,
        description: &str,
    ) -> Result<CollectionId, CatalogError>;

    /// Distinct subcollection labels in a collection, ascending; `filter`
    /// narrows by case-insensitive substring.
    fn list_subcollections(
        &self,
        collection: CollectionId,
        filter: Option<&str>,
    ) -> Result<Vec<String>, CatalogError>;

    /// Tag records whose stored file path lives under `dir`.
    fn tags_for_directory(&self, dir: &Path) -> Result<Vec<TagRecord>, CatalogError>;

    fn tags_for_collection(&self, collection: CollectionId)
        -> Result<Vec<TagRecord>, CatalogError>;

    /// Idempotent: an identical tag row is silently ignored.
    fn create_tag(
        &self,
        user: UserId,
        file_path: &Path,
        collection: CollectionId,
        name: &str,
        subcollection: &str,
    ) -> Result<(), CatalogError>;

    fn list_exports(&self, user: UserId) -> Result<Vec<ExportTarget>, CatalogError>;

    fn create_export(
        &self,
        user: UserId,
        name: &str,
        output_dir: &Path,
        concrete: bool,
    ) -> Result<ExportId, CatalogError>;

    /// Materialize every tag of `collection` under the export's output
    /// directory. Existing destinations are skipped; a missing source is an
    /// error.
    fn run_export(
        &self,
        collection: CollectionId,
        export: ExportId,
    ) -> Result<ExportReport, CatalogError>;
}
