use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    export, normalize_subcollection, Catalog, CatalogError, CollectionId, CollectionSummary,
    ExportId, ExportReport, ExportTarget, TagRecord, User, UserId,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Rows {
    next_id: i64,
    #[serde(default)]
    users: Vec<UserRow>,
    #[serde(default)]
    collections: Vec<CollectionRow>,
    #[serde(default)]
    tags: Vec<TagRow>,
    #[serde(default)]
    exports: Vec<ExportRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRow {
    id: UserId,
    name: String,
    auto_audition: bool,
    selected_collection: Option<CollectionId>,
    selected_subcollection: String,
    root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionRow {
    id: CollectionId,
    user_id: UserId,
    name: String,
    description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TagRow {
    id: i64,
    collection_id: CollectionId,
    name: String,
    file_path: PathBuf,
    subcollection: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExportRow {
    id: ExportId,
    user_id: UserId,
    name: String,
    output_dir: PathBuf,
    concrete: bool,
}

/// In-process catalog with an optional toml snapshot on disk.
///
/// Stands in for the external relational store: same rows, same
/// idempotency rules, none of the schema. Every mutation rewrites the
/// snapshot, so a crash never loses more than the in-flight change.
pub struct MemoryCatalog {
    path: Option<PathBuf>,
    rows: Mutex<Rows>,
}

impl MemoryCatalog {
    /// Open (or start) the snapshot at `path`.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let rows = if path.exists() {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| CatalogError::Snapshot(e.to_string()))?
        } else {
            Rows::default()
        };
        Ok(MemoryCatalog {
            path: Some(path.to_path_buf()),
            rows: Mutex::new(rows),
        })
    }

    /// A catalog with no backing file (tests, throwaway sessions).
    pub fn in_memory() -> Self {
        MemoryCatalog {
            path: None,
            rows: Mutex::new(Rows::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Rows> {
        self.rows.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flush(&self, rows: &Rows) -> Result<(), CatalogError> {
        if let Some(path) = &self.path {
            let content =
                toml::to_string_pretty(rows).map_err(|e| CatalogError::Snapshot(e.to_string()))?;
            fs::write(path, content)?;
        }
        Ok(())
    }
}

fn next_id(rows: &mut Rows) -> i64 {
    rows.next_id += 1;
    rows.next_id
}

fn collection_summary(rows: &Rows, id: CollectionId) -> Option<CollectionSummary> {
    rows.collections.iter().find(|c| c.id == id).map(|c| CollectionSummary {
        id: c.id,
        name: c.name.clone(),
        description: c.description.clone(),
    })
}

fn user_view(rows: &Rows, row: &UserRow) -> User {
    User {
        id: row.id,
        name: row.name.clone(),
        auto_audition: row.auto_audition,
        target_collection: row
            .selected_collection
            .and_then(|id| collection_summary(rows, id)),
        target_subcollection: row.selected_subcollection.clone(),
        root: row.root.clone(),
    }
}

fn user_row_mut(rows: &mut Rows, user: UserId) -> Result<&mut UserRow, CatalogError> {
    rows.users
        .iter_mut()
        .find(|u| u.id == user)
        .ok_or(CatalogError::UserNotFound(user))
}

fn tag_record(rows: &Rows, tag: &TagRow) -> TagRecord {
    let collection_name = rows
        .collections
        .iter()
        .find(|c| c.id == tag.collection_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    TagRecord {
        id: tag.id,
        name: tag.name.clone(),
        file_path: tag.file_path.clone(),
        collection_name,
        subcollection: tag.subcollection.clone(),
    }
}

impl Catalog for MemoryCatalog {
    fn resolve_user(&self, name: &str) -> Result<User, CatalogError> {
        let mut rows = self.lock();
        if let Some(row) = rows.users.iter().find(|u| u.name == name) {
            return Ok(user_view(&rows, row));
        }
        let id = next_id(&mut rows);
        debug!(name, id, "creating user");
        let row = UserRow {
            id,
            name: name.to_string(),
            auto_audition: false,
            selected_collection: None,
            selected_subcollection: String::new(),
            root: None,
        };
        rows.users.push(row.clone());
        self.flush(&rows)?;
        Ok(user_view(&rows, &row))
    }

    fn first_user(&self) -> Result<Option<User>, CatalogError> {
        let rows = self.lock();
        Ok(rows.users.first().map(|row| user_view(&rows, row)))
    }

    fn set_root(&self, user: UserId, root: &Path) -> Result<(), CatalogError> {
        let mut rows = self.lock();
        user_row_mut(&mut rows, user)?.root = Some(root.to_path_buf());
        self.flush(&rows)
    }

    fn set_auto_audition(&self, user: UserId, enabled: bool) -> Result<(), CatalogError> {
        let mut rows = self.lock();
        user_row_mut(&mut rows, user)?.auto_audition = enabled;
        self.flush(&rows)
    }

    fn set_target_collection(
        &self,
        user: UserId,
        collection: CollectionId,
    ) -> Result<(), CatalogError> {
        let mut rows = self.lock();
        if collection_summary(&rows, collection).is_none() {
            return Err(CatalogError::CollectionNotFound(collection));
        }
        let row = user_row_mut(&mut rows, user)?;
        row.selected_collection = Some(collection);
        // Targeting a new collection always resets the subcollection.
        row.selected_subcollection = String::new();
        self.flush(&rows)
    }

    fn set_target_subcollection(&self, user: UserId, label: &str) -> Result<(), CatalogError> {
        let mut rows = self.lock();
        user_row_mut(&mut rows, user)?.selected_subcollection = normalize_subcollection(label);
        self.flush(&rows)
    }

    fn list_collections(&self, user: UserId) -> Result<Vec<CollectionSummary>, CatalogError> {
        let rows = self.lock();
        Ok(rows
            .collections
            .iter()
            .filter(|c| c.user_id == user)
            .map(|c| CollectionSummary {
                id: c.id,
                name: c.name.clone(),
                description: c.description.clone(),
            })
            .collect())
    }

    fn create_collection(
        &self,
        user: UserId,
        name: &str,
        description: &str,
    ) -> Result<CollectionId, CatalogError> {
        let mut rows = self.lock();
        if !rows.users.iter().any(|u| u.id == user) {
            return Err(CatalogError::UserNotFound(user));
        }
        let id = next_id(&mut rows);
        rows.collections.push(CollectionRow {
            id,
            user_id: user,
            name: name.to_string(),
            description: description.to_string(),
        });
        let row = user_row_mut(&mut rows, user)?;
        row.selected_collection = Some(id);
        row.selected_subcollection = String::new();
        self.flush(&rows)?;
        Ok(id)
    }

    fn list_subcollections(
        &self,
        collection: CollectionId,
        filter: Option<&str>,
    ) -> Result<Vec<String>, CatalogError> {
        let rows = self.lock();
        if collection_summary(&rows, collection).is_none() {
            return Err(CatalogError::CollectionNotFound(collection));
        }
        let needle = filter.map(str::to_lowercase);
        let mut labels: Vec<String> = rows
            .tags
            .iter()
            .filter(|t| t.collection_id == collection && !t.subcollection.is_empty())
            .filter(|t| match &needle {
                Some(needle) => t.subcollection.to_lowercase().contains(needle),
                None => true,
            })
            .map(|t| t.subcollection.clone())
            .collect();
        labels.sort();
        labels.dedup();
        Ok(labels)
    }

    fn tags_for_directory(&self, dir: &Path) -> Result<Vec<TagRecord>, CatalogError> {
        let rows = self.lock();
        Ok(rows
            .tags
            .iter()
            .filter(|t| t.file_path.starts_with(dir))
            .map(|t| tag_record(&rows, t))
            .collect())
    }

    fn tags_for_collection(
        &self,
        collection: CollectionId,
    ) -> Result<Vec<TagRecord>, CatalogError> {
        let rows = self.lock();
        if collection_summary(&rows, collection).is_none() {
            return Err(CatalogError::CollectionNotFound(collection));
        }
        let mut tags: Vec<&TagRow> = rows
            .tags
            .iter()
            .filter(|t| t.collection_id == collection)
            .collect();
        tags.sort_by(|a, b| (&a.subcollection, &a.name).cmp(&(&b.subcollection, &b.name)));
        Ok(tags.into_iter().map(|t| tag_record(&rows, t)).collect())
    }

    fn create_tag(
        &self,
        _user: UserId,
        file_path: &Path,
        collection: CollectionId,
        name: &str,
        subcollection: &str,
    ) -> Result<(), CatalogError> {
        let mut rows = self.lock();
        if collection_summary(&rows, collection).is_none() {
            return Err(CatalogError::CollectionNotFound(collection));
        }
        let subcollection = normalize_subcollection(subcollection);
        let duplicate = rows.tags.iter().any(|t| {
            t.collection_id == collection
                && t.file_path == file_path
                && t.name == name
                && t.subcollection == subcollection
        });
        if duplicate {
            debug!(name, path = %file_path.display(), "ignoring duplicate tag");
            return Ok(());
        }
        let id = next_id(&mut rows);
        rows.tags.push(TagRow {
            id,
            collection_id: collection,
            name: name.to_string(),
            file_path: file_path.to_path_buf(),
            subcollection,
        });
        self.flush(&rows)
    }

    fn list_exports(&self, user: UserId) -> Result<Vec<ExportTarget>, CatalogError> {
        let rows = self.lock();
        let mut exports: Vec<ExportTarget> = rows
            .exports
            .iter()
            .filter(|e| e.user_id == user)
            .map(|e| ExportTarget {
                id: e.id,
                name: e.name.clone(),
                output_dir: e.output_dir.clone(),
                concrete: e.concrete,
            })
            .collect();
        exports.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exports)
    }

    fn create_export(
        &self,
        user: UserId,
        name: &str,
        output_dir: &Path,
        concrete: bool,
    ) -> Result<ExportId, CatalogError> {
        let mut rows = self.lock();
        let id = next_id(&mut rows);
        rows.exports.push(ExportRow {
            id,
            user_id: user,
            name: name.to_string(),
            output_dir: output_dir.to_path_buf(),
            concrete,
        });
        self.flush(&rows)?;
        Ok(id)
    }

    fn run_export(
        &self,
        collection: CollectionId,
        export: ExportId,
    ) -> Result<ExportReport, CatalogError> {
        let target = {
            let rows = self.lock();
            rows.exports
                .iter()
                .find(|e| e.id == export)
                .map(|e| ExportTarget {
                    id: e.id,
                    name: e.name.clone(),
                    output_dir: e.output_dir.clone(),
                    concrete: e.concrete,
                })
                .ok_or(CatalogError::ExportNotFound(export))?
        };
        let tags = self.tags_for_collection(collection)?;
        export::materialize(&target, &tags)
    }
}
