use std::path::{Path, PathBuf};

use crate::catalog::{CollectionSummary, ExportTarget, TagRecord};

/// One row of the navigable list.
///
/// Every window shape funnels into the same cursor-addressable list, so the
/// row is a sum over everything the session can display: filesystem
/// entries, collections, subcollection labels, export definitions and tag
/// records.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Entry {
        path: PathBuf,
        is_dir: bool,
        tags: Vec<TagRecord>,
    },
    Collection(CollectionSummary),
    Subcollection { name: String },
    Export(ExportTarget),
    Tag(TagRecord),
}

impl Item {
    /// The synthetic `..` row prepended below the root.
    pub fn parent_entry() -> Self {
        Item::Entry {
            path: PathBuf::from(".."),
            is_dir: true,
            tags: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Item::Entry { .. } | Item::Subcollection { .. } => 0,
            Item::Collection(c) => c.id,
            Item::Export(e) => e.id,
            Item::Tag(t) => t.id,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Item::Entry { path, .. } => entry_name(path),
            Item::Collection(c) => c.name.clone(),
            Item::Subcollection { name } => name.clone(),
            Item::Export(e) => e.name.clone(),
            Item::Tag(t) => t.name.clone(),
        }
    }

    /// The filesystem path behind this row, if it points at one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Item::Entry { path, .. } => Some(path),
            Item::Tag(t) => Some(&t.file_path),
            _ => None,
        }
    }

    pub fn description(&self) -> String {
        match self {
            Item::Entry { tags, .. } => tags
                .iter()
                .map(|t| format!("{}{}", t.collection_name, t.subcollection))
                .collect::<Vec<_>>()
                .join(", "),
            Item::Collection(c) => c.description.clone(),
            Item::Subcollection { .. } => String::new(),
            Item::Export(e) => format!(
                "{} ({})",
                e.output_dir.display(),
                if e.concrete { "concrete" } else { "abstract" }
            ),
            Item::Tag(t) => t.subcollection.clone(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Item::Entry { is_dir: true, .. })
    }

    /// Rows the preview engine can audition.
    pub fn is_file(&self) -> bool {
        match self {
            Item::Entry { is_dir, .. } => !is_dir,
            Item::Tag(_) => true,
            _ => false,
        }
    }
}

fn entry_name(path: &Path) -> String {
    if path.as_os_str() == ".." {
        return "..".to_string();
    }
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_entry_is_a_directory_named_dot_dot() {
        let parent = Item::parent_entry();
        assert!(parent.is_dir());
        assert!(!parent.is_file());
        assert_eq!(parent.name(), "..");
    }

    #[test]
    fn tag_rows_point_at_their_file() {
        let tag = TagRecord {
            id: 3,
            name: "808_kick".into(),
            file_path: PathBuf::from("/samples/kicks/808_kick.wav"),
            collection_name: "beats".into(),
            subcollection: "/kicks".into(),
        };
        let item = Item::Tag(tag.clone());
        assert!(item.is_file());
        assert_eq!(item.path(), Some(tag.file_path.as_path()));
        assert_eq!(item.description(), "/kicks");
    }
}
