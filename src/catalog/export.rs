use std::fs;
use std::path::Path;

use tracing::{debug, info};

use super::{CatalogError, ExportTarget, TagRecord};

/// What an export run actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    pub linked: usize,
    pub skipped: usize,
}

/// Lay the collection out as
/// `output_dir/export/collection/subcollection/filename`, hard-linking for
/// concrete exports and symlinking otherwise. Existing destinations are
/// skipped so re-running an export only fills in what is missing; a tag
/// whose source file has vanished aborts the run.
pub(crate) fn materialize(
    export: &ExportTarget,
    tags: &[TagRecord],
) -> Result<ExportReport, CatalogError> {
    let mut report = ExportReport { linked: 0, skipped: 0 };
    for tag in tags {
        let source = &tag.file_path;
        if !source.exists() {
            return Err(CatalogError::MissingSource(source.clone()));
        }
        let dir = export
            .output_dir
            .join(&export.name)
            .join(&tag.collection_name)
            .join(tag.subcollection.trim_start_matches('/'));
        fs::create_dir_all(&dir)?;
        let destination = match source.file_name() {
            Some(name) => dir.join(name),
            None => return Err(CatalogError::MissingSource(source.clone())),
        };
        if destination.exists() {
            debug!(destination = %destination.display(), "destination exists, skipping");
            report.skipped += 1;
            continue;
        }
        link(source, &destination, export.concrete)?;
        report.linked += 1;
    }
    info!(
        export = %export.name,
        linked = report.linked,
        skipped = report.skipped,
        "export finished"
    );
    Ok(report)
}

#[cfg(unix)]
fn link(source: &Path, destination: &Path, concrete: bool) -> Result<(), CatalogError> {
    if concrete {
        fs::hard_link(source, destination)?;
    } else {
        std::os::unix::fs::symlink(source, destination)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn link(source: &Path, destination: &Path, _concrete: bool) -> Result<(), CatalogError> {
    // No symlinks without elevation off unix; a hard link keeps the export
    // usable either way.
    fs::hard_link(source, destination)?;
    Ok(())
}
