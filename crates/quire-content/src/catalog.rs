//! Enumeration of the eligible files under a content root.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::content_type::allowed_extension_of;
use crate::root::ContentRoot;

/// One servable file, addressed relative to the content root.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CatalogEntry {
    /// Forward-slash separated path, usable as-is in a fetch URL
    pub relative_path: String,

    /// Lowercased extension without the leading dot
    pub extension: String,
}

/// The content root could not be read at all.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Content root unavailable: {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// List every eligible file, sorted by relative path.
///
/// Rescans on every call. An unreadable root yields an empty list and a
/// warning rather than an error.
pub fn list_files(root: &ContentRoot) -> Vec<CatalogEntry> {
    match scan(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("{}; serving an empty catalog", e);
            Vec::new()
        }
    }
}

/// Walk the root, failing only if the root itself cannot be read.
pub fn scan(root: &ContentRoot) -> Result<Vec<CatalogEntry>, CatalogError> {
    fs::read_dir(root.path()).map_err(|source| CatalogError::Unavailable {
        path: root.path().to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();

    let walker = WalkDir::new(root.path())
        .min_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| stays_inside(root, entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable catalog entry: {}", e);
                continue;
            }
        };

        // With follow_links this is the type of the link target.
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(catalog_entry) = eligible_entry(root, entry.path()) {
            entries.push(catalog_entry);
        }
    }

    entries.sort();
    Ok(entries)
}

/// Whether the walk should enter or yield `entry`. Directories reached
/// through a symlink leading out of the root are pruned, not walked.
fn stays_inside(root: &ContentRoot, entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }

    match fs::canonicalize(entry.path()) {
        Ok(canonical) => root.contains(&canonical),
        Err(_) => false,
    }
}

/// Apply the same checks the resolver does to a walked file.
fn eligible_entry(root: &ContentRoot, path: &Path) -> Option<CatalogEntry> {
    let relative = path.strip_prefix(root.path()).ok()?;
    let extension = allowed_extension_of(relative)?;

    let canonical = fs::canonicalize(path).ok()?;
    if !root.contains(&canonical) || allowed_extension_of(&canonical).is_none() {
        tracing::debug!("Skipping {}: target not servable", relative.display());
        return None;
    }

    let segments = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;

    Some(CatalogEntry {
        relative_path: segments.join("/"),
        extension,
    })
}
