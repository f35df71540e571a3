//! The sandbox directory all content is served from.

use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::{self, CatalogEntry};
use crate::resolver::{self, ResolveError, ResolvedFile};

/// Canonical, absolute directory that every served file must descend from.
///
/// Fixed for the lifetime of the value; cloning is cheap enough to hand one
/// to each blocking task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRoot {
    path: PathBuf,
}

/// Errors opening a content root.
#[derive(Debug, thiserror::Error)]
pub enum ContentRootError {
    #[error("Content root not found: {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Content root is not a directory: {0}")]
    NotADirectory(PathBuf),
}

impl ContentRoot {
    /// Canonicalize `path` and check that it is a directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContentRootError> {
        let path = path.as_ref();

        let canonical = fs::canonicalize(path).map_err(|source| ContentRootError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;

        if !canonical.is_dir() {
            return Err(ContentRootError::NotADirectory(canonical));
        }

        Ok(Self { path: canonical })
    }

    /// The canonical root path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an already canonicalized path lies at or below the root.
    ///
    /// Compares whole components, so `/docs-private` is not inside `/docs`.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.path)
    }

    /// See [`resolver::resolve`].
    pub fn resolve(&self, requested: &str) -> Result<ResolvedFile, ResolveError> {
        resolver::resolve(self, requested)
    }

    /// See [`catalog::list_files`].
    pub fn list_files(&self) -> Vec<CatalogEntry> {
        catalog::list_files(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn opens_existing_directory() {
        let temp = tempdir().unwrap();
        let root = ContentRoot::open(temp.path()).unwrap();

        assert!(root.path().is_absolute());
        assert_eq!(root.path(), fs::canonicalize(temp.path()).unwrap());
    }

    #[test]
    fn rejects_missing_directory() {
        let temp = tempdir().unwrap();
        let result = ContentRoot::open(temp.path().join("nope"));

        assert!(matches!(result, Err(ContentRootError::NotFound { .. })));
    }

    #[test]
    fn rejects_file_as_root() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("index.mdx");
        fs::write(&file, "# Hi").unwrap();

        let result = ContentRoot::open(&file);

        assert!(matches!(result, Err(ContentRootError::NotADirectory(_))));
    }

    #[test]
    fn containment_is_component_wise() {
        let temp = tempdir().unwrap();
        fs::create_dir(temp.path().join("docs")).unwrap();
        let root = ContentRoot::open(temp.path().join("docs")).unwrap();

        assert!(root.contains(&root.path().join("pages/a.mdx")));
        assert!(root.contains(root.path()));

        let sibling = root.path().with_file_name("docs-private").join("a.mdx");
        assert!(!root.contains(&sibling));
    }
}
