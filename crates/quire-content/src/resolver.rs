//! Resolution of client-supplied paths to files inside the content root.

use std::fs;
use std::path::{Component, Path, PathBuf};

use soft_canonicalize::soft_canonicalize;

use crate::content_type::allowed_extension_of;
use crate::root::ContentRoot;

/// A file that passed every resolution check.
///
/// Only produced by [`resolve`]; lives for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    path: PathBuf,
    extension: String,
}

impl ResolvedFile {
    /// Canonical absolute path, always inside the content root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lowercased extension without the leading dot.
    pub fn extension(&self) -> &str {
        &self.extension
    }
}

/// Reasons a requested path does not resolve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Malformed input, or a path that leaves the content root.
    #[error("Invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Nothing there, or an extension that is not served.
    #[error("File not found: {path:?}")]
    NotFound { path: String },

    /// A directory or special file.
    #[error("Not a regular file: {path:?}")]
    NotAFile { path: String },
}

/// Resolve `requested` (already URL-decoded) against `root`.
///
/// Parent segments and absolute paths are rejected up front. Everything else
/// is joined onto the root and canonicalized, and the canonical result must
/// still sit under the root, so symlinks cannot be used to escape it.
/// Containment is checked before existence: a path leaving the root is
/// `InvalidPath` whether or not its target exists.
pub fn resolve(root: &ContentRoot, requested: &str) -> Result<ResolvedFile, ResolveError> {
    let invalid = |reason| ResolveError::InvalidPath {
        path: requested.to_string(),
        reason,
    };
    let not_found = || ResolveError::NotFound {
        path: requested.to_string(),
    };

    let relative = relative_components(requested).map_err(invalid)?;

    let joined = root.path().join(&relative);
    let canonical = match soft_canonicalize(&joined) {
        Ok(path) => path,
        Err(e) => {
            tracing::debug!("Cannot canonicalize {}: {}", joined.display(), e);
            return Err(not_found());
        }
    };

    if !root.contains(&canonical) {
        return Err(invalid("resolves outside the content root"));
    }

    let metadata = fs::metadata(&canonical).map_err(|_| not_found())?;
    if !metadata.is_file() {
        return Err(ResolveError::NotAFile {
            path: requested.to_string(),
        });
    }

    // The addressed name and the file it lands on must both be allowed.
    let Some(extension) = allowed_extension_of(&relative) else {
        return Err(not_found());
    };
    if allowed_extension_of(&canonical).is_none() {
        return Err(not_found());
    }

    Ok(ResolvedFile {
        path: canonical,
        extension,
    })
}

/// Split `requested` into plain path segments.
fn relative_components(requested: &str) -> Result<PathBuf, &'static str> {
    if requested.is_empty() {
        return Err("empty path");
    }
    if requested.contains('\0') {
        return Err("contains a NUL byte");
    }

    let mut relative = PathBuf::new();
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir => return Err("contains a parent directory segment"),
            Component::RootDir | Component::Prefix(_) => return Err("absolute path"),
        }
    }

    if relative.as_os_str().is_empty() {
        return Err("empty path");
    }

    Ok(relative)
}
