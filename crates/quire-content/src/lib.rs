//! Sandboxed access to a directory of Markdown/MDX documentation sources.
//!
//! This crate owns the filesystem side of the content server: it pins a
//! [`ContentRoot`], resolves untrusted request paths to files underneath it,
//! classifies those files by extension, and enumerates the eligible ones.
//! Resolution and cataloguing are separate read paths that share only the
//! extension table in [`content_type`].

pub mod catalog;
pub mod content_type;
pub mod resolver;
pub mod root;

pub use catalog::{list_files, scan, CatalogEntry, CatalogError};
pub use content_type::{classify, is_allowed_extension, ContentTypeRule, DEFAULT_MIME};
pub use resolver::{resolve, ResolveError, ResolvedFile};
pub use root::{ContentRoot, ContentRootError};
