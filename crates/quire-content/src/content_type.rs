//! Extension to MIME type mapping.
//!
//! The table here is also the allowlist: an extension is eligible for
//! serving exactly when it has an entry.

use std::path::Path;

/// MIME type used for anything without a rule. Browsers never execute it.
pub const DEFAULT_MIME: &str = "application/octet-stream";

const RULES: &[(&str, &str)] = &[
    ("mdx", "text/markdown"),
    ("md", "text/markdown"),
    ("markdown", "text/markdown"),
];

/// How a file with a given extension is described to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTypeRule {
    /// Value for the `Content-Type` header
    pub mime: &'static str,

    /// Lowercased extension with a leading dot, e.g. `.mdx` (empty if none)
    pub extension: String,
}

/// Classify an extension. Accepts `mdx` or `.mdx`, any ASCII case.
///
/// Never fails: unknown extensions map to [`DEFAULT_MIME`].
pub fn classify(extension: &str) -> ContentTypeRule {
    let ext = normalize(extension);

    let mime = RULES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_MIME);

    ContentTypeRule {
        mime,
        extension: if ext.is_empty() {
            String::new()
        } else {
            format!(".{}", ext)
        },
    }
}

/// Whether `extension` (with or without a leading dot) may be served.
pub fn is_allowed_extension(extension: &str) -> bool {
    let ext = normalize(extension);
    RULES.iter().any(|(known, _)| *known == ext)
}

/// Extension of `path` if it is on the allowlist, lowercased and without dot.
pub(crate) fn allowed_extension_of(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    is_allowed_extension(ext).then(|| normalize(ext))
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}
