//! Static assets referenced from a tracked Markdown file.

use std::path::{Path, PathBuf};

/// Resolve `rel` against the directory of `markdown`.
///
/// Two readings are tried: relative to that directory, then `/<rel>` as an
/// absolute path (Markdown that links absolute paths). Either must
/// canonicalize to a regular file inside the directory.
pub fn resolve_asset(rel: &str, markdown: &Path) -> Option<PathBuf> {
    let rel = rel.trim_start_matches('/');
    if rel.is_empty() {
        return None;
    }

    // Canonicalize to resolve symlinks and `..`, then confine to the directory
    let root = markdown.parent()?.canonicalize().ok()?;
    let candidates = [root.join(rel), Path::new("/").join(rel)];

    candidates
        .iter()
        .filter_map(|candidate| candidate.canonicalize().ok())
        .find(|canonical| canonical.starts_with(&root) && canonical.is_file())
}
