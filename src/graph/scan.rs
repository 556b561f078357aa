//! Scope discovery.
//!
//! Walks each scope directory under the project root and collects every file
//! the [`FileFilter`] accepts. Ignored directories are pruned before the walk
//! descends into them, so `node_modules/` costs one `readdir`, not thousands.

use std::path::{Path, PathBuf};

use super::filter::{skip_diagnostic, FileFilter};
use crate::diagnostics::{ScanDiagnostic, SkipReason};
use crate::validation::{has_suspicious_traversal, normalize_lexically};

/// Result of a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Accepted files, absolute, sorted and deduplicated
    pub files: Vec<PathBuf>,
    /// Visited files that were rejected, sorted
    pub diagnostics: Vec<ScanDiagnostic>,
}

/// Discover files under `scopes` (root-relative directories) with one of
/// `extensions`.
///
/// # Guarantees
/// - Missing scopes are skipped (debug-logged), never an error
/// - Scopes that climb above the project root are ignored
/// - Output is sorted for determinism; overlapping scopes do not duplicate
pub fn discover(filter: &FileFilter, scopes: &[PathBuf], extensions: &[&str]) -> Discovery {
    let root = filter.root();
    let mut files: Vec<PathBuf> = Vec::new();
    let mut diagnostics: Vec<ScanDiagnostic> = Vec::new();

    for scope in scopes {
        let Some(dir) = scope_dir(root, scope) else {
            tracing::warn!(scope = %scope.display(), "scope escapes project root, ignoring");
            continue;
        };
        if !dir.is_dir() {
            tracing::debug!(scope = %scope.display(), "scope directory missing, skipping");
            continue;
        }

        let walker = walkdir::WalkDir::new(&dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                // never prune the scope itself, even if it looks like an ignored name
                entry.depth() == 0 || !entry.file_type().is_dir() || !filter.is_ignored_dir(entry.path())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read directory entry");
                    continue;
                }
            };
            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            match filter.should_skip(path, extensions) {
                None => files.push(path.to_path_buf()),
                Some(reason) => {
                    if reason != SkipReason::UnsupportedExtension {
                        tracing::debug!(path = %path.display(), %reason, "skipping file");
                    }
                    diagnostics.push(skip_diagnostic(root, path, reason));
                }
            }
        }
    }

    files.sort();
    files.dedup();
    diagnostics.sort();
    diagnostics.dedup();

    Discovery { files, diagnostics }
}

fn scope_dir(root: &Path, scope: &Path) -> Option<PathBuf> {
    if scope.is_absolute() {
        let scope = normalize_lexically(scope);
        return scope.starts_with(root).then_some(scope);
    }
    if has_suspicious_traversal(&scope.to_string_lossy()) {
        return None;
    }
    Some(normalize_lexically(&root.join(scope)))
}
