//! Path validation and normalization.
//!
//! Every file the quarantine manager moves or restores goes through
//! [`validate_path_within_root`] first; nothing outside the project root is
//! ever touched.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    /// Path cannot be canonicalized (doesn't exist or permission denied)
    #[error("cannot canonicalize path: {0}")]
    CannotCanonicalize(String),

    /// Resolved path escapes the project root
    #[error("path escapes project root: {0} (root: {1})")]
    OutsideRoot(String, String),

    /// Path contains parent traversal that would leave the root
    #[error("path contains suspicious traversal patterns: {0}")]
    SuspiciousTraversal(String),
}

/// Canonicalize a path, resolving symlinks, `.` and `..`.
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, PathValidationError> {
    std::fs::canonicalize(path)
        .map_err(|_| PathValidationError::CannotCanonicalize(path.to_string_lossy().to_string()))
}

/// Validate that an existing path lives under `root`.
///
/// Returns the canonical path on success. Relative paths are interpreted
/// against `root`.
pub fn validate_path_within_root(path: &Path, root: &Path) -> Result<PathBuf, PathValidationError> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let path_str = path.to_string_lossy();
        if has_suspicious_traversal(&path_str) {
            return Err(PathValidationError::SuspiciousTraversal(path_str.to_string()));
        }
        root.join(path)
    };

    let canonical_path = canonicalize_path(&joined)?;
    let canonical_root = canonicalize_path(root)?;

    if !canonical_path.starts_with(&canonical_root) {
        return Err(PathValidationError::OutsideRoot(
            canonical_path.to_string_lossy().to_string(),
            canonical_root.to_string_lossy().to_string(),
        ));
    }

    Ok(canonical_path)
}

/// True when a relative path climbs above its starting directory.
///
/// `a/../b` stays inside; `../x` and `a/../../x` do not.
pub fn has_suspicious_traversal(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let mut depth: i32 = 0;
    for part in normalized.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => depth += 1,
        }
    }
    false
}

/// Lexically normalize a path without touching the filesystem.
///
/// Removes `.` components and folds `..` into the preceding component. A
/// leading `..` on a relative path is kept; on an absolute path it is dropped
/// at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = match out.components().next_back() {
                    Some(Component::Normal(_)) => out.pop(),
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => true,
                    _ => false,
                };
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path relative to `root` with forward slashes, or the full path when it
/// does not live under `root`.
pub fn relative_display(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.to_string_lossy().into_owned())
}

/// Lowercased root-relative path with a leading `/` (`/src/lib/db.ts`).
///
/// Path keyword heuristics match against this form so that the name of the
/// directory holding the project never influences classification.
pub fn heuristic_path(path: &Path, root: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(rel) => format!("/{}", rel.to_string_lossy().replace('\\', "/").to_lowercase()),
        Err(_) => path.to_string_lossy().replace('\\', "/").to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_validate_inside_root() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/a.ts"), "export {}").unwrap();

        let ok = validate_path_within_root(&temp.path().join("src/a.ts"), temp.path()).unwrap();
        assert!(ok.ends_with("src/a.ts"));

        let rel = validate_path_within_root(Path::new("src/a.ts"), temp.path()).unwrap();
        assert_eq!(ok, rel);
    }

    #[test]
    fn test_validate_rejects_outside_root() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join("project");
        fs::create_dir_all(&root).unwrap();
        fs::write(outer.path().join("secret.ts"), "x").unwrap();

        let err = validate_path_within_root(&outer.path().join("secret.ts"), &root).unwrap_err();
        assert!(matches!(err, PathValidationError::OutsideRoot(_, _)));

        let err = validate_path_within_root(Path::new("../secret.ts"), &root).unwrap_err();
        assert!(matches!(err, PathValidationError::SuspiciousTraversal(_)));
    }

    #[test]
    fn test_suspicious_traversal() {
        assert!(!has_suspicious_traversal("src/lib/a.ts"));
        assert!(!has_suspicious_traversal("src/../lib/a.ts"));
        assert!(has_suspicious_traversal("../a.ts"));
        assert!(has_suspicious_traversal("src/../../a.ts"));
        assert!(has_suspicious_traversal("..\\..\\a.ts"));
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/p/src/lib/../utils/./x.ts")),
            PathBuf::from("/p/src/utils/x.ts")
        );
        assert_eq!(normalize_lexically(Path::new("/../x")), PathBuf::from("/x"));
        assert_eq!(normalize_lexically(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_relative_display() {
        assert_eq!(
            relative_display(Path::new("/p/src/a.ts"), Path::new("/p")),
            "src/a.ts"
        );
        assert_eq!(relative_display(Path::new("/q/a.ts"), Path::new("/p")), "/q/a.ts");
    }

    #[test]
    fn test_heuristic_path() {
        let root = Path::new("/home/me/test-project");
        assert_eq!(
            heuristic_path(Path::new("/home/me/test-project/src/Lib/DB.ts"), root),
            "/src/lib/db.ts"
        );
        assert_eq!(heuristic_path(Path::new("/elsewhere/A.ts"), root), "/elsewhere/a.ts");
    }
}
