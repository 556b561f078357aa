//! File filtering for gitignore-style rules and include/exclude globs.
//!
//! Provides deterministic file filtering with the following precedence:
//! 1. Not a regular file
//! 2. Hard internal ignores (node_modules/, .git/, build output, quarantine area)
//! 3. Gitignore-style rules (.gitignore, .ignore)
//! 4. Extension not handled by the caller
//! 5. Include patterns (if any provided)
//! 6. Exclude patterns
//!
//! All filtering is pure function: same inputs always produce same output.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Component, Path, PathBuf};

use crate::diagnostics::{ScanDiagnostic, SkipReason};
use crate::error::{QuarantineError, Result};
use crate::ingest::has_extension;
use crate::validation::relative_display;

/// Directories that are never scanned, wherever they appear.
pub const INTERNAL_IGNORE_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    ".next",
    "dist",
    "build",
    "coverage",
    ".shared_quarantine",
];

pub struct FileFilter {
    root: PathBuf,
    gitignore: Gitignore,
    include_patterns: Vec<globset::GlobMatcher>,
    exclude_patterns: Vec<globset::GlobMatcher>,
    /// Absolute directories ignored in addition to the named ones
    ignored_dirs: Vec<PathBuf>,
}

impl FileFilter {
    /// Create a filter for `root`. Globs are matched against root-relative
    /// paths with `/` separators; an empty include list includes everything.
    pub fn new(root: &Path, include_patterns: &[String], exclude_patterns: &[String]) -> Result<Self> {
        let root = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        let gitignore = Self::load_gitignore(&root)?;
        let include_patterns = Self::compile_globs(include_patterns)?;
        let exclude_patterns = Self::compile_globs(exclude_patterns)?;

        Ok(Self {
            root,
            gitignore,
            include_patterns,
            exclude_patterns,
            ignored_dirs: Vec::new(),
        })
    }

    /// Also ignore everything under `dir` (the quarantine root, typically).
    pub fn with_ignored_dir(mut self, dir: &Path) -> Self {
        let dir = std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        self.ignored_dirs.push(dir);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_gitignore(root: &Path) -> Result<Gitignore> {
        let mut builder = GitignoreBuilder::new(root);
        for name in [".gitignore", ".ignore"] {
            let path = root.join(name);
            if path.exists() {
                // malformed ignore files degrade to "no rules", not a failed run
                if let Some(err) = builder.add(&path) {
                    tracing::warn!(path = %path.display(), error = %err, "failed to load ignore file");
                }
            }
        }
        builder
            .build()
            .map_err(|e| QuarantineError::Config(format!("ignore rules: {}", e)))
    }

    fn compile_globs(patterns: &[String]) -> Result<Vec<globset::GlobMatcher>> {
        patterns
            .iter()
            .map(|pattern| {
                globset::Glob::new(pattern)
                    .map(|g| g.compile_matcher())
                    .map_err(|e| {
                        QuarantineError::Config(format!("invalid glob pattern '{}': {}", pattern, e))
                    })
            })
            .collect()
    }

    /// Check if a path should be skipped, returning the reason if so.
    pub fn should_skip(&self, path: &Path, extensions: &[&str]) -> Option<SkipReason> {
        let is_file = std::fs::symlink_metadata(path)
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Some(SkipReason::NotAFile);
        }

        if self.is_internal_ignore(path) {
            return Some(SkipReason::IgnoredInternal);
        }

        if self.is_gitignored(path, false) {
            return Some(SkipReason::IgnoredByGitignore);
        }

        if !has_extension(path, extensions) {
            return Some(SkipReason::UnsupportedExtension);
        }

        let rel_path = relative_display(path, &self.root);
        if !self.include_patterns.is_empty()
            && !self.include_patterns.iter().any(|m| m.is_match(&rel_path))
        {
            return Some(SkipReason::ExcludedByGlob);
        }
        if self.exclude_patterns.iter().any(|m| m.is_match(&rel_path)) {
            return Some(SkipReason::ExcludedByGlob);
        }

        None
    }

    /// Directory-level check used to prune the walk before descending.
    pub fn is_ignored_dir(&self, dir: &Path) -> bool {
        self.is_internal_ignore(dir) || self.is_gitignored(dir, true)
    }

    fn is_internal_ignore(&self, path: &Path) -> bool {
        if self.ignored_dirs.iter().any(|d| path.starts_with(d)) {
            return true;
        }

        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components().any(|c| match c {
            Component::Normal(name) => INTERNAL_IGNORE_DIRS.contains(&name.to_string_lossy().as_ref()),
            _ => false,
        })
    }

    fn is_gitignored(&self, path: &Path, is_dir: bool) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        if rel.as_os_str().is_empty() {
            return false;
        }
        // `build/` style rules match the directory, not the files below it
        self.gitignore
            .matched_path_or_any_parents(rel, is_dir)
            .is_ignore()
    }
}

/// Create a diagnostic for a skipped file.
pub fn skip_diagnostic(root: &Path, path: &Path, reason: SkipReason) -> ScanDiagnostic {
    ScanDiagnostic::skipped(relative_display(path, root), reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{DETECTOR_EXTENSIONS, SOURCE_EXTENSIONS};
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_internal_ignore_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let filter = FileFilter::new(root, &[], &[]).unwrap();

        for rel in [
            "node_modules/react/index.js",
            ".git/hooks/pre-commit.js",
            ".next/server/page.js",
            "dist/bundle.js",
            "src/build/out.js",
            "coverage/lcov.js",
            ".shared_quarantine/backend/x.ts",
        ] {
            let path = write(root, rel, "x");
            assert_eq!(
                filter.should_skip(&path, SOURCE_EXTENSIONS),
                Some(SkipReason::IgnoredInternal),
                "{}",
                rel
            );
        }
    }

    #[test]
    fn test_configured_quarantine_dir_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let root = fs::canonicalize(temp_dir.path()).unwrap();
        let q = root.join("quarantine");
        let path = write(&root, "quarantine/backend/old.ts", "x");

        let filter = FileFilter::new(&root, &[], &[]).unwrap().with_ignored_dir(&q);
        assert_eq!(
            filter.should_skip(&path, SOURCE_EXTENSIONS),
            Some(SkipReason::IgnoredInternal)
        );
        assert!(filter.is_ignored_dir(&q));
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let filter = FileFilter::new(root, &[], &[]).unwrap();

        let readme = write(root, "README.md", "# hi");
        let data = write(root, "data.json", "{}");
        assert_eq!(
            filter.should_skip(&readme, DETECTOR_EXTENSIONS),
            Some(SkipReason::UnsupportedExtension)
        );
        assert_eq!(
            filter.should_skip(&data, SOURCE_EXTENSIONS),
            Some(SkipReason::UnsupportedExtension)
        );
        assert_eq!(filter.should_skip(&data, DETECTOR_EXTENSIONS), None);
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("src")).unwrap();
        let filter = FileFilter::new(root, &[], &[]).unwrap();
        assert_eq!(
            filter.should_skip(&root.join("src"), SOURCE_EXTENSIONS),
            Some(SkipReason::NotAFile)
        );
    }

    #[test]
    fn test_gitignore_filtering() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::write(root.join(".gitignore"), "ignored.ts\ngenerated/\n").unwrap();
        let ignored = write(root, "ignored.ts", "x");
        let included = write(root, "included.ts", "x");
        let nested = write(root, "generated/client.ts", "x");

        let filter = FileFilter::new(root, &[], &[]).unwrap();

        assert_eq!(
            filter.should_skip(&ignored, SOURCE_EXTENSIONS),
            Some(SkipReason::IgnoredByGitignore)
        );
        assert_eq!(filter.should_skip(&included, SOURCE_EXTENSIONS), None);
        assert_eq!(
            filter.should_skip(&nested, SOURCE_EXTENSIONS),
            Some(SkipReason::IgnoredByGitignore)
        );
    }

    #[test]
    fn test_include_and_exclude_patterns() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let lib = write(root, "src/lib.ts", "x");
        let story = write(root, "src/button.stories.tsx", "x");
        let script = write(root, "scripts/deploy.js", "x");

        let filter = FileFilter::new(
            root,
            &["src/**".to_string()],
            &["**/*.stories.tsx".to_string()],
        )
        .unwrap();

        assert_eq!(filter.should_skip(&lib, SOURCE_EXTENSIONS), None);
        assert_eq!(
            filter.should_skip(&story, SOURCE_EXTENSIONS),
            Some(SkipReason::ExcludedByGlob)
        );
        assert_eq!(
            filter.should_skip(&script, SOURCE_EXTENSIONS),
            Some(SkipReason::ExcludedByGlob)
        );
    }

    #[test]
    fn test_invalid_glob_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = FileFilter::new(temp_dir.path(), &["src/[".to_string()], &[])
            .err()
            .unwrap();
        assert!(matches!(err, QuarantineError::Config(_)));
    }

    #[test]
    fn test_skip_diagnostic() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let diagnostic = skip_diagnostic(
            root,
            &root.join("node_modules/x.js"),
            SkipReason::IgnoredInternal,
        );
        assert_eq!(diagnostic.path(), "node_modules/x.js");
    }
}
