//! Project-wide reference search.
//!
//! The dependency graph only covers the scanned scopes. Before a candidate
//! moves, every source file in the project is searched for module
//! specifiers and quoted path literals that name it, so an importer living
//! outside the scope (a page importing `@/lib/helpers` while only `src/lib`
//! is scanned) still keeps the file in place.
//!
//! Matching is textual and tolerant of files tree-sitter cannot parse:
//! - specifiers the resolver pins to an existing file count exactly
//! - bare or aliased specifiers it cannot pin (`lib/helpers`) match any
//!   candidate whose extensionless path ends with them, segment-wise
//! - quoted root-relative literals (`"src/jobs/weekly.ts"`) equal to a
//!   candidate's path, with or without extension, count as well

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;

use super::resolver::ModuleResolver;
use crate::validation::relative_display;

static SPECIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:from|import|require|mock)\s*\(?\s*['"`]([^'"`\s]+)['"`]"#).unwrap()
});

static PATH_LITERAL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"['"`](/?[\w@~-][\w@~.-]*(?:/[\w@~.-]+)+)['"`]"#).unwrap());

/// Every reference found in one file.
#[derive(Debug, Default)]
struct FileReferences {
    resolved: Vec<PathBuf>,
    loose: Vec<String>,
    literals: Vec<String>,
}

/// Who mentions which file, across the whole project.
#[derive(Debug, Default)]
pub struct ReferenceIndex {
    project_root: PathBuf,
    /// Existing target → files whose specifiers resolve to it
    resolved: HashMap<PathBuf, Vec<PathBuf>>,
    /// Specifier tails the resolver could not pin (`lib/helpers`)
    loose: Vec<(String, PathBuf)>,
    /// Root-relative quoted path literals (`src/lib/helpers`)
    literals: HashMap<String, Vec<PathBuf>>,
    files_searched: usize,
}

impl ReferenceIndex {
    /// Search `files` for references. Unreadable files are skipped with a
    /// debug log.
    pub fn build(project_root: &Path, files: &[PathBuf], resolver: &ModuleResolver) -> Self {
        let per_file: Vec<(PathBuf, FileReferences)> = files
            .par_iter()
            .filter_map(|path| match fs::read_to_string(path) {
                Ok(content) => Some((path.clone(), scan(path, &content, resolver))),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "not searched");
                    None
                }
            })
            .collect();

        let mut index = Self {
            project_root: project_root.to_path_buf(),
            files_searched: per_file.len(),
            ..Self::default()
        };
        for (referrer, refs) in per_file {
            for target in refs.resolved {
                index.resolved.entry(target).or_default().push(referrer.clone());
            }
            for tail in refs.loose {
                index.loose.push((tail, referrer.clone()));
            }
            for literal in refs.literals {
                index.literals.entry(literal).or_default().push(referrer.clone());
            }
        }
        tracing::debug!(
            files = index.files_searched,
            targets = index.resolved.len(),
            loose = index.loose.len(),
            "reference index built"
        );
        index
    }

    pub fn files_searched(&self) -> usize {
        self.files_searched
    }

    /// First file other than `target` that references it and is not
    /// excluded by `ignore`, in a stable order.
    pub fn find_referrer(&self, target: &Path, ignore: impl Fn(&Path) -> bool) -> Option<PathBuf> {
        let rel = relative_display(target, &self.project_root);
        let stem = strip_source_extension(&rel);
        // `lib/widgets/index.ts` is also reached as `lib/widgets`
        let dir_stem = stem.strip_suffix("/index").map(str::to_string);

        let mut hits: Vec<&PathBuf> = Vec::new();
        if let Some(referrers) = self.resolved.get(target) {
            hits.extend(referrers);
        }
        for key in [rel.as_str(), stem] {
            if let Some(referrers) = self.literals.get(key) {
                hits.extend(referrers);
            }
        }
        for (tail, referrer) in &self.loose {
            let tail = strip_source_extension(tail);
            if ends_with_segments(stem, tail) || dir_stem.as_deref().is_some_and(|d| ends_with_segments(d, tail)) {
                hits.push(referrer);
            }
        }

        hits.into_iter()
            .filter(|r| r.as_path() != target && !ignore(r))
            .min()
            .cloned()
    }
}

fn scan(path: &Path, content: &str, resolver: &ModuleResolver) -> FileReferences {
    let mut refs = FileReferences::default();

    for caps in SPECIFIER_PATTERN.captures_iter(content) {
        let specifier = &caps[1];
        match resolver.resolve(path, specifier) {
            Some(resolved) if resolved.is_file() => refs.resolved.push(resolved),
            Some(_) if !resolver.is_aliased(specifier) => {}
            _ => {
                let tail = specifier
                    .trim_start_matches("@/")
                    .trim_start_matches("~/")
                    .trim_start_matches('/');
                // a lone package name (`react`) cannot name a project file
                if tail.contains('/') {
                    refs.loose.push(tail.to_string());
                }
            }
        }
    }

    for caps in PATH_LITERAL_PATTERN.captures_iter(content) {
        refs.literals.push(caps[1].trim_start_matches('/').to_string());
    }

    refs
}

fn strip_source_extension(path: &str) -> &str {
    for ext in [".tsx", ".ts", ".jsx", ".js", ".mjs", ".cjs"] {
        if let Some(stripped) = path.strip_suffix(ext) {
            return stripped;
        }
    }
    path
}

/// `src/lib/helpers` ends with `lib/helpers` but not with `b/helpers`.
fn ends_with_segments(path: &str, tail: &str) -> bool {
    if tail.is_empty() {
        return false;
    }
    path == tail
        || path
            .strip_suffix(tail)
            .is_some_and(|head| head.ends_with('/'))
}
