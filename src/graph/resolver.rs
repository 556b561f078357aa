//! Module specifier resolution for JavaScript/TypeScript imports.
//!
//! Handles:
//! - `./x`, `../x` relative to the importing file's directory
//! - `/x` relative to the project root
//! - path aliases from `compilerOptions.paths` in the root `tsconfig.json`
//!   or `jsconfig.json`; without one, `@/x` and `~/x` map into `src/`
//! - bare package specifiers (`react`, `@scope/pkg`) are not local and
//!   resolve to `None`

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::ingest::SOURCE_EXTENSIONS;
use crate::validation::normalize_lexically;

const INDEX_FILES: &[&str] = &["index.ts", "index.tsx", "index.js", "index.jsx"];

const PROJECT_CONFIGS: &[&str] = &["tsconfig.json", "jsconfig.json"];

/// Prefixes assumed when no project config declares `paths`.
const DEFAULT_ALIAS_PREFIXES: &[&str] = &["@/", "~/"];

/// One `paths` entry: `"@/*": ["./src/*"]` becomes prefix `@/` with target
/// `<root>/src/`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathAlias {
    pattern: String,
    wildcard: bool,
    targets: Vec<PathBuf>,
}

impl PathAlias {
    /// The text after the alias prefix, or `None` when `specifier` does not
    /// match.
    fn matches<'a>(&self, specifier: &'a str) -> Option<&'a str> {
        if self.wildcard {
            specifier.strip_prefix(self.pattern.as_str())
        } else if specifier == self.pattern {
            Some("")
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ProjectConfig {
    #[serde(default)]
    compiler_options: CompilerOptions,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    base_url: Option<String>,
    #[serde(default)]
    paths: BTreeMap<String, Vec<String>>,
}

pub struct ModuleResolver {
    project_root: PathBuf,
    aliases: Vec<PathAlias>,
}

impl ModuleResolver {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            aliases: load_aliases(project_root),
        }
    }

    pub fn aliases(&self) -> &[PathAlias] {
        &self.aliases
    }

    /// True when `specifier` names a project file through an alias.
    pub fn is_aliased(&self, specifier: &str) -> bool {
        self.aliases.iter().any(|a| a.matches(specifier).is_some())
    }

    /// Resolve `specifier` as written in `importer`.
    ///
    /// # Returns
    /// - `None` for bare package specifiers
    /// - The first existing file in resolution order: exact path, path with
    ///   each source extension appended, `.js/.jsx` mapped to `.ts/.tsx`,
    ///   `index.*` inside the path
    /// - Otherwise the lexically normalized path, kept as an unresolved
    ///   local import
    pub fn resolve(&self, importer: &Path, specifier: &str) -> Option<PathBuf> {
        let base = if let Some(rooted) = specifier.strip_prefix('/') {
            self.project_root.join(rooted)
        } else if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
            importer.parent().unwrap_or(&self.project_root).join(specifier)
        } else {
            return self.resolve_alias(specifier);
        };
        let target = normalize_lexically(&base);

        Some(Self::probe(&target).unwrap_or(target))
    }

    /// First alias target that exists on disk; otherwise the first target,
    /// kept as an unresolved local import.
    fn resolve_alias(&self, specifier: &str) -> Option<PathBuf> {
        let (alias, rest) = self
            .aliases
            .iter()
            .find_map(|a| a.matches(specifier).map(|rest| (a, rest)))?;

        let mut first = None;
        for target in &alias.targets {
            let joined = if alias.wildcard {
                normalize_lexically(&target.join(rest))
            } else {
                normalize_lexically(target)
            };
            if let Some(found) = Self::probe(&joined) {
                return Some(found);
            }
            first.get_or_insert(joined);
        }
        first
    }

    fn probe(target: &Path) -> Option<PathBuf> {
        if target.is_file() {
            return Some(target.to_path_buf());
        }

        for ext in SOURCE_EXTENSIONS {
            let candidate = with_appended_extension(target, ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        // ESM-style TypeScript: `import './util.js'` names `util.ts`
        let mapped: &[&str] = match target.extension().and_then(|e| e.to_str()) {
            Some("js") => &["ts", "tsx"],
            Some("jsx") => &["tsx"],
            Some("mjs") => &["mts"],
            Some("cjs") => &["cts"],
            _ => &[],
        };
        for ext in mapped {
            let candidate = target.with_extension(ext);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if target.is_dir() {
            for index in INDEX_FILES {
                let candidate = target.join(index);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        None
    }
}

/// Aliases declared by the first project config with `paths`, longest
/// pattern first. Falls back to `@/` and `~/` pointing at `src/` (or the
/// root when there is no `src/`).
fn load_aliases(project_root: &Path) -> Vec<PathAlias> {
    for name in PROJECT_CONFIGS {
        let path = project_root.join(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(_) => continue,
        };
        let config: ProjectConfig = match serde_json::from_str(&strip_jsonc(&text)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable project config, using default aliases");
                continue;
            }
        };
        let options = config.compiler_options;
        if options.paths.is_empty() {
            continue;
        }
        let base = normalize_lexically(&project_root.join(options.base_url.as_deref().unwrap_or(".")));
        let mut aliases: Vec<PathAlias> = options
            .paths
            .into_iter()
            .map(|(pattern, targets)| {
                let wildcard = pattern.ends_with('*');
                PathAlias {
                    pattern: pattern.trim_end_matches('*').to_string(),
                    wildcard,
                    targets: targets
                        .iter()
                        .map(|t| base.join(t.trim_end_matches('*')))
                        .collect(),
                }
            })
            .collect();
        aliases.sort_by(|a, b| b.pattern.len().cmp(&a.pattern.len()));
        tracing::debug!(config = %path.display(), aliases = aliases.len(), "path aliases loaded");
        return aliases;
    }

    let src = project_root.join("src");
    let target = if src.is_dir() { src } else { project_root.to_path_buf() };
    DEFAULT_ALIAS_PREFIXES
        .iter()
        .map(|prefix| PathAlias {
            pattern: prefix.to_string(),
            wildcard: true,
            targets: vec![target.clone()],
        })
        .collect()
}

/// Drop `//` and `/* */` comments and trailing commas so a tsconfig parses
/// as plain JSON. String contents are left alone.
fn strip_jsonc(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut in_string = false;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            out.push(c);
            if c == '\\' && i + 1 < chars.len() {
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            ',' => {
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    out
}

/// `a/b.config` + `ts` → `a/b.config.ts` (appends, never replaces).
fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup(files: &[&str]) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = fs::canonicalize(temp.path()).unwrap();
        for rel in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        (temp, root)
    }

    #[test]
    fn test_bare_specifiers_are_not_local() {
        let (_t, root) = setup(&[]);
        let resolver = ModuleResolver::new(&root);
        let importer = root.join("src/a.ts");
        assert_eq!(resolver.resolve(&importer, "react"), None);
        assert_eq!(resolver.resolve(&importer, "@scope/pkg"), None);
        assert_eq!(resolver.resolve(&importer, "node:fs"), None);
    }

    #[test]
    fn test_resolution_order() {
        let (_t, root) = setup(&[
            "src/exact",
            "src/util.ts",
            "src/util.js",
            "src/comp.tsx",
            "src/esm.ts",
            "src/widgets/index.tsx",
        ]);
        let resolver = ModuleResolver::new(&root);
        let importer = root.join("src/a.ts");

        assert_eq!(resolver.resolve(&importer, "./exact"), Some(root.join("src/exact")));
        assert_eq!(resolver.resolve(&importer, "./util"), Some(root.join("src/util.ts")));
        assert_eq!(resolver.resolve(&importer, "./comp"), Some(root.join("src/comp.tsx")));
        assert_eq!(resolver.resolve(&importer, "./esm.js"), Some(root.join("src/esm.ts")));
        assert_eq!(
            resolver.resolve(&importer, "./widgets"),
            Some(root.join("src/widgets/index.tsx"))
        );
    }

    #[test]
    fn test_parent_and_rooted_specifiers() {
        let (_t, root) = setup(&["lib/db.js", "src/app/page.tsx"]);
        let resolver = ModuleResolver::new(&root);
        let importer = root.join("src/app/page.tsx");

        assert_eq!(resolver.resolve(&importer, "../../lib/db"), Some(root.join("lib/db.js")));
        assert_eq!(resolver.resolve(&importer, "/lib/db"), Some(root.join("lib/db.js")));
    }

    #[test]
    fn test_unresolved_keeps_normalized_path() {
        let (_t, root) = setup(&[]);
        let resolver = ModuleResolver::new(&root);
        let importer = root.join("src/a/b.ts");
        assert_eq!(
            resolver.resolve(&importer, "./../gone/./x"),
            Some(root.join("src/gone/x"))
        );
    }

    #[test]
    fn test_default_alias_points_into_src() {
        let (_t, root) = setup(&["src/lib/helpers.ts", "src/app/page.tsx"]);
        let resolver = ModuleResolver::new(&root);
        let importer = root.join("src/app/page.tsx");

        assert_eq!(
            resolver.resolve(&importer, "@/lib/helpers"),
            Some(root.join("src/lib/helpers.ts"))
        );
        assert_eq!(
            resolver.resolve(&importer, "~/lib/helpers"),
            Some(root.join("src/lib/helpers.ts"))
        );
        assert!(resolver.is_aliased("@/lib/helpers"));
        assert!(!resolver.is_aliased("@scope/pkg"));
    }

    #[test]
    fn test_tsconfig_paths_with_comments() {
        let (_t, root) = setup(&["app/shared/format.ts", "app/ui/button/index.tsx"]);
        fs::write(
            root.join("tsconfig.json"),
            r##"{
  // editor settings
  "compilerOptions": {
    "baseUrl": ".",
    /* aliases */
    "paths": {
      "#shared/*": ["app/shared/*"],
      "@ui/*": ["app/ui/*",],
      "config": ["app/shared/format.ts"],
    },
  },
}"##,
        )
        .unwrap();
        let resolver = ModuleResolver::new(&root);
        let importer = root.join("app/main.ts");

        assert_eq!(
            resolver.resolve(&importer, "#shared/format"),
            Some(root.join("app/shared/format.ts"))
        );
        assert_eq!(
            resolver.resolve(&importer, "@ui/button"),
            Some(root.join("app/ui/button/index.tsx"))
        );
        assert_eq!(
            resolver.resolve(&importer, "config"),
            Some(root.join("app/shared/format.ts"))
        );
        // declared paths replace the defaults
        assert_eq!(resolver.resolve(&importer, "@/shared/format"), None);
    }

    #[test]
    fn test_strip_jsonc_keeps_strings() {
        let stripped = strip_jsonc(r#"{"a": "http://x/*y*/", "b": [1, 2,], } // end"#);
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["a"], "http://x/*y*/");
        assert_eq!(value["b"], serde_json::json!([1, 2]));
    }

    #[test]
    fn test_appended_extension_keeps_dots() {
        assert_eq!(
            with_appended_extension(Path::new("/p/next.config"), "js"),
            PathBuf::from("/p/next.config.js")
        );
    }
}
