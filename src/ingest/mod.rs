//! Source ingestion: language detection, parsing and fact extraction.
//!
//! Parsing goes through tree-sitter, but everything downstream of
//! [`parse_source`] sees only the generic [`syntax::SyntaxTree`].

pub mod imports;
pub mod pool;
pub mod syntax;

pub use imports::{extract_module_facts, ModuleFacts};
pub use syntax::{SyntaxKind, SyntaxNode, SyntaxTree};

use std::path::Path;

use crate::error::{QuarantineError, Result};

/// Grammar used to parse a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// `.js .jsx .mjs .cjs` (the JavaScript grammar covers JSX)
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Tsx => "tsx",
        }
    }
}

/// Extensions the Dependency Analyzer parses.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Extensions the Mock/Seed Detector scores (content heuristics only for data files).
pub const DETECTOR_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "json", "sql"];

pub fn detect_language(path: &Path) -> Option<Language> {
    match path.extension()?.to_str()? {
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
        "ts" | "mts" | "cts" => Some(Language::TypeScript),
        "tsx" => Some(Language::Tsx),
        _ => None,
    }
}

pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e))
        .unwrap_or(false)
}

/// Parse source text into a generic syntax tree.
///
/// Syntax errors inside the file are tolerated (the tree carries ERROR nodes);
/// only a grammar failure or a parser that produces no tree is an error.
pub fn parse_source(path: &Path, source: String) -> Result<SyntaxTree> {
    let language = detect_language(path).ok_or_else(|| QuarantineError::Parse {
        path: path.to_path_buf(),
        message: "unsupported file extension".to_string(),
    })?;

    let tree = pool::with_parser(language, |parser| parser.parse(source.as_bytes(), None))
        .map_err(|e| QuarantineError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .ok_or_else(|| QuarantineError::Parse {
            path: path.to_path_buf(),
            message: "parser produced no tree".to_string(),
        })?;

    Ok(SyntaxTree::from_tree_sitter(&tree, source, language))
}

/// Read a file as UTF-8 and parse it.
pub fn parse_file(path: &Path) -> Result<SyntaxTree> {
    let bytes = std::fs::read(path).map_err(|e| QuarantineError::io(path, e))?;
    let source = String::from_utf8(bytes).map_err(|_| QuarantineError::Parse {
        path: path.to_path_buf(),
        message: "file is not valid UTF-8".to_string(),
    })?;
    parse_source(path, source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Path::new("a.ts")), Some(Language::TypeScript));
        assert_eq!(detect_language(Path::new("a.tsx")), Some(Language::Tsx));
        assert_eq!(detect_language(Path::new("a.jsx")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("a.cjs")), Some(Language::JavaScript));
        assert_eq!(detect_language(Path::new("a.json")), None);
        assert_eq!(detect_language(Path::new("Makefile")), None);
    }

    #[test]
    fn test_parse_tolerates_syntax_errors() {
        let tree = parse_source(
            Path::new("broken.ts"),
            "import { a } from './a';\nconst = ;\n".to_string(),
        )
        .unwrap();
        assert!(tree.has_errors());
        let facts = extract_module_facts(&tree);
        assert_eq!(facts.specifiers, vec!["./a".to_string()]);
    }

    #[test]
    fn test_parse_file_rejects_non_utf8() {
        let temp = tempfile::TempDir::new().unwrap();
        let path: PathBuf = temp.path().join("bin.js");
        std::fs::write(&path, [0xff, 0xfe, 0x00, 0x41]).unwrap();
        let err = parse_file(&path).unwrap_err();
        assert!(matches!(err, QuarantineError::Parse { .. }));
    }
}
