//! Thread-local parser pool for reusing tree-sitter Parser instances.
//!
//! Analysis parses files on rayon worker threads. Each thread lazily creates
//! one parser per grammar and reuses it for every file it handles, so there
//! is no lock contention and no per-file parser allocation.

use std::cell::RefCell;
use std::thread::LocalKey;

use tree_sitter::{LanguageError, Parser};

use super::Language;

thread_local! {
    static JAVASCRIPT_PARSER: RefCell<Option<Parser>> = RefCell::new(None);
    static TYPESCRIPT_PARSER: RefCell<Option<Parser>> = RefCell::new(None);
    static TSX_PARSER: RefCell<Option<Parser>> = RefCell::new(None);
}

fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::JavaScript => tree_sitter_javascript::language(),
        Language::TypeScript => tree_sitter_typescript::language_typescript(),
        Language::Tsx => tree_sitter_typescript::language_tsx(),
    }
}

fn slot(language: Language) -> &'static LocalKey<RefCell<Option<Parser>>> {
    match language {
        Language::JavaScript => &JAVASCRIPT_PARSER,
        Language::TypeScript => &TYPESCRIPT_PARSER,
        Language::Tsx => &TSX_PARSER,
    }
}

/// Run `f` with this thread's parser for `language`, creating it on first use.
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R, LanguageError>
where
    F: FnOnce(&mut Parser) -> R,
{
    slot(language).with(|cell| {
        let mut cached = cell.borrow_mut();
        let mut parser = match cached.take() {
            Some(parser) => parser,
            None => {
                let mut parser = Parser::new();
                parser.set_language(&grammar(language))?;
                parser
            }
        };
        let result = f(&mut parser);
        *cached = Some(parser);
        Ok(result)
    })
}

/// Initialize every parser on the calling thread.
pub fn warmup_parsers() -> Result<(), LanguageError> {
    let samples: [(Language, &[u8]); 3] = [
        (Language::JavaScript, b"export function f() {}"),
        (Language::TypeScript, b"export function f(): void {}"),
        (Language::Tsx, b"export const A = () => <div />;"),
    ];
    for (language, source) in samples {
        with_parser(language, |parser| {
            parser.parse(source, None);
        })?;
    }
    Ok(())
}
