//! Name, path and content patterns for the Mock/Seed Detector.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::candidate::Category;

/// Keyword at the start of a file name or after a `.`, `_` or `-`, with a
/// source extension: `seed-users.ts`, `format.test.tsx`, `old_widget.js`.
pub static FILE_NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[._-])(?:test|spec|seed|mock|fixture|sample|demo|temp|backup|old)[^/]*\.(?:ts|tsx|js|jsx|mjs|cjs)$",
    )
    .unwrap()
});

pub const DIRECTORY_NAMES: &[&str] = &[
    "test",
    "tests",
    "spec",
    "specs",
    "seed",
    "seeds",
    "mock",
    "mocks",
    "__mocks__",
    "__tests__",
    "fixture",
    "fixtures",
    "sample",
    "samples",
    "demo",
    "demos",
    "temp",
    "temporary",
    "backup",
    "old",
];

pub const FILE_NAME_KEYWORDS: &[&str] = &[
    "mock",
    "seed",
    "fixture",
    "sample",
    "test-data",
    "test",
    "demo",
    "dummy",
    "fake",
    "stub",
    "temp",
    "temporary",
    "backup",
    "old",
];

/// Counted case-insensitively in file content.
pub const CONTENT_KEYWORDS: &[&str] = &[
    "mock",
    "seed",
    "fixture",
    "sample",
    "test-data",
    "demo",
    "dummy",
    "fake",
    "stub",
    "placeholder",
    "temporary",
    "todo:",
    "fixme:",
    "hack:",
    "console.log",
    "console.warn",
    "console.error",
    "debugger",
];

/// `describe(`, `it.only(`, `test.each(`, lifecycle hooks; not `regex.test(`.
pub static SUITE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^.\w$])(?:(?:describe|it|test)(?:\.(?:only|skip|each|todo))?|beforeEach|afterEach|beforeAll|afterAll)\s*\(",
    )
    .unwrap()
});

pub static ASSERTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|[^.\w$])(?:expect|assert)\s*\(|(?:^|[^.\w$])assert\.\w+\s*\(").unwrap()
});

pub static MOCK_CALL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:jest|vi)\.(?:mock|fn|spyOn)\b|\bsinon\.(?:stub|spy)\b|\bmock(?:Implementation|ReturnValue|ResolvedValue)(?:Once)?\b",
    )
    .unwrap()
});

pub static SEED_SHAPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:^|[^.\w$])seed\s*\(|\.(?:insert|upsert)\s*\(|(?i:\binsert\s+into\b)|(?i:\b(?:seed|fixture|sample)\w*?[_ -]?data\b)",
    )
    .unwrap()
});

/// Category implied by a file name (`format.test.ts` → test).
pub fn category_from_name(name: &str) -> Category {
    let lower = name.to_lowercase();
    first_category(|k| lower.contains(k))
}

/// Category implied by the first matching directory segment.
pub fn category_from_directories<'a>(segments: impl Iterator<Item = &'a str>) -> Category {
    for segment in segments {
        let category = match segment.trim_matches('_') {
            "test" | "tests" | "spec" | "specs" => Category::Test,
            "seed" | "seeds" => Category::Seed,
            "mock" | "mocks" => Category::Mock,
            "fixture" | "fixtures" => Category::Fixture,
            "sample" | "samples" => Category::Sample,
            "demo" | "demos" => Category::Demo,
            _ => continue,
        };
        return category;
    }
    Category::Unknown
}

pub fn category_from_keywords(keywords: &[&str]) -> Category {
    first_category(|k| keywords.iter().any(|kw| kw.contains(k)))
}

fn first_category(matches: impl Fn(&str) -> bool) -> Category {
    if matches("test") || matches("spec") {
        Category::Test
    } else if matches("seed") {
        Category::Seed
    } else if matches("mock") {
        Category::Mock
    } else if matches("fixture") {
        Category::Fixture
    } else if matches("sample") {
        Category::Sample
    } else if matches("demo") {
        Category::Demo
    } else {
        Category::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_pattern() {
        for name in [
            "format.test.ts",
            "seed-users.js",
            "mockClient.tsx",
            "old_widget.jsx",
            "Button.spec.tsx",
            "backup.mjs",
        ] {
            assert!(FILE_NAME_PATTERN.is_match(name), "{}", name);
        }
        for name in ["folder.ts", "latest.js", "seed.json", "attempt.ts", "contest.ts"] {
            assert!(!FILE_NAME_PATTERN.is_match(name), "{}", name);
        }
    }

    #[test]
    fn test_suite_pattern_ignores_method_calls() {
        assert!(SUITE_PATTERN.is_match("describe('x', () => {})"));
        assert!(SUITE_PATTERN.is_match("  it.only('works', fn)"));
        assert!(SUITE_PATTERN.is_match("beforeEach(() => reset())"));
        assert!(!SUITE_PATTERN.is_match("if (/x/.test(value)) {}"));
        assert!(!SUITE_PATTERN.is_match("submit(form)"));
    }

    #[test]
    fn test_assertion_and_mock_patterns() {
        assert!(ASSERTION_PATTERN.is_match("expect(total).toBe(3);"));
        assert!(ASSERTION_PATTERN.is_match("assert.equal(a, b);"));
        assert!(!ASSERTION_PATTERN.is_match("this.expect(x)"));
        assert!(MOCK_CALL_PATTERN.is_match("jest.mock('./db');"));
        assert!(MOCK_CALL_PATTERN.is_match("fetch.mockResolvedValueOnce(res)"));
        assert!(!MOCK_CALL_PATTERN.is_match("const mockup = 1;"));
    }

    #[test]
    fn test_seed_shape_pattern() {
        assert!(SEED_SHAPE_PATTERN.is_match("await db.from('users').insert(rows)"));
        assert!(SEED_SHAPE_PATTERN.is_match("insert into users values (1)"));
        assert!(SEED_SHAPE_PATTERN.is_match("const seedData = []"));
        assert!(SEED_SHAPE_PATTERN.is_match("export const sample_data = {}"));
        assert!(!SEED_SHAPE_PATTERN.is_match("const data = load();"));
    }

    #[test]
    fn test_categories() {
        assert_eq!(category_from_name("user.spec.ts"), Category::Test);
        assert_eq!(category_from_name("seed-users.ts"), Category::Seed);
        assert_eq!(category_from_name("backup.ts"), Category::Unknown);
        assert_eq!(
            category_from_directories(["src", "__mocks__"].into_iter()),
            Category::Mock
        );
        assert_eq!(category_from_keywords(&["fake", "demo"]), Category::Demo);
    }
}
