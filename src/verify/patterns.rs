//! Query-shape detection and table reference matching.

use once_cell::sync::Lazy;
use regex::{Regex, RegexSet};

/// Any one of these marks a file as issuing database queries.
static QUERY_PATTERNS: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new([
        r"\.from\(",
        r"\.select\(",
        r"\.insert\(",
        r"\.update\(",
        r"\.delete\(",
        r"supabase",
        r"createClient",
        r"\.query\(",
        r"(?i)\bSELECT\s+",
        r"(?i)\bINSERT\s+INTO\b",
        r"(?i)\bUPDATE\s+",
        r"(?i)\bDELETE\s+FROM\b",
        r"(?i)\bCREATE\s+TABLE\b",
        r"(?i)\bALTER\s+TABLE\b",
        r"(?i)\bDROP\s+TABLE\b",
    ])
    .unwrap()
});

pub fn has_database_queries(content: &str) -> bool {
    QUERY_PATTERNS.is_match(content)
}

/// Matcher for references to one table, by call shape or raw SQL.
pub struct TableReference {
    pattern: Regex,
}

impl TableReference {
    /// `name` must already be a validated `[A-Za-z0-9_]` identifier.
    pub fn new(name: &str) -> Result<Self, regex::Error> {
        let t = regex::escape(name);
        let pattern = Regex::new(&format!(
            r#"\.from\(\s*['"`]{t}['"`]|(?i:\b(?:FROM|INTO|UPDATE|JOIN)\s+["`]?{t}\b)|(?i:\btable_name\s*[:=]\s*['"]{t}['"])"#
        ))?;
        Ok(Self { pattern })
    }

    pub fn is_referenced_in(&self, content: &str) -> bool {
        self.pattern.is_match(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_battery() {
        assert!(has_database_queries("const { data } = await db.from('users').select('*')"));
        assert!(has_database_queries("db.query('select 1')"));
        assert!(has_database_queries("-- migration\nCREATE TABLE logs (id int);"));
        assert!(has_database_queries("import { createClient } from '@supabase/supabase-js'"));
        assert!(!has_database_queries("export const add = (a, b) => a + b;"));
    }

    #[test]
    fn test_table_reference_shapes() {
        let users = TableReference::new("users").unwrap();
        assert!(users.is_referenced_in("supabase.from('users').select()"));
        assert!(users.is_referenced_in("supabase.from(\"users\")"));
        assert!(users.is_referenced_in("SELECT * FROM users WHERE id = 1"));
        assert!(users.is_referenced_in("insert into users values (1)"));
        assert!(users.is_referenced_in("UPDATE users SET name = 'x'"));
        assert!(users.is_referenced_in("a JOIN users u ON u.id = a.user_id"));
        assert!(users.is_referenced_in("{ table_name: 'users' }"));

        assert!(!users.is_referenced_in("SELECT * FROM users_archive"));
        assert!(!users.is_referenced_in("supabase.from('users_archive')"));
        assert!(!users.is_referenced_in("const users = [];"));
    }
}
