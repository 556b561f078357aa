//! Table probes: the verifier's only window onto a database.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use crate::error::{QuarantineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableProbeResult {
    pub exists: bool,
    pub row_count: u64,
}

impl TableProbeResult {
    pub fn missing() -> Self {
        Self {
            exists: false,
            row_count: 0,
        }
    }
}

/// Read-only existence and size checks against some database.
///
/// Implementations must never write.
pub trait TableProbe {
    /// Cheap reachability check; `Err` means the database is unavailable.
    fn ping(&self) -> Result<()>;

    fn probe(&self, table: &str) -> Result<TableProbeResult>;
}

/// Table names are interpolated into `COUNT(*)` (identifiers cannot be
/// bound), so only `[A-Za-z0-9_]` is accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// SQLite database opened read-only.
pub struct SqliteProbe {
    path: PathBuf,
    conn: Connection,
}

impl SqliteProbe {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TableProbe for SqliteProbe {
    fn ping(&self) -> Result<()> {
        self.conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    fn probe(&self, table: &str) -> Result<TableProbeResult> {
        if !is_valid_table_name(table) {
            return Err(QuarantineError::Config(format!("invalid table name {:?}", table)));
        }

        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1 LIMIT 1",
                params![table],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Ok(TableProbeResult::missing());
        }

        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{}\"", table), [], |row| row.get(0))?;
        Ok(TableProbeResult {
            exists: true,
            row_count: count.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture_db(dir: &Path) -> PathBuf {
        let path = dir.join("app.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY);
             CREATE TABLE settings (id INTEGER PRIMARY KEY);
             INSERT INTO users (id) VALUES (1), (2), (3);",
        )
        .unwrap();
        path
    }

    #[test]
    fn test_probe_counts_rows() {
        let temp = TempDir::new().unwrap();
        let probe = SqliteProbe::open(&fixture_db(temp.path())).unwrap();

        probe.ping().unwrap();
        assert_eq!(
            probe.probe("users").unwrap(),
            TableProbeResult {
                exists: true,
                row_count: 3
            }
        );
        assert_eq!(probe.probe("settings").unwrap().row_count, 0);
        assert_eq!(probe.probe("reports").unwrap(), TableProbeResult::missing());
    }

    #[test]
    fn test_probe_rejects_injection() {
        let temp = TempDir::new().unwrap();
        let probe = SqliteProbe::open(&fixture_db(temp.path())).unwrap();
        assert!(probe.probe("users\"; DROP TABLE users; --").is_err());
        assert!(probe.probe("").is_err());
        assert_eq!(probe.probe("users").unwrap().row_count, 3);
    }

    #[test]
    fn test_probe_is_read_only() {
        let temp = TempDir::new().unwrap();
        let probe = SqliteProbe::open(&fixture_db(temp.path())).unwrap();
        assert!(probe.conn.execute("DELETE FROM users", []).is_err());
    }

    #[test]
    fn test_open_missing_database_fails() {
        let temp = TempDir::new().unwrap();
        assert!(SqliteProbe::open(&temp.path().join("absent.db")).is_err());
    }
}
