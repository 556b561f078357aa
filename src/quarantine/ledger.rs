//! Global cleanup ledger (`cleanup-log.json` at the quarantine root).
//!
//! Every update is a read-modify-write under an exclusive advisory lock on
//! `cleanup-log.json.lock`, and the new content replaces the old through a
//! temp file + rename, so concurrent sessions never lose each other's entries.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};

use super::session::{QuarantineSession, SessionStatus};
use crate::error::{QuarantineError, Result};
use crate::lock::write_atomic;

pub const CLEANUP_LOG_FILE: &str = "cleanup-log.json";
const LEDGER_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStats {
    pub sessions: usize,
    pub files_quarantined: usize,
    pub last_run: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupLog {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub sessions: Vec<QuarantineSession>,
    pub total_files_quarantined: usize,
    pub total_size_recovered: u64,
    pub agents: BTreeMap<String, AgentStats>,
}

impl CleanupLog {
    pub fn new() -> Self {
        Self {
            version: LEDGER_VERSION.to_string(),
            created_at: Utc::now(),
            sessions: Vec::new(),
            total_files_quarantined: 0,
            total_size_recovered: 0,
            agents: BTreeMap::new(),
        }
    }

    /// Fold one finished session into the totals.
    pub fn record(&mut self, session: &QuarantineSession) {
        self.total_files_quarantined += session.files_quarantined;
        self.total_size_recovered += session.size_recovered_bytes;

        let stats = self.agents.entry(session.agent.clone()).or_default();
        stats.sessions += 1;
        stats.files_quarantined += session.files_quarantined;
        stats.last_run = Some(session.timestamp);

        self.sessions.push(session.clone());
    }
}

impl Default for CleanupLog {
    fn default() -> Self {
        Self::new()
    }
}

pub fn cleanup_log_path(quarantine_root: &Path) -> PathBuf {
    quarantine_root.join(CLEANUP_LOG_FILE)
}

/// Current ledger, or `None` before the first session.
pub fn read_cleanup_log(quarantine_root: &Path) -> Result<Option<CleanupLog>> {
    let path = cleanup_log_path(quarantine_root);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(QuarantineError::io(&path, e)),
    };
    let log = serde_json::from_str(&content).map_err(|e| QuarantineError::serialization(&path, e))?;
    Ok(Some(log))
}

/// Finalize `session` if it is still running, then append it to the ledger.
pub fn update_cleanup_log(quarantine_root: &Path, session: &mut QuarantineSession) -> Result<CleanupLog> {
    session.finalize(SessionStatus::Completed);

    fs::create_dir_all(quarantine_root).map_err(|e| QuarantineError::io(quarantine_root, e))?;
    let lock_path = quarantine_root.join(format!("{}.lock", CLEANUP_LOG_FILE));
    let lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| QuarantineError::io(&lock_path, e))?;
    lock_file
        .lock_exclusive()
        .map_err(|e| QuarantineError::io(&lock_path, e))?;

    let result = (|| {
        let mut log = read_cleanup_log(quarantine_root)?.unwrap_or_default();
        log.record(session);

        let path = cleanup_log_path(quarantine_root);
        let json = serde_json::to_vec_pretty(&log).map_err(|e| QuarantineError::serialization(&path, e))?;
        write_atomic(&path, &json)?;
        Ok(log)
    })();

    let _ = FileExt::unlock(&lock_file);
    if let Ok(log) = &result {
        tracing::info!(
            sessions = log.sessions.len(),
            total_files = log.total_files_quarantined,
            "cleanup ledger updated"
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarantine::session::{ManifestSummary, SessionManifest};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use tempfile::TempDir;

    fn session(agent: &str, files: usize) -> QuarantineSession {
        let now = Utc::now();
        QuarantineSession {
            id: format!("session_{}_{}", now.timestamp_millis(), agent),
            agent: agent.to_string(),
            timestamp: now,
            duration_ms: 0,
            files_quarantined: files,
            size_recovered_bytes: files as u64 * 10,
            status: SessionStatus::Running,
            quarantine_dir: PathBuf::from("/q"),
            rollback_script: PathBuf::from("/q/rollback.sh"),
            manifest: SessionManifest {
                session_id: "s".into(),
                created_at: now,
                agent: agent.to_string(),
                project_root: None,
                files: Vec::new(),
                usage_map: Default::default(),
                summary: ManifestSummary::default(),
            },
            possible_breaks: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
            dry_run: false,
        }
    }

    #[test]
    fn test_created_on_first_use() {
        let temp = TempDir::new().unwrap();
        assert!(read_cleanup_log(temp.path()).unwrap().is_none());

        let mut s = session("backend", 2);
        let log = update_cleanup_log(temp.path(), &mut s).unwrap();

        assert_eq!(s.status, SessionStatus::Completed);
        assert_eq!(log.version, "1.0.0");
        assert_eq!(log.total_files_quarantined, 2);
        assert_eq!(log.agents["backend"].sessions, 1);
        assert_eq!(read_cleanup_log(temp.path()).unwrap().unwrap(), log);
    }

    #[test]
    fn test_cancelled_status_is_kept() {
        let temp = TempDir::new().unwrap();
        let mut s = session("backend", 0);
        s.finalize(SessionStatus::Cancelled);
        let log = update_cleanup_log(temp.path(), &mut s).unwrap();
        assert_eq!(log.sessions[0].status, SessionStatus::Cancelled);
    }

    #[test]
    fn test_concurrent_updates_are_all_kept() {
        let temp = TempDir::new().unwrap();
        let root = Arc::new(temp.path().to_path_buf());
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = ["backend", "frontend", "shared", "backend"]
            .into_iter()
            .map(|agent| {
                let root = Arc::clone(&root);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let mut s = session(agent, 1);
                    barrier.wait();
                    update_cleanup_log(&root, &mut s).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let log = read_cleanup_log(&root).unwrap().unwrap();
        assert_eq!(log.sessions.len(), 4);
        assert_eq!(log.total_files_quarantined, 4);
        assert_eq!(log.agents["backend"].sessions, 2);
    }
}
