//! Cross-process lock on a quarantine root.
//!
//! The lock is a single file `<root>/.lock` containing `agent_id:timestamp:pid`
//! (timestamp in unix milliseconds). All read-modify-write cycles on it happen
//! under an exclusive advisory lock on the sidecar `<root>/.lock.guard`, so two
//! processes racing for an absent lock cannot both win.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{QuarantineError, Result};

pub const LOCK_FILE_NAME: &str = ".lock";
const GUARD_FILE_NAME: &str = ".lock.guard";

/// Default age after which a lock may be taken over.
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockStatus {
    Active,
    Stale,
}

/// Parsed lock file content. `status` is derived at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub agent_id: String,
    pub timestamp: i64,
    pub pid: u32,
    pub status: LockStatus,
}

/// Outcome of an acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockAttempt {
    Acquired,
    /// We already owned it; timestamp refreshed
    Refreshed,
    /// A stale lock from another owner was replaced
    TookOver(LockInfo),
    /// A live lock belongs to someone else; file untouched
    Held(LockInfo),
}

impl LockAttempt {
    pub fn is_acquired(&self) -> bool {
        !matches!(self, LockAttempt::Held(_))
    }
}

#[derive(Debug, Clone)]
pub struct LockManager {
    root: PathBuf,
    agent_id: String,
    pid: u32,
    stale_after: Duration,
}

impl LockManager {
    pub fn new(root: &Path, agent_id: &str, stale_after: Duration) -> Result<Self> {
        validate_agent_id(agent_id)?;
        Ok(Self {
            root: root.to_path_buf(),
            agent_id: agent_id.to_string(),
            pid: std::process::id(),
            stale_after,
        })
    }

    /// Override the owner pid (used to model another process in tests).
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE_NAME)
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Try to take the lock. `Ok(false)` means another live run owns it.
    pub fn acquire_lock(&self) -> Result<bool> {
        Ok(self.try_acquire()?.is_acquired())
    }

    pub fn try_acquire(&self) -> Result<LockAttempt> {
        fs::create_dir_all(&self.root).map_err(|e| QuarantineError::io(&self.root, e))?;
        self.with_guard(|| {
            let existing = match self.read_lock()? {
                None => {
                    self.write_lock()?;
                    return Ok(LockAttempt::Acquired);
                }
                Some(info) => info,
            };

            if existing.agent_id == self.agent_id && existing.pid == self.pid {
                self.write_lock()?;
                return Ok(LockAttempt::Refreshed);
            }

            if existing.status == LockStatus::Stale {
                tracing::warn!(
                    owner = %existing.agent_id,
                    pid = existing.pid,
                    age_ms = now_millis() - existing.timestamp,
                    "taking over stale quarantine lock"
                );
                self.write_lock()?;
                return Ok(LockAttempt::TookOver(existing));
            }

            Ok(LockAttempt::Held(existing))
        })
    }

    /// Acquire and wrap in a guard that releases on drop.
    pub fn acquire_guard(&self) -> Result<LockGuard> {
        match self.try_acquire()? {
            LockAttempt::Held(info) => Err(QuarantineError::LockHeld {
                agent_id: info.agent_id,
                pid: info.pid,
            }),
            _ => Ok(LockGuard {
                manager: self.clone(),
                released: false,
            }),
        }
    }

    /// Delete the lock if this manager owns it. Returns whether it deleted.
    pub fn release_lock(&self) -> Result<bool> {
        if !self.root.exists() {
            return Ok(false);
        }
        self.with_guard(|| match self.read_lock()? {
            Some(info) if info.agent_id == self.agent_id && info.pid == self.pid => {
                let path = self.lock_path();
                fs::remove_file(&path).map_err(|e| QuarantineError::io(&path, e))?;
                Ok(true)
            }
            _ => Ok(false),
        })
    }

    /// True iff a non-stale lock exists.
    pub fn is_locked(&self) -> Result<bool> {
        Ok(matches!(
            self.get_lock_info()?,
            Some(LockInfo {
                status: LockStatus::Active,
                ..
            })
        ))
    }

    pub fn get_lock_info(&self) -> Result<Option<LockInfo>> {
        self.read_lock()
    }

    fn read_lock(&self) -> Result<Option<LockInfo>> {
        let path = self.lock_path();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(QuarantineError::io(&path, e)),
        };
        let (agent_id, timestamp, pid) =
            parse_lock_content(&content).ok_or_else(|| QuarantineError::MalformedLock {
                path: path.clone(),
                content: content.clone(),
            })?;
        let status = if self.is_stale(timestamp) {
            LockStatus::Stale
        } else {
            LockStatus::Active
        };
        Ok(Some(LockInfo {
            agent_id,
            timestamp,
            pid,
            status,
        }))
    }

    fn is_stale(&self, timestamp: i64) -> bool {
        let age = now_millis().saturating_sub(timestamp);
        age > self.stale_after.as_millis() as i64
    }

    fn write_lock(&self) -> Result<()> {
        let content = format!("{}:{}:{}", self.agent_id, now_millis(), self.pid);
        write_atomic(&self.lock_path(), content.as_bytes())
    }

    fn with_guard<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let guard_path = self.root.join(GUARD_FILE_NAME);
        let guard = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&guard_path)
            .map_err(|e| QuarantineError::io(&guard_path, e))?;
        guard
            .lock_exclusive()
            .map_err(|e| QuarantineError::io(&guard_path, e))?;
        let result = f();
        let _ = FileExt::unlock(&guard);
        result
    }
}

/// Releases the lock when dropped.
pub struct LockGuard {
    manager: LockManager,
    released: bool,
}

impl LockGuard {
    pub fn release(mut self) -> Result<bool> {
        self.released = true;
        self.manager.release_lock()
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.manager.release_lock() {
            tracing::error!(error = %e, "failed to release quarantine lock");
        }
    }
}

/// Agent ids name the lock owner and a directory under the quarantine root,
/// so only ASCII letters, digits, `-` and `_` are accepted.
pub fn validate_agent_id(agent_id: &str) -> Result<()> {
    let valid = !agent_id.is_empty()
        && agent_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(QuarantineError::InvalidAgentId(agent_id.to_string()));
    }
    Ok(())
}

/// Parse `agent_id:timestamp:pid`.
fn parse_lock_content(content: &str) -> Option<(String, i64, u32)> {
    let mut parts = content.trim().split(':');
    let agent = parts.next()?;
    let timestamp = parts.next()?.parse().ok()?;
    let pid = parts.next()?.parse().ok()?;
    if parts.next().is_some() || agent.is_empty() {
        return None;
    }
    Some((agent.to_string(), timestamp, pid))
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Write through a temp file in the same directory, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| QuarantineError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| QuarantineError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| QuarantineError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| QuarantineError::io(path, e.error))?;
    Ok(())
}
