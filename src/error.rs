//! Library error type.
//!
//! Every fallible library operation returns [`QuarantineError`]; the binary
//! wraps it in `anyhow` for top-level context. Each variant maps to a stable
//! code from [`crate::error_codes`].

use std::path::{Path, PathBuf};

use crate::error_codes::*;
use crate::validation::PathValidationError;

pub type Result<T, E = QuarantineError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum QuarantineError {
    /// Another run owns the quarantine root
    #[error("quarantine lock held by agent '{agent_id}' (pid {pid})")]
    LockHeld { agent_id: String, pid: u32 },

    /// Lock content is not `agent_id:timestamp:pid`; state unknown, do not proceed
    #[error("malformed lock file {path}: {content:?}")]
    MalformedLock { path: PathBuf, content: String },

    #[error("invalid agent id {0:?}: use only ASCII letters, digits, '-' and '_'")]
    InvalidAgentId(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    PathValidation(#[from] PathValidationError),

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("database probe failed: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to (de)serialize {path}: {source}")]
    Serialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("no scope configured for agent '{0}'; pass --scope or set agents.{0}.scope")]
    NoScope(String),

    #[error("hash mismatch for {path}: expected {expected}, found {actual}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("refusing to overwrite existing file {0}")]
    RestoreConflict(PathBuf),
}

impl QuarantineError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        QuarantineError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn serialization(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        QuarantineError::Serialization {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Stable error code for this failure class.
    pub fn code(&self) -> &'static str {
        match self {
            QuarantineError::LockHeld { .. } => SEQ_LCK_001_LOCK_HELD,
            QuarantineError::MalformedLock { .. } => SEQ_LCK_002_MALFORMED_LOCK,
            QuarantineError::InvalidAgentId(_) => SEQ_LCK_003_INVALID_AGENT,
            QuarantineError::Io { .. } => SEQ_IO_001_FILESYSTEM,
            QuarantineError::Serialization { .. } => SEQ_IO_002_SERIALIZATION,
            QuarantineError::PathValidation(_) => SEQ_PTH_001_OUTSIDE_ROOT,
            QuarantineError::Config(_) => SEQ_CFG_001_INVALID_CONFIG,
            QuarantineError::NoScope(_) => SEQ_CFG_002_NO_SCOPE,
            QuarantineError::Database(_) => SEQ_DB_001_PROBE_FAILED,
            QuarantineError::Parse { .. } => SEQ_V_001_PARSE_FAILED,
            QuarantineError::HashMismatch { .. } => SEQ_V_002_HASH_MISMATCH,
            QuarantineError::RestoreConflict(_) => SEQ_V_003_RESTORE_CONFLICT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_follow_variant() {
        let held = QuarantineError::LockHeld {
            agent_id: "frontend".into(),
            pid: 42,
        };
        assert_eq!(held.code(), "SEQ-LCK-001");
        assert!(held.to_string().contains("frontend"));

        let io = QuarantineError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(io.code(), "SEQ-IO-001");
        assert!(io.to_string().contains("/tmp/x"));
    }
}
