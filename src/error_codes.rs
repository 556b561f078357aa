//! Stable error codes for sequester
//!
//! Error codes follow the pattern: SEQ-{CATEGORY}-{3-digit number}
//!
//! Categories:
//! - LCK: Lock file errors (conflict, malformed content)
//! - IO: Filesystem errors (read, move, permissions)
//! - PTH: Path validation errors
//! - CFG: Configuration and usage errors
//! - DB: Database probe errors
//! - V: Verification errors (hash mismatch on restore)
//!
//! Each error code is stable and should not be reused.

/// Another agent holds a live lock
pub const SEQ_LCK_001_LOCK_HELD: &str = "SEQ-LCK-001";

/// Lock file exists but its content cannot be parsed
pub const SEQ_LCK_002_MALFORMED_LOCK: &str = "SEQ-LCK-002";

/// Agent id cannot be encoded into a lock file
pub const SEQ_LCK_003_INVALID_AGENT: &str = "SEQ-LCK-003";

/// Generic filesystem failure
pub const SEQ_IO_001_FILESYSTEM: &str = "SEQ-IO-001";

/// Artifact (manifest, ledger) could not be serialized or parsed
pub const SEQ_IO_002_SERIALIZATION: &str = "SEQ-IO-002";

/// Path resolves outside the project root
pub const SEQ_PTH_001_OUTSIDE_ROOT: &str = "SEQ-PTH-001";

/// Invalid configuration file or environment override
pub const SEQ_CFG_001_INVALID_CONFIG: &str = "SEQ-CFG-001";

/// Agent has no scope directories configured
pub const SEQ_CFG_002_NO_SCOPE: &str = "SEQ-CFG-002";

/// Database probe failed
pub const SEQ_DB_001_PROBE_FAILED: &str = "SEQ-DB-001";

/// Source file could not be parsed
pub const SEQ_V_001_PARSE_FAILED: &str = "SEQ-V-001";

/// Quarantined file no longer matches its recorded hash
pub const SEQ_V_002_HASH_MISMATCH: &str = "SEQ-V-002";

/// Restoring would overwrite an existing file
pub const SEQ_V_003_RESTORE_CONFLICT: &str = "SEQ-V-003";

/// Error code documentation
///
/// | Code | Description | Remediation |
/// |------|-------------|-------------|
/// | SEQ-LCK-001 | Lock held by another run | Wait for it to finish, or for the lock to become stale |
/// | SEQ-LCK-002 | Malformed lock file | Inspect `<quarantine>/.lock` and remove it by hand if no run is active |
/// | SEQ-LCK-003 | Invalid agent id | Use only ASCII letters, digits, `-` and `_` in agent names |
/// | SEQ-IO-001 | Filesystem error | Check permissions and that the path exists |
/// | SEQ-IO-002 | Serialization error | The artifact is corrupt; restore it from a backup |
/// | SEQ-PTH-001 | Path outside project root | Only files under `--root` can be quarantined |
/// | SEQ-CFG-001 | Invalid configuration | Fix `sequester.toml` or `SEQUESTER__*` variables |
/// | SEQ-CFG-002 | No scope for agent | Pass `--scope` or configure `agents.<name>.scope` |
/// | SEQ-DB-001 | Database probe failed | Check `--database`; runs fail open to needs-review |
/// | SEQ-V-001 | Parse failure | The file is skipped; fix its syntax to include it |
/// | SEQ-V-002 | Hash mismatch | The quarantined copy was edited; restore it by hand |
/// | SEQ-V-003 | Restore conflict | A file already exists at the original path |
pub const ERROR_CODE_DOCUMENTATION: &str = "Error code documentation available in source";
