//! Quarantine Manager: sessions, moves, artifacts, ledger and rollback.
//!
//! A session directory looks like
//!
//! ```text
//! <quarantine_root>/<agent>/<YYYY-MM-DDTHH-MM-SS-mmmZ>/
//!     src/...            moved files, paths preserved below the project root
//!     manifest.json
//!     usage-map.json
//!     possibleBreaks.md
//!     summary.md
//!     rollback.sh
//! ```
//!
//! and `<quarantine_root>/cleanup-log.json` accumulates every session.

pub mod ledger;
pub mod manager;
pub mod rollback;
pub mod session;

pub use ledger::{read_cleanup_log, update_cleanup_log, AgentStats, CleanupLog, CLEANUP_LOG_FILE};
pub use manager::{format_bytes, hash_file, QuarantineManager};
pub use rollback::{restore_session, RestoreFailure, RestoreReport};
pub use session::{
    ManifestSummary, QuarantineSession, QuarantinedFile, SessionManifest, SessionStatus, SkipCause,
    SkipRecord,
};
