//! Sequester: safe dead-code quarantine for JavaScript and TypeScript projects
//!
//! Sequester scans a source tree, builds a whole-project import graph, flags
//! files that look like test, mock, seed or unused code, cross-checks them
//! against live database usage, predicts what would break without them, and
//! moves only the safe ones into a reversible quarantine area.
//!
//! # Pipeline
//!
//! | Stage     | Component                                  |
//! |-----------|--------------------------------------------|
//! | locking   | [`lock::LockManager`]                      |
//! | detecting | [`detect::MockDetector`], [`graph::DependencyAnalyzer`] |
//! | verifying | [`verify::DatabaseVerifier`]               |
//! | deciding  | [`safety::SafetyRules`], [`graph::ReferenceIndex`], [`impact::ImpactAnalyzer`] |
//! | moving    | [`quarantine::QuarantineManager`]          |
//!
//! [`executor::QuarantineExecutor`] drives the stages in order.
//!
//! # Guarantees
//!
//! - Files are relocated, never deleted, and never edited
//! - Every session writes a manifest with sha-256 hashes and a `rollback.sh`
//! - One run per quarantine root at a time (the `.lock` file)
//! - Dry runs create, move and write nothing besides the lock

pub mod candidate;
pub mod config;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod error_codes;
pub mod executor;
pub mod graph;
pub mod impact;
pub mod ingest;
pub mod lock;
pub mod logging;
pub mod output;
pub mod policy;
pub mod quarantine;
pub mod safety;
pub mod validation;
pub mod verify;
pub mod version;

pub use candidate::{merge_candidates, CandidateMetadata, CandidateSource, Category, QuarantineCandidate, RiskLevel};
pub use config::Config;
pub use detect::MockDetector;
pub use diagnostics::{DiagnosticStage, ScanDiagnostic, SkipReason};
pub use error::{QuarantineError, Result};
pub use executor::{ExecutorState, QuarantineExecutor, RunOptions, RunOutcome};
pub use graph::{DependencyAnalyzer, DependencyGraph, DependencyNode, FileFilter, UsageEntry, UsageMap};
pub use impact::{BreakType, ImpactAnalysis, ImpactAnalyzer, PossibleBreak, Severity};
pub use lock::{validate_agent_id, LockGuard, LockInfo, LockManager, LockStatus};
pub use output::{JsonResponse, OutputFormat};
pub use policy::Policy;
pub use quarantine::{
    restore_session, QuarantineManager, QuarantineSession, QuarantinedFile, RestoreReport, SessionStatus,
    SkipCause, SkipRecord,
};
pub use validation::{canonicalize_path, validate_path_within_root, PathValidationError};
pub use verify::{DatabaseVerifier, SqliteProbe, TableProbe};
