//! JSON output types for CLI commands.
//!
//! Every JSON response is wrapped in a [`JsonResponse`] envelope:
//!
//! ```json
//! {
//!   "schema_version": "1.0.0",
//!   "execution_id": "6710b2c4-1f3a",
//!   "tool": "sequester",
//!   "timestamp": "2026-10-19T09:12:44Z",
//!   "data": { ... }
//! }
//! ```
//!
//! Paths inside payloads are relative to the project root where one is known,
//! so output from different checkouts of the same project compares equal.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::candidate::{Category, RiskLevel};
use crate::executor::{ExecutorState, RunOutcome};
use crate::impact::{summary, ImpactSummary};
use crate::lock::LockInfo;
use crate::quarantine::{AgentStats, CleanupLog, RestoreFailure, RestoreReport, SessionStatus, SkipCause};
use crate::validation::relative_display;

/// Current JSON output schema version
pub const SEQUESTER_JSON_SCHEMA_VERSION: &str = "1.0.0";

/// Wrapper for all JSON responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse<T> {
    /// Schema version for parsing stability
    pub schema_version: String,
    /// Unique execution ID for this run
    pub execution_id: String,
    pub tool: String,
    /// RFC 3339, second precision
    pub timestamp: String,
    pub data: T,
}

impl<T> JsonResponse<T> {
    pub fn new(data: T, execution_id: &str) -> Self {
        JsonResponse {
            schema_version: SEQUESTER_JSON_SCHEMA_VERSION.to_string(),
            execution_id: execution_id.to_string(),
            tool: "sequester".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            data,
        }
    }
}

/// One moved (or, in a dry run, would-be-moved) file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantinedEntry {
    pub path: String,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub size_bytes: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub path: String,
    pub cause: SkipCause,
    pub reason: String,
}

/// Response for `sequester run`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub session_id: String,
    pub agent: String,
    pub status: SessionStatus,
    pub dry_run: bool,
    /// Absent for dry runs, which create no directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quarantine_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rollback_script: Option<PathBuf>,
    pub files_quarantined: usize,
    pub size_recovered_bytes: u64,
    pub duration_ms: u64,
    pub quarantined: Vec<QuarantinedEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub impact: ImpactSummary,
    pub errors: Vec<String>,
    pub diagnostics: usize,
    pub state_history: Vec<ExecutorState>,
    pub final_state: ExecutorState,
}

impl RunResponse {
    pub fn from_outcome(outcome: &RunOutcome, project_root: &Path) -> Self {
        let session = &outcome.session;
        let (quarantine_dir, rollback_script) = if session.dry_run {
            (None, None)
        } else {
            (
                Some(session.quarantine_dir.clone()),
                Some(session.rollback_script.clone()),
            )
        };

        RunResponse {
            session_id: session.id.clone(),
            agent: session.agent.clone(),
            status: session.status,
            dry_run: session.dry_run,
            quarantine_dir,
            rollback_script,
            files_quarantined: session.files_quarantined,
            size_recovered_bytes: session.size_recovered_bytes,
            duration_ms: session.duration_ms,
            quarantined: outcome
                .quarantined
                .iter()
                .map(|f| QuarantinedEntry {
                    path: relative_display(&f.original_path, project_root),
                    category: f.category,
                    risk_level: f.risk_level,
                    size_bytes: f.size_bytes,
                    reason: f.reason.clone(),
                })
                .collect(),
            skipped: outcome
                .skipped
                .iter()
                .map(|s| SkippedEntry {
                    path: relative_display(&s.path, project_root),
                    cause: s.cause,
                    reason: s.reason.clone(),
                })
                .collect(),
            impact: summary(&outcome.possible_breaks),
            errors: session.errors.clone(),
            diagnostics: outcome.diagnostics.len(),
            state_history: outcome.state_history.clone(),
            final_state: outcome.final_state,
        }
    }
}

/// Response for `sequester rollback`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackResponse {
    pub session_id: String,
    pub session_dir: PathBuf,
    pub restored: Vec<PathBuf>,
    pub failed: Vec<RestoreFailure>,
}

impl RollbackResponse {
    pub fn new(session_dir: &Path, report: RestoreReport) -> Self {
        RollbackResponse {
            session_id: report.session_id,
            session_dir: session_dir.to_path_buf(),
            restored: report.restored,
            failed: report.failed,
        }
    }
}

/// Response for `sequester status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub quarantine_root: PathBuf,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockInfo>,
    pub sessions: usize,
    pub total_files_quarantined: usize,
    pub total_size_recovered: u64,
    pub agents: BTreeMap<String, AgentStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_session: Option<String>,
}

impl StatusResponse {
    pub fn new(quarantine_root: &Path, lock: Option<LockInfo>, log: Option<&CleanupLog>) -> Self {
        let locked = lock
            .as_ref()
            .map(|l| l.status == crate::lock::LockStatus::Active)
            .unwrap_or(false);
        StatusResponse {
            quarantine_root: quarantine_root.to_path_buf(),
            locked,
            lock,
            sessions: log.map(|l| l.sessions.len()).unwrap_or(0),
            total_files_quarantined: log.map(|l| l.total_files_quarantined).unwrap_or(0),
            total_size_recovered: log.map(|l| l.total_size_recovered).unwrap_or(0),
            agents: log.map(|l| l.agents.clone()).unwrap_or_default(),
            last_session: log.and_then(|l| l.sessions.last()).map(|s| s.id.clone()),
        }
    }
}

/// Response for errors in JSON mode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable error code, e.g. `SEQ-LCK-001`
    pub error: String,
    pub message: String,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Human,
    /// Compact JSON with schema versioning
    Json,
    /// Indented JSON
    Pretty,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Pretty)
    }
}

/// Execution ID for this run: `<unix-secs hex>-<pid hex>`.
pub fn generate_execution_id() -> String {
    let timestamp = chrono::Utc::now().timestamp().max(0) as u64;
    format!("{:x}-{:x}", timestamp, std::process::id())
}

/// Write JSON to stdout.
pub fn output_json<T: Serialize>(data: &T, format: OutputFormat) -> anyhow::Result<()> {
    let json = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(data)?,
        _ => serde_json::to_string(data)?,
    };
    println!("{}", json);
    Ok(())
}
