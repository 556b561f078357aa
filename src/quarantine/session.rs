//! Session records: what one run moved, skipped and predicted.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::candidate::{CandidateMetadata, Category, RiskLevel};
use crate::graph::UsageMap;
use crate::impact::PossibleBreak;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a candidate was not moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    EntryPoint,
    GracePeriod,
    CriticalBreak,
    TooManyDependents,
    DatabaseDependency,
    LowConfidence,
    /// Matches a protected path pattern (`*.d.ts`, migrations, route handlers)
    Protected,
    /// File name suggests infrastructure (`provider`, `schema`, `setup`)
    CriticalName,
    /// Referenced from a file outside the scanned scopes
    ReferencedBySearch,
    MoveFailed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipRecord {
    pub path: PathBuf,
    pub cause: SkipCause,
    pub reason: String,
}

/// One moved file. Append-only in the manifest, in move order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantinedFile {
    pub original_path: PathBuf,
    pub quarantine_path: PathBuf,
    /// Hex sha-256 of the content at move time
    pub file_hash: String,
    pub size_bytes: u64,
    pub reason: String,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub dependencies: Vec<PathBuf>,
    pub dependents: Vec<PathBuf>,
    pub moved_at: DateTime<Utc>,
    pub metadata: CandidateMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestSummary {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub categories: BTreeMap<String, usize>,
    pub risk_levels: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionManifest {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub agent: String,
    /// Root every `original_path` lives under
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<PathBuf>,
    pub files: Vec<QuarantinedFile>,
    #[serde(default)]
    pub usage_map: UsageMap,
    pub summary: ManifestSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineSession {
    pub id: String,
    pub agent: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub files_quarantined: usize,
    pub size_recovered_bytes: u64,
    pub status: SessionStatus,
    pub quarantine_dir: PathBuf,
    pub rollback_script: PathBuf,
    pub manifest: SessionManifest,
    #[serde(default)]
    pub possible_breaks: Vec<PossibleBreak>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub skipped: Vec<SkipRecord>,
    #[serde(default)]
    pub dry_run: bool,
}

impl QuarantineSession {
    /// Append a moved (or dry-run) file and update every counter.
    pub fn record_file(&mut self, file: QuarantinedFile) {
        self.files_quarantined += 1;
        self.size_recovered_bytes += file.size_bytes;

        let summary = &mut self.manifest.summary;
        summary.total_files += 1;
        summary.total_size_bytes += file.size_bytes;
        *summary
            .categories
            .entry(file.category.as_str().to_string())
            .or_insert(0) += 1;
        *summary
            .risk_levels
            .entry(file.risk_level.as_str().to_string())
            .or_insert(0) += 1;

        self.manifest.files.push(file);
    }

    pub fn skip(&mut self, path: PathBuf, cause: SkipCause, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(path = %path.display(), ?cause, %reason, "candidate skipped");
        self.skipped.push(SkipRecord { path, cause, reason });
    }

    /// Set the final status and duration. A session that already left
    /// `running` keeps its status.
    pub fn finalize(&mut self, status: SessionStatus) {
        if self.status != SessionStatus::Running {
            return;
        }
        self.status = status;
        let elapsed = Utc::now().signed_duration_since(self.timestamp);
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }

    /// Mark the session failed, whatever its status, and keep the error.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.status = SessionStatus::Failed;
        let elapsed = Utc::now().signed_duration_since(self.timestamp);
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }
}
