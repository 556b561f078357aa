//! Skip reasons and per-file error records.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Why a file was left out of discovery.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Directory, socket, dangling symlink
    NotAFile,
    /// Extension not handled by the requesting stage
    UnsupportedExtension,
    /// Dependency, build output, VCS or quarantine directory
    IgnoredInternal,
    /// Matched by .gitignore or .ignore
    IgnoredByGitignore,
    /// Filtered by include/exclude globs
    ExcludedByGlob,
}

impl SkipReason {
    /// Stable sort key; lower values report first.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::IgnoredInternal => 0,
            SkipReason::IgnoredByGitignore => 1,
            SkipReason::ExcludedByGlob => 2,
            SkipReason::UnsupportedExtension => 3,
            SkipReason::NotAFile => 4,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::NotAFile => "not a regular file",
            SkipReason::UnsupportedExtension => "unsupported extension",
            SkipReason::IgnoredInternal => "internal ignore rule",
            SkipReason::IgnoredByGitignore => "matched by gitignore",
            SkipReason::ExcludedByGlob => "excluded by pattern",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Pipeline stage where a per-file failure happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    Read,
    Parse,
    Verify,
    Move,
}

impl DiagnosticStage {
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::Read => 0,
            DiagnosticStage::Parse => 1,
            DiagnosticStage::Verify => 2,
            DiagnosticStage::Move => 3,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::Read => "reading file",
            DiagnosticStage::Parse => "parsing source",
            DiagnosticStage::Verify => "verifying database usage",
            DiagnosticStage::Move => "moving file",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// A skipped file or a per-file processing error.
///
/// Paths are relative to the project root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanDiagnostic {
    Skipped {
        path: String,
        reason: SkipReason,
    },
    Error {
        path: String,
        stage: DiagnosticStage,
        message: String,
    },
}

impl ScanDiagnostic {
    pub fn skipped(path: String, reason: SkipReason) -> Self {
        ScanDiagnostic::Skipped { path, reason }
    }

    pub fn error(path: String, stage: DiagnosticStage, message: String) -> Self {
        ScanDiagnostic::Error {
            path,
            stage,
            message,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            ScanDiagnostic::Skipped { path, .. } => path,
            ScanDiagnostic::Error { path, .. } => path,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ScanDiagnostic::Error { .. })
    }

    /// Path first, errors before skips, then stage/reason.
    pub fn sort_key(&self) -> (&str, u8, u8) {
        match self {
            ScanDiagnostic::Error { path, stage, .. } => (path, 0, stage.sort_key()),
            ScanDiagnostic::Skipped { path, reason } => (path, 1, reason.sort_key()),
        }
    }

    /// One-line form for log output.
    ///
    /// - "SKIP node_modules/x.js: internal ignore rule"
    /// - "ERROR src/bad.ts: parsing source: invalid UTF-8"
    pub fn format_line(&self) -> String {
        match self {
            ScanDiagnostic::Skipped { path, reason } => format!("SKIP {}: {}", path, reason),
            ScanDiagnostic::Error {
                path,
                stage,
                message,
            } => format!("ERROR {}: {}: {}", path, stage, message),
        }
    }
}

impl fmt::Display for ScanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_line())
    }
}

impl PartialOrd for ScanDiagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScanDiagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key()
            .cmp(&other.sort_key())
            .then_with(|| self.format_line().cmp(&other.format_line()))
    }
}
