//! Impact Analyzer.
//!
//! Predicts what could break if each candidate disappeared: imports that
//! would dangle, runtime surfaces that would vanish, exports other files
//! rely on, and database access. The analyzer reads the usage map only; it
//! never touches the filesystem.

pub mod report;

pub use report::render_report;

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::candidate::{QuarantineCandidate, RiskLevel};
use crate::graph::UsageMap;
use crate::policy::ImpactPolicy;
use crate::validation::{heuristic_path, relative_display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakType {
    ImportError,
    RuntimeError,
    MissingExport,
    DatabaseError,
}

impl BreakType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakType::ImportError => "import_error",
            BreakType::RuntimeError => "runtime_error",
            BreakType::MissingExport => "missing_export",
            BreakType::DatabaseError => "database_error",
        }
    }
}

impl fmt::Display for BreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Report order, most severe first.
    pub const DESCENDING: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PossibleBreak {
    pub file_path: PathBuf,
    pub break_type: BreakType,
    pub severity: Severity,
    pub description: String,
    pub affected_files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

/// Result of [`ImpactAnalyzer::analyze`]. Candidates keep their input order.
#[derive(Debug, Clone, Default)]
pub struct ImpactAnalysis {
    pub possible_breaks: Vec<PossibleBreak>,
    pub safe: Vec<QuarantineCandidate>,
    pub risky: Vec<QuarantineCandidate>,
}

/// Per-severity tallies over a set of breaks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    /// Distinct affected files, sorted
    pub affected_files: Vec<PathBuf>,
}

pub fn summary(breaks: &[PossibleBreak]) -> ImpactSummary {
    let mut out = ImpactSummary {
        total: breaks.len(),
        ..ImpactSummary::default()
    };
    let mut affected = BTreeSet::new();
    for b in breaks {
        match b.severity {
            Severity::Critical => out.critical += 1,
            Severity::High => out.high += 1,
            Severity::Medium => out.medium += 1,
            Severity::Low => out.low += 1,
        }
        affected.extend(b.affected_files.iter().cloned());
    }
    out.affected_files = affected.into_iter().collect();
    out
}

pub struct ImpactAnalyzer<'a> {
    project_root: PathBuf,
    usage: &'a UsageMap,
    policy: &'a ImpactPolicy,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(project_root: &Path, usage: &'a UsageMap, policy: &'a ImpactPolicy) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            usage,
            policy,
        }
    }

    /// Partition candidates into safe and risky, collecting every break.
    pub fn analyze(&self, candidates: &[QuarantineCandidate]) -> ImpactAnalysis {
        let mut analysis = ImpactAnalysis::default();

        for candidate in candidates {
            let breaks = self.breaks_for(candidate);
            tracing::debug!(
                path = %candidate.path.display(),
                breaks = breaks.len(),
                "impact analyzed"
            );
            // needs-review candidates always go through the risky rules
            if breaks.is_empty() && candidate.risk_level == RiskLevel::Safe {
                analysis.safe.push(candidate.clone());
            } else {
                analysis.risky.push(candidate.clone());
            }
            analysis.possible_breaks.extend(breaks);
        }

        tracing::info!(
            breaks = analysis.possible_breaks.len(),
            safe = analysis.safe.len(),
            risky = analysis.risky.len(),
            "impact analysis complete"
        );
        analysis
    }

    /// Every predicted break for one candidate: imports, runtime, exports, database.
    pub fn breaks_for(&self, candidate: &QuarantineCandidate) -> Vec<PossibleBreak> {
        let mut breaks = Vec::new();
        let importers = self.importers(candidate);

        for dependent in &importers {
            breaks.push(PossibleBreak {
                file_path: candidate.path.clone(),
                break_type: BreakType::ImportError,
                severity: self.import_severity(candidate, dependent),
                description: format!(
                    "File {} imports from {}, which will be quarantined",
                    self.display(dependent),
                    self.display(&candidate.path)
                ),
                affected_files: vec![dependent.clone()],
                suggested_fix: Some(format!(
                    "Update import in {} to point to a replacement file or remove the import",
                    self.display(dependent)
                )),
            });
        }

        if let Some(b) = self.runtime_break(candidate) {
            breaks.push(b);
        }

        for dependent in &importers {
            breaks.push(PossibleBreak {
                file_path: candidate.path.clone(),
                break_type: BreakType::MissingExport,
                severity: Severity::Medium,
                description: format!(
                    "File {} may be importing specific exports from {}",
                    self.display(dependent),
                    self.display(&candidate.path)
                ),
                affected_files: vec![dependent.clone()],
                suggested_fix: Some(format!(
                    "Check which exports of {} are used and make sure they are available elsewhere",
                    self.display(&candidate.path)
                )),
            });
        }

        if let Some(b) = self.database_break(candidate) {
            breaks.push(b);
        }

        breaks
    }

    /// Dependents whose recorded imports really name the candidate.
    fn importers(&self, candidate: &QuarantineCandidate) -> Vec<PathBuf> {
        candidate
            .dependents
            .iter()
            .filter(|dep| {
                self.usage
                    .get(*dep)
                    .is_some_and(|entry| entry.imports.contains(&candidate.path))
            })
            .cloned()
            .collect()
    }

    fn import_severity(&self, candidate: &QuarantineCandidate, dependent: &Path) -> Severity {
        let key = heuristic_path(dependent, &self.project_root);
        if self.policy.is_api_path(&key) || self.policy.is_critical_service(&key) {
            Severity::Critical
        } else if candidate.risk_level == RiskLevel::Dangerous
            || candidate.dependents.len() > self.policy.high_dependent_threshold
        {
            Severity::High
        } else if candidate.risk_level == RiskLevel::NeedsReview {
            Severity::Medium
        } else {
            Severity::Low
        }
    }

    fn runtime_break(&self, candidate: &QuarantineCandidate) -> Option<PossibleBreak> {
        let key = heuristic_path(&candidate.path, &self.project_root);
        let what = if self.policy.is_api_path(&key) {
            "API route"
        } else if self.policy.is_critical_service(&key) {
            "Critical service"
        } else {
            return None;
        };

        Some(PossibleBreak {
            file_path: candidate.path.clone(),
            break_type: BreakType::RuntimeError,
            severity: Severity::High,
            description: format!("{} {} will be quarantined", what, self.display(&candidate.path)),
            affected_files: candidate.dependents.clone(),
            suggested_fix: Some("Make sure nothing still relies on it or provide a replacement".to_string()),
        })
    }

    fn database_break(&self, candidate: &QuarantineCandidate) -> Option<PossibleBreak> {
        let meta = &candidate.metadata;
        if !meta.has_database_dependency() {
            return None;
        }
        let production = meta.has_production_data == Some(true);

        let mut description = format!(
            "File {} contains database access and will be quarantined",
            self.display(&candidate.path)
        );
        if !meta.database_tables.is_empty() {
            description.push_str(&format!(" (tables: {})", meta.database_tables.join(", ")));
        }

        Some(PossibleBreak {
            file_path: candidate.path.clone(),
            break_type: BreakType::DatabaseError,
            severity: if production { Severity::Critical } else { Severity::High },
            description,
            affected_files: candidate.dependents.clone(),
            suggested_fix: Some(if production {
                "This file touches production data. Confirm nothing depends on it before quarantining".to_string()
            } else {
                "Confirm these queries are no longer needed or move them to a replacement file".to_string()
            }),
        })
    }

    fn display(&self, path: &Path) -> String {
        relative_display(path, &self.project_root)
    }
}
