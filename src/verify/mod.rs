//! Database Verifier.
//!
//! Escalates candidate risk when a file's queries touch tables that hold
//! production data. The database is reached only through an injected
//! [`TableProbe`]; without one (or when it does not answer) the verifier
//! fails open conservatively and lifts every candidate to at least
//! `needs-review`. Risk is only ever raised here, never lowered.

pub mod patterns;
pub mod probe;

pub use probe::{is_valid_table_name, SqliteProbe, TableProbe, TableProbeResult};

use serde::{Deserialize, Serialize};

use crate::candidate::{QuarantineCandidate, RiskLevel};
use crate::policy::DatabasePolicy;
use patterns::{has_database_queries, TableReference};

/// Verified state of one known table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseTable {
    pub name: String,
    pub exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    pub is_production: bool,
}

/// What a verification pass saw.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub reachable: bool,
    pub tables: Vec<DatabaseTable>,
}

pub struct DatabaseVerifier<'a> {
    probe: Option<&'a dyn TableProbe>,
    policy: DatabasePolicy,
}

impl<'a> DatabaseVerifier<'a> {
    pub fn new(probe: Option<&'a dyn TableProbe>, policy: &DatabasePolicy) -> Self {
        Self {
            probe,
            policy: policy.clone(),
        }
    }

    /// Test/mock tables never count; otherwise big or core tables do.
    pub fn is_production_table(&self, name: &str, row_count: u64) -> bool {
        let lower = name.to_lowercase();
        if lower.contains("test") || lower.contains("mock") {
            return false;
        }
        row_count > self.policy.production_row_threshold
            || self.policy.core_tables.iter().any(|t| t == name)
    }

    /// Probe every known table. Probe errors count as "does not exist".
    pub fn verify_tables(&self, probe: &dyn TableProbe) -> Vec<DatabaseTable> {
        self.policy
            .known_tables
            .iter()
            .map(|name| match probe.probe(name) {
                Ok(result) if result.exists => DatabaseTable {
                    name: name.clone(),
                    exists: true,
                    row_count: Some(result.row_count),
                    is_production: self.is_production_table(name, result.row_count),
                },
                Ok(_) => DatabaseTable {
                    name: name.clone(),
                    exists: false,
                    row_count: None,
                    is_production: false,
                },
                Err(e) => {
                    tracing::debug!(table = %name, error = %e, "table probe failed");
                    DatabaseTable {
                        name: name.clone(),
                        exists: false,
                        row_count: None,
                        is_production: false,
                    }
                }
            })
            .collect()
    }

    /// Verify candidates in place.
    pub fn verify_candidates(&self, candidates: &mut [QuarantineCandidate]) -> VerificationReport {
        let probe = match self.probe {
            Some(probe) => match probe.ping() {
                Ok(()) => Some(probe),
                Err(e) => {
                    tracing::warn!(error = %e, "database unreachable, escalating all candidates to needs-review");
                    None
                }
            },
            None => {
                tracing::warn!("no database configured, escalating all candidates to needs-review");
                None
            }
        };

        let Some(probe) = probe else {
            for candidate in candidates.iter_mut() {
                self.fail_open(candidate);
            }
            return VerificationReport::default();
        };

        let tables = self.verify_tables(probe);
        let references: Vec<(&DatabaseTable, TableReference)> = tables
            .iter()
            .filter(|t| t.exists && is_valid_table_name(&t.name))
            .filter_map(|t| TableReference::new(&t.name).ok().map(|r| (t, r)))
            .collect();

        for candidate in candidates.iter_mut() {
            self.verify_candidate(candidate, &references);
        }

        VerificationReport {
            reachable: true,
            tables,
        }
    }

    fn verify_candidate(&self, candidate: &mut QuarantineCandidate, references: &[(&DatabaseTable, TableReference)]) {
        let content = match std::fs::read_to_string(&candidate.path) {
            Ok(content) => content,
            Err(e) => {
                candidate.risk_level.escalate(RiskLevel::NeedsReview);
                candidate.metadata.verification_error = Some(e.to_string());
                return;
            }
        };

        let queries = has_database_queries(&content);
        candidate.metadata.has_database_queries = Some(queries);
        if !queries {
            return;
        }

        let referenced: Vec<&DatabaseTable> = references
            .iter()
            .filter(|(_, r)| r.is_referenced_in(&content))
            .map(|(t, _)| *t)
            .collect();
        candidate.metadata.database_tables = referenced.iter().map(|t| t.name.clone()).collect();

        let production: Vec<&str> = referenced
            .iter()
            .filter(|t| t.is_production)
            .map(|t| t.name.as_str())
            .collect();

        if !production.is_empty() {
            candidate.risk_level.escalate(RiskLevel::Dangerous);
            candidate
                .reason
                .push_str(&format!(" (Uses production tables: {})", production.join(", ")));
            candidate.metadata.has_production_data = Some(true);
            tracing::debug!(path = %candidate.path.display(), tables = ?production, "uses production tables");
        } else {
            // non-production tables, or queries against tables we do not know
            candidate.risk_level.escalate(RiskLevel::NeedsReview);
            if !referenced.is_empty() {
                candidate.metadata.has_production_data = Some(false);
            }
        }
    }

    fn fail_open(&self, candidate: &mut QuarantineCandidate) {
        candidate.risk_level.escalate(RiskLevel::NeedsReview);
        match std::fs::read_to_string(&candidate.path) {
            Ok(content) => {
                candidate.metadata.has_database_queries = Some(has_database_queries(&content));
            }
            Err(e) => candidate.metadata.verification_error = Some(e.to_string()),
        }
    }
}
