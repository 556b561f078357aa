//! Quarantine candidates and their classification.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What kind of code a candidate looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Test,
    Seed,
    Mock,
    Fixture,
    Sample,
    Demo,
    Unused,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Test => "test",
            Category::Seed => "seed",
            Category::Mock => "mock",
            Category::Fixture => "fixture",
            Category::Sample => "sample",
            Category::Demo => "demo",
            Category::Unused => "unused",
            Category::Unknown => "unknown",
        }
    }

    /// Test- or mock-shaped code, which the executor trusts more readily.
    pub fn is_test_like(&self) -> bool {
        matches!(self, Category::Test | Category::Mock)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk classification, ordered `Safe < NeedsReview < Dangerous`.
///
/// Risk only ever moves up: use [`RiskLevel::escalate`] rather than assigning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    Safe,
    NeedsReview,
    Dangerous,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::NeedsReview => "needs-review",
            RiskLevel::Dangerous => "dangerous",
        }
    }

    /// Raise to at least `to`; never lowers.
    pub fn escalate(&mut self, to: RiskLevel) {
        if to > *self {
            *self = to;
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which producer proposed a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Detector,
    Analyzer,
    Both,
}

/// Open metadata bag. Known keys are typed; anything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_database_queries: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_production_data: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub database_tables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_score: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl CandidateMetadata {
    /// The file touches the database in any way the verifier could see.
    pub fn has_database_dependency(&self) -> bool {
        self.has_database_queries == Some(true) || !self.database_tables.is_empty()
    }

    pub fn insert_extra(&mut self, key: &str, value: impl Into<serde_json::Value>) {
        self.extra.insert(key.to_string(), value.into());
    }

    /// Union with `other`; values already set on `self` win.
    pub fn merge_from(&mut self, other: &CandidateMetadata) {
        if self.has_database_queries.is_none() {
            self.has_database_queries = other.has_database_queries;
        }
        if self.has_production_data.is_none() {
            self.has_production_data = other.has_production_data;
        }
        for table in &other.database_tables {
            if !self.database_tables.contains(table) {
                self.database_tables.push(table.clone());
            }
        }
        if self.verification_error.is_none() {
            self.verification_error = other.verification_error.clone();
        }
        if self.risk_score.is_none() {
            self.risk_score = other.risk_score;
        }
        if self.detection_score.is_none() {
            self.detection_score = other.detection_score;
        }
        for (k, v) in &other.extra {
            self.extra.entry(k.clone()).or_insert_with(|| v.clone());
        }
    }
}

/// A file proposed for quarantine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineCandidate {
    pub path: PathBuf,
    pub reason: String,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub confidence: u8,
    #[serde(default)]
    pub dependencies: Vec<PathBuf>,
    #[serde(default)]
    pub dependents: Vec<PathBuf>,
    #[serde(default)]
    pub metadata: CandidateMetadata,
    pub source: CandidateSource,
}

impl QuarantineCandidate {
    pub fn new(
        path: PathBuf,
        reason: impl Into<String>,
        category: Category,
        risk_level: RiskLevel,
        confidence: u8,
        source: CandidateSource,
    ) -> Self {
        Self {
            path,
            reason: reason.into(),
            category,
            risk_level,
            confidence: confidence.min(100),
            dependencies: Vec::new(),
            dependents: Vec::new(),
            metadata: CandidateMetadata::default(),
            source,
        }
    }
}

/// Merge Detector and Analyzer output into one candidate per path.
///
/// When both producers propose the same path, the higher-confidence
/// classification (category, risk, reason, confidence) is kept and the
/// Analyzer wins ties. Metadata from both sides is unioned. Output is sorted
/// by path.
pub fn merge_candidates(
    detected: Vec<QuarantineCandidate>,
    analyzed: Vec<QuarantineCandidate>,
) -> Vec<QuarantineCandidate> {
    let mut merged: BTreeMap<PathBuf, QuarantineCandidate> = BTreeMap::new();

    for candidate in detected {
        merged.insert(candidate.path.clone(), candidate);
    }

    for mut analyzer in analyzed {
        match merged.remove(&analyzer.path) {
            None => {
                merged.insert(analyzer.path.clone(), analyzer);
            }
            Some(mut detector) => {
                let mut combined = if analyzer.confidence >= detector.confidence {
                    analyzer.metadata.merge_from(&detector.metadata);
                    analyzer
                } else {
                    detector.metadata.merge_from(&analyzer.metadata);
                    detector
                };
                combined.source = CandidateSource::Both;
                merged.insert(combined.path.clone(), combined);
            }
        }
    }

    merged.into_values().collect()
}
