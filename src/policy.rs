//! Heuristic policy knobs.
//!
//! Every score weight, threshold and table list the pipeline consults lives
//! here with a named default. The whole structure is deserializable, so any
//! field can be overridden from `sequester.toml` (`[policy.detector]` etc.)
//! or `SEQUESTER__POLICY__...` environment variables.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Policy {
    pub analyzer: AnalyzerPolicy,
    pub detector: DetectorPolicy,
    pub database: DatabasePolicy,
    pub impact: ImpactPolicy,
    pub decision: DecisionPolicy,
}

/// Dependency Analyzer risk and confidence weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerPolicy {
    pub entry_point_weight: i32,
    pub export_weight: i32,
    pub api_path_weight: i32,
    pub lib_path_weight: i32,
    pub test_path_penalty: i32,
    pub seed_mock_path_penalty: i32,
    /// Zero-dependent nodes below this risk become `unused` candidates
    pub unused_risk_ceiling: u8,
    pub confidence_risk_factor: f64,
    pub confidence_export_penalty: f64,
    pub confidence_api_penalty: f64,
    pub confidence_lib_penalty: f64,
}

impl Default for AnalyzerPolicy {
    fn default() -> Self {
        Self {
            entry_point_weight: 50,
            export_weight: 2,
            api_path_weight: 30,
            lib_path_weight: 20,
            test_path_penalty: 20,
            seed_mock_path_penalty: 30,
            unused_risk_ceiling: 30,
            confidence_risk_factor: 0.3,
            confidence_export_penalty: 5.0,
            confidence_api_penalty: 20.0,
            confidence_lib_penalty: 15.0,
        }
    }
}

/// Mock/Seed Detector score weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorPolicy {
    pub filename_pattern_weight: u32,
    pub directory_pattern_weight: u32,
    pub filename_keyword_weight: u32,
    pub content_keyword_weight: u32,
    pub content_keyword_cap: u32,
    pub suite_weight: u32,
    pub assertion_weight: u32,
    pub mock_call_weight: u32,
    pub seed_shape_weight: u32,
    /// Minimum cumulative score for a file to become a candidate
    pub candidate_threshold: u32,
    /// Scores at or above this are classified `safe`
    pub safe_threshold: u32,
}

impl Default for DetectorPolicy {
    fn default() -> Self {
        Self {
            filename_pattern_weight: 30,
            directory_pattern_weight: 25,
            filename_keyword_weight: 10,
            content_keyword_weight: 2,
            content_keyword_cap: 30,
            suite_weight: 25,
            assertion_weight: 20,
            mock_call_weight: 15,
            seed_shape_weight: 20,
            candidate_threshold: 15,
            safe_threshold: 50,
        }
    }
}

/// Database Verifier table lists and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabasePolicy {
    /// Tables with more rows than this hold production data
    pub production_row_threshold: u64,
    /// Tables probed for existence
    pub known_tables: Vec<String>,
    /// Tables always treated as production data when they exist
    pub core_tables: Vec<String>,
}

impl Default for DatabasePolicy {
    fn default() -> Self {
        let known = [
            "users",
            "patients",
            "doctors",
            "appointments",
            "sessions",
            "insurance_claims",
            "conversations",
            "messages",
            "chatbot_conversations",
            "chatbot_messages",
            "chatbot_intents",
            "crm_leads",
            "crm_deals",
            "crm_activities",
            "settings",
            "translations",
            "audit_logs",
            "file_uploads",
            "notifications",
            "notification_templates",
            "system_settings",
            "system_metrics",
            "reports",
            "languages",
        ];
        let core = [
            "users",
            "patients",
            "doctors",
            "appointments",
            "sessions",
            "insurance_claims",
            "conversations",
            "messages",
        ];
        Self {
            production_row_threshold: 100,
            known_tables: known.iter().map(|s| s.to_string()).collect(),
            core_tables: core.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Impact Analyzer path patterns and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactPolicy {
    /// Candidates with more dependents than this raise import breaks to `high`
    pub high_dependent_threshold: usize,
    /// Path fragments that mark API-surface files
    pub api_patterns: Vec<String>,
    /// Path fragments that mark critical services
    pub critical_service_patterns: Vec<String>,
}

impl Default for ImpactPolicy {
    fn default() -> Self {
        Self {
            high_dependent_threshold: 5,
            api_patterns: vec!["/api/".to_string()],
            critical_service_patterns: [
                "/lib/auth/",
                "/lib/database",
                "/lib/supabase",
                "/lib/security",
                "/middleware",
                "/config/",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Executor acceptance rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionPolicy {
    pub max_risky_dependents: usize,
    pub min_risky_confidence: u8,
    /// Files modified within this many days are left alone unless forced; 0 disables
    pub grace_period_days: u32,
    /// Root-relative globs that never move
    pub protected_globs: Vec<String>,
    /// Case-insensitive file-name fragments that mark infrastructure files
    pub critical_name_keywords: Vec<String>,
    /// Search the whole project for references before moving anything
    pub search_references: bool,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        let protected = [
            "**/api/**/route.{ts,js}",
            "**/middleware.{ts,js}",
            "**/instrumentation.{ts,js}",
            "**/supabase/**/*.{ts,js,sql}",
            "**/migrations/**/*.{ts,js,sql}",
            "**/*config.{ts,js}",
            "**/constants.{ts,js}",
            "**/*.d.ts",
        ];
        let critical = [
            "middleware",
            "provider",
            "context",
            "config",
            "setup",
            "init",
            "database",
            "schema",
            "migration",
        ];
        Self {
            max_risky_dependents: 3,
            min_risky_confidence: 80,
            grace_period_days: 7,
            protected_globs: protected.iter().map(|s| s.to_string()).collect(),
            critical_name_keywords: critical.iter().map(|s| s.to_string()).collect(),
            search_references: true,
        }
    }
}

impl ImpactPolicy {
    /// True for `/api/` surface paths.
    pub fn is_api_path(&self, path: &str) -> bool {
        self.api_patterns.iter().any(|p| path.contains(p.as_str()))
    }

    pub fn is_critical_service(&self, path: &str) -> bool {
        self.critical_service_patterns
            .iter()
            .any(|p| path.contains(p.as_str()))
    }
}
