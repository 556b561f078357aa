//! Dependency Analyzer: files in, frozen graph and analyzer candidates out.
//!
//! Parsing is read-only and fans out over rayon; each worker thread reuses
//! its own parsers from [`crate::ingest::pool`]. Everything that depends on
//! other files (dependents, sharing) happens afterwards in
//! [`DependencyGraph::from_nodes`], so results do not depend on scheduling.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::resolver::ModuleResolver;
use super::{DependencyGraph, DependencyNode};
use crate::candidate::{CandidateSource, Category, QuarantineCandidate, RiskLevel};
use crate::diagnostics::{DiagnosticStage, ScanDiagnostic};
use crate::error::{QuarantineError, Result};
use crate::ingest::{extract_module_facts, has_extension, parse_file, SOURCE_EXTENSIONS};
use crate::policy::AnalyzerPolicy;
use crate::validation::{heuristic_path, relative_display};

/// Build/app configuration files that are always entry points.
const CONFIG_PREFIXES: &[&str] = &[
    "next.config.",
    "tailwind.config.",
    "vite.config.",
    "webpack.config.",
    "jest.config.",
    "postcss.config.",
];

/// Stems that are entry points anywhere (framework routing conventions).
const ENTRY_STEMS: &[&str] = &["page", "layout", "middleware"];

/// Stems that are entry points in the project root or root `src/`.
const MAIN_STEMS: &[&str] = &["main", "index", "server", "app"];

/// Graph plus the per-file failures met while building it.
#[derive(Debug, Clone, Default)]
pub struct GraphBuild {
    pub graph: DependencyGraph,
    pub diagnostics: Vec<ScanDiagnostic>,
}

pub struct DependencyAnalyzer {
    project_root: PathBuf,
    policy: AnalyzerPolicy,
    resolver: ModuleResolver,
}

impl DependencyAnalyzer {
    pub fn new(project_root: &Path, policy: &AnalyzerPolicy) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            policy: policy.clone(),
            resolver: ModuleResolver::new(project_root),
        }
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    /// Parse every JS/TS file in `files` and freeze the graph.
    ///
    /// Files with other extensions are ignored. Unreadable or unparseable
    /// files are left out of the graph and reported as diagnostics.
    pub fn build_graph(&self, files: &[PathBuf]) -> GraphBuild {
        let results: Vec<(PathBuf, Result<DependencyNode>)> = files
            .par_iter()
            .filter(|path| has_extension(path, SOURCE_EXTENSIONS))
            .map(|path| (path.clone(), self.analyze_file(path)))
            .collect();

        let mut nodes = Vec::with_capacity(results.len());
        let mut diagnostics = Vec::new();
        for (path, result) in results {
            match result {
                Ok(node) => nodes.push(node),
                Err(e) => {
                    let stage = match e {
                        QuarantineError::Io { .. } => DiagnosticStage::Read,
                        _ => DiagnosticStage::Parse,
                    };
                    tracing::warn!(path = %path.display(), error = %e, "skipping file");
                    diagnostics.push(ScanDiagnostic::error(
                        relative_display(&path, &self.project_root),
                        stage,
                        e.to_string(),
                    ));
                }
            }
        }
        diagnostics.sort();

        let graph = DependencyGraph::from_nodes(nodes);
        tracing::debug!(nodes = graph.len(), failed = diagnostics.len(), "dependency graph built");
        GraphBuild { graph, diagnostics }
    }

    /// Parse one file into an unlinked node (no dependents yet).
    pub fn analyze_file(&self, path: &Path) -> Result<DependencyNode> {
        let tree = parse_file(path)?;
        if tree.has_errors() {
            tracing::debug!(path = %path.display(), "parsed with syntax errors");
        }
        let facts = extract_module_facts(&tree);

        let mut imports: Vec<PathBuf> = Vec::new();
        for spec in &facts.specifiers {
            if let Some(resolved) = self.resolver.resolve(path, spec) {
                if !imports.contains(&resolved) {
                    imports.push(resolved);
                }
            }
        }

        let mut node = DependencyNode::new(path.to_path_buf(), imports, facts.exports);
        node.is_entry_point = self.is_entry_point(path);
        node.risk_score = self.risk_score(path, node.exports.len(), node.is_entry_point);
        Ok(node)
    }

    /// Files reached from outside the graph by convention.
    pub fn is_entry_point(&self, path: &Path) -> bool {
        let key = heuristic_path(path, &self.project_root);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if key.contains("/api/") && stem == "route" {
            return true;
        }
        if key.contains("/pages/") {
            return true;
        }
        if ENTRY_STEMS.contains(&stem.as_str()) {
            return true;
        }
        if CONFIG_PREFIXES.iter().any(|p| file_name.starts_with(p)) {
            return true;
        }
        if MAIN_STEMS.contains(&stem.as_str()) {
            let parent = Path::new(&key).parent().map(Path::to_path_buf).unwrap_or_default();
            return parent == Path::new("/") || parent == Path::new("/src");
        }
        false
    }

    /// Additive structural risk, clamped to `[0, 100]`.
    pub fn risk_score(&self, path: &Path, export_count: usize, is_entry_point: bool) -> u8 {
        let key = heuristic_path(path, &self.project_root);
        let p = &self.policy;

        let mut score: i64 = 0;
        if is_entry_point {
            score += i64::from(p.entry_point_weight);
        }
        score += i64::from(p.export_weight) * export_count as i64;
        if key.contains("/api/") {
            score += i64::from(p.api_path_weight);
        }
        if key.contains("/lib/") {
            score += i64::from(p.lib_path_weight);
        }
        if key.contains("test") || key.contains("spec") {
            score -= i64::from(p.test_path_penalty);
        }
        if key.contains("seed") || key.contains("mock") {
            score -= i64::from(p.seed_mock_path_penalty);
        }
        score.clamp(0, 100) as u8
    }

    /// Confidence that `node` is safe to remove, in `[0, 100]`.
    pub fn confidence(&self, node: &DependencyNode) -> u8 {
        let key = heuristic_path(&node.path, &self.project_root);
        let p = &self.policy;

        let mut confidence = 100.0;
        confidence -= f64::from(node.risk_score) * p.confidence_risk_factor;
        confidence -= node.exports.len() as f64 * p.confidence_export_penalty;
        if key.contains("/api/") {
            confidence -= p.confidence_api_penalty;
        }
        if key.contains("/lib/") {
            confidence -= p.confidence_lib_penalty;
        }
        confidence.round().clamp(0.0, 100.0) as u8
    }

    /// Analyzer candidates, in graph (path) order.
    ///
    /// Entry points and shared files are never proposed.
    pub fn candidates(&self, graph: &DependencyGraph) -> Vec<QuarantineCandidate> {
        graph
            .nodes()
            .iter()
            .filter(|node| !node.is_entry_point && !node.is_shared)
            .filter_map(|node| self.classify(node))
            .collect()
    }

    fn classify(&self, node: &DependencyNode) -> Option<QuarantineCandidate> {
        let key = heuristic_path(&node.path, &self.project_root);

        let (reason, category, risk) = if key.contains("test") || key.contains("spec") {
            ("Test file with no dependents", Category::Test, RiskLevel::Safe)
        } else if key.contains("seed") {
            ("Seed file with no dependents", Category::Seed, RiskLevel::NeedsReview)
        } else if key.contains("mock") {
            ("Mock file with no dependents", Category::Mock, RiskLevel::Safe)
        } else if node.dependents.is_empty() && node.risk_score < self.policy.unused_risk_ceiling {
            (
                "File with no dependents and low risk score",
                Category::Unused,
                RiskLevel::NeedsReview,
            )
        } else {
            return None;
        };

        let mut candidate = QuarantineCandidate::new(
            node.path.clone(),
            reason,
            category,
            risk,
            self.confidence(node),
            CandidateSource::Analyzer,
        );
        candidate.dependencies = node.imports.clone();
        candidate.dependents = node.dependents.clone();
        candidate.metadata.risk_score = Some(node.risk_score);
        candidate.metadata.insert_extra("is_entry_point", node.is_entry_point);
        candidate.metadata.insert_extra("is_shared", node.is_shared);
        candidate.metadata.insert_extra("export_count", node.exports.len());
        candidate.metadata.insert_extra("import_count", node.imports.len());
        Some(candidate)
    }
}
