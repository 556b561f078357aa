//! Mock/Seed Detector.
//!
//! An independent heuristic pass over file names, directory names and file
//! contents. It never parses source; `.json` and `.sql` files are scored on
//! the same signals as code. Scores are additive with weights from
//! [`DetectorPolicy`].

pub mod patterns;

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::candidate::{CandidateSource, Category, QuarantineCandidate, RiskLevel};
use crate::policy::DetectorPolicy;
use crate::validation::{heuristic_path, relative_display};
use patterns::*;

/// Score breakdown for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub path: PathBuf,
    pub score: u32,
    pub reasons: Vec<String>,
    pub category: Option<Category>,
    pub file_name_match: bool,
    pub directory_match: bool,
    pub file_name_keywords: Vec<&'static str>,
}

/// Signals found in file content alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentSignals {
    pub keyword_counts: Vec<(&'static str, usize)>,
    pub has_suite: bool,
    pub has_assertions: bool,
    pub has_mock_calls: bool,
    pub has_seed_shapes: bool,
}

impl ContentSignals {
    pub fn scan(content: &str) -> Self {
        let lower = content.to_lowercase();
        let keyword_counts = CONTENT_KEYWORDS
            .iter()
            .map(|k| (*k, lower.matches(k).count()))
            .filter(|(_, n)| *n > 0)
            .collect();

        Self {
            keyword_counts,
            has_suite: SUITE_PATTERN.is_match(content),
            has_assertions: ASSERTION_PATTERN.is_match(content),
            has_mock_calls: MOCK_CALL_PATTERN.is_match(content),
            has_seed_shapes: SEED_SHAPE_PATTERN.is_match(content),
        }
    }

    pub fn total_keywords(&self) -> usize {
        self.keyword_counts.iter().map(|(_, n)| n).sum()
    }
}

pub struct MockDetector {
    project_root: PathBuf,
    policy: DetectorPolicy,
}

impl MockDetector {
    pub fn new(project_root: &Path, policy: &DetectorPolicy) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            policy: policy.clone(),
        }
    }

    /// Candidates among `files`, in input order.
    pub fn detect(&self, files: &[PathBuf]) -> Vec<QuarantineCandidate> {
        let candidates: Vec<QuarantineCandidate> = files
            .par_iter()
            .filter_map(|path| self.analyze_file(path))
            .collect();
        tracing::debug!(scanned = files.len(), found = candidates.len(), "mock detection complete");
        candidates
    }

    /// Score one file; `None` when it stays under the candidate threshold.
    pub fn analyze_file(&self, path: &Path) -> Option<QuarantineCandidate> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "content unreadable, scoring name only");
                None
            }
        };
        let detection = self.score(path, content.as_deref());
        self.to_candidate(detection)
    }

    /// Pure scoring over a path and optional content.
    pub fn score(&self, path: &Path, content: Option<&str>) -> Detection {
        let p = &self.policy;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let key = heuristic_path(path, &self.project_root);

        let mut detection = Detection {
            path: path.to_path_buf(),
            score: 0,
            reasons: Vec::new(),
            category: None,
            file_name_match: false,
            directory_match: false,
            file_name_keywords: Vec::new(),
        };

        if FILE_NAME_PATTERN.is_match(&file_name) {
            detection.file_name_match = true;
            detection.score += p.filename_pattern_weight;
            detection
                .reasons
                .push(format!("File name matches test/mock/seed pattern: {}", file_name));
            detection.category = Some(category_from_name(&file_name));
        }

        let directories: Vec<&str> = key
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .split_last()
            .map(|(_, dirs)| dirs.to_vec())
            .unwrap_or_default();
        if directories.iter().any(|d| DIRECTORY_NAMES.contains(d)) {
            detection.directory_match = true;
            detection.score += p.directory_pattern_weight;
            detection.reasons.push(format!(
                "File is in test/mock/seed directory: {}",
                relative_display(path, &self.project_root)
            ));
            detection
                .category
                .get_or_insert_with(|| category_from_directories(directories.iter().copied()));
        }

        let lower_name = file_name.to_lowercase();
        detection.file_name_keywords = FILE_NAME_KEYWORDS
            .iter()
            .copied()
            .filter(|k| lower_name.contains(k))
            .collect();
        if !detection.file_name_keywords.is_empty() {
            detection.score += p.filename_keyword_weight * detection.file_name_keywords.len() as u32;
            detection.reasons.push(format!(
                "File name contains keywords: {}",
                detection.file_name_keywords.join(", ")
            ));
            let keywords = detection.file_name_keywords.clone();
            detection
                .category
                .get_or_insert_with(|| category_from_keywords(&keywords));
        }

        if let Some(content) = content {
            self.score_content(&ContentSignals::scan(content), &mut detection);
        }

        detection
    }

    fn score_content(&self, signals: &ContentSignals, detection: &mut Detection) {
        let p = &self.policy;

        let total = signals.total_keywords() as u32;
        if total > 0 {
            detection.score += (p.content_keyword_weight.saturating_mul(total)).min(p.content_keyword_cap);
            let found: Vec<String> = signals
                .keyword_counts
                .iter()
                .map(|(k, n)| format!("{}({})", k, n))
                .collect();
            detection
                .reasons
                .push(format!("Content contains keywords: {}", found.join(", ")));
        }

        if signals.has_suite {
            detection.score += p.suite_weight;
            detection.reasons.push("Contains test framework patterns".to_string());
            detection.category = Some(Category::Test);
        }

        if signals.has_assertions {
            detection.score += p.assertion_weight;
            detection.reasons.push("Contains assertion patterns".to_string());
            detection.category = Some(Category::Test);
        }

        if signals.has_mock_calls {
            detection.score += p.mock_call_weight;
            detection.reasons.push("Contains mocking patterns".to_string());
            if detection.category != Some(Category::Test) {
                detection.category = Some(Category::Mock);
            }
        }

        if signals.has_seed_shapes {
            detection.score += p.seed_shape_weight;
            detection.reasons.push("Contains seed/fixture patterns".to_string());
            detection.category.get_or_insert(Category::Seed);
        }
    }

    fn to_candidate(&self, detection: Detection) -> Option<QuarantineCandidate> {
        if detection.score < self.policy.candidate_threshold {
            return None;
        }
        let risk = if detection.score >= self.policy.safe_threshold {
            RiskLevel::Safe
        } else {
            RiskLevel::NeedsReview
        };

        let mut candidate = QuarantineCandidate::new(
            detection.path.clone(),
            detection.reasons.join("; "),
            detection.category.unwrap_or(Category::Unknown),
            risk,
            detection.score.min(100) as u8,
            CandidateSource::Detector,
        );
        candidate.metadata.detection_score = Some(detection.score);
        candidate
            .metadata
            .insert_extra("file_name_keywords", detection.file_name_keywords.clone());
        candidate
            .metadata
            .insert_extra("directory_match", detection.directory_match);
        candidate
            .metadata
            .insert_extra("file_name_match", detection.file_name_match);
        candidate.metadata.insert_extra(
            "relative_path",
            relative_display(&detection.path, &self.project_root),
        );
        Some(candidate)
    }
}
