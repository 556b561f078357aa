//! The end-to-end quarantine run.
//!
//! ```text
//! idle → locking → detecting → analyzing → verifying → deciding → moving → reporting → done
//!            ╰──────────────── any failure ─────────────────────────────────────────→ aborted
//! ```
//!
//! Every transition is logged and kept in the outcome's `state_history`. The
//! lock is held by a [`LockGuard`] for the whole run and released on every
//! exit path, including early returns with `?`.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::candidate::{merge_candidates, QuarantineCandidate};
use crate::config::Config;
use crate::detect::MockDetector;
use crate::diagnostics::{DiagnosticStage, ScanDiagnostic};
use crate::error::{QuarantineError, Result};
use crate::graph::{discover, DependencyAnalyzer, DependencyGraph, FileFilter, ReferenceIndex, UsageMap};
use crate::impact::{ImpactAnalyzer, PossibleBreak, Severity};
use crate::ingest::DETECTOR_EXTENSIONS;
use crate::lock::{validate_agent_id, LockGuard, LockManager};
use crate::quarantine::{QuarantineManager, QuarantineSession, QuarantinedFile, SessionStatus, SkipCause, SkipRecord};
use crate::safety::SafetyRules;
use crate::validation::{canonicalize_path, relative_display};
use crate::verify::{DatabaseVerifier, TableProbe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorState {
    Idle,
    Locking,
    Detecting,
    Analyzing,
    Verifying,
    Deciding,
    Moving,
    Reporting,
    Done,
    Aborted,
}

impl ExecutorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorState::Idle => "idle",
            ExecutorState::Locking => "locking",
            ExecutorState::Detecting => "detecting",
            ExecutorState::Analyzing => "analyzing",
            ExecutorState::Verifying => "verifying",
            ExecutorState::Deciding => "deciding",
            ExecutorState::Moving => "moving",
            ExecutorState::Reporting => "reporting",
            ExecutorState::Done => "done",
            ExecutorState::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutorState::Done | ExecutorState::Aborted)
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run switches.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Lock owner and session directory name; ASCII letters, digits, `-`, `_`
    pub agent: String,
    /// Root-relative directories to scan
    pub scopes: Vec<PathBuf>,
    pub dry_run: bool,
    pub skip_db_check: bool,
    /// Ignore the recent-modification grace period
    pub force: bool,
}

impl RunOptions {
    pub fn new(agent: impl Into<String>, scopes: Vec<PathBuf>) -> Self {
        Self {
            agent: agent.into(),
            scopes,
            ..Self::default()
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub session: QuarantineSession,
    pub quarantined: Vec<QuarantinedFile>,
    pub skipped: Vec<SkipRecord>,
    pub possible_breaks: Vec<PossibleBreak>,
    pub state_history: Vec<ExecutorState>,
    pub final_state: ExecutorState,
    /// Files discovery rejected or the analyzer could not parse
    pub diagnostics: Vec<ScanDiagnostic>,
}

pub struct QuarantineExecutor {
    project_root: PathBuf,
    config: Config,
    probe: Option<Box<dyn TableProbe>>,
    cancel: Arc<AtomicBool>,
    state: ExecutorState,
    history: Vec<ExecutorState>,
}

impl QuarantineExecutor {
    pub fn new(project_root: &Path, config: Config) -> Result<Self> {
        Ok(Self {
            project_root: canonicalize_path(project_root)?,
            config,
            probe: None,
            cancel: Arc::new(AtomicBool::new(false)),
            state: ExecutorState::Idle,
            history: vec![ExecutorState::Idle],
        })
    }

    /// Database used by the verifying stage. Without one the verifier fails
    /// open.
    pub fn with_probe(mut self, probe: Box<dyn TableProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Share a cancellation flag (set from a signal handler, typically).
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn state_history(&self) -> &[ExecutorState] {
        &self.history
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    fn transition(&mut self, next: ExecutorState) {
        tracing::info!(from = %self.state, to = %next, "executor state");
        self.state = next;
        self.history.push(next);
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run the whole pipeline once. Any error leaves the executor `aborted`.
    pub fn run(&mut self, options: &RunOptions) -> Result<RunOutcome> {
        match self.run_stages(options) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                tracing::error!(error = %e, code = e.code(), "quarantine run aborted");
                self.transition(ExecutorState::Aborted);
                Err(e)
            }
        }
    }

    fn run_stages(&mut self, options: &RunOptions) -> Result<RunOutcome> {
        validate_agent_id(&options.agent)?;
        let quarantine_root = self.config.quarantine_root(&self.project_root);
        let policy = self.config.policy.clone();
        let safety = SafetyRules::new(&policy.decision)?;

        self.transition(ExecutorState::Locking);
        let lock = LockManager::new(&quarantine_root, &options.agent, self.config.lock.stale_after())?;
        let guard: LockGuard = lock.acquire_guard()?;
        // the lock created the directory, so the canonical form now exists
        let quarantine_root = canonicalize_path(&quarantine_root)?;
        let manager = QuarantineManager::new(&self.project_root, &quarantine_root);

        self.transition(ExecutorState::Detecting);
        let filter = FileFilter::new(
            &self.project_root,
            &self.config.quarantine.include,
            &self.config.quarantine.exclude,
        )?
        .with_ignored_dir(&quarantine_root);
        let discovery = discover(&filter, &options.scopes, DETECTOR_EXTENSIONS);
        let mut diagnostics = discovery.diagnostics;
        tracing::info!(files = discovery.files.len(), scopes = options.scopes.len(), "discovery finished");

        let detector = MockDetector::new(&self.project_root, &policy.detector);
        let detected = detector.detect(&discovery.files);

        let analyzer = DependencyAnalyzer::new(&self.project_root, &policy.analyzer);
        let build = analyzer.build_graph(&discovery.files);
        diagnostics.extend(build.diagnostics);
        let graph = build.graph;
        let analyzed = analyzer.candidates(&graph);
        tracing::info!(
            detected = detected.len(),
            analyzed = analyzed.len(),
            nodes = graph.len(),
            "candidates proposed"
        );
        let mut candidates = merge_candidates(detected, analyzed);

        let mut session = manager.create_session(&options.agent, options.dry_run)?;

        self.transition(ExecutorState::Analyzing);
        attach_graph(&mut candidates, &graph);
        candidates.retain(|c| {
            if analyzer.is_entry_point(&c.path) {
                session.skip(c.path.clone(), SkipCause::EntryPoint, "entry point");
                return false;
            }
            true
        });
        if policy.decision.grace_period_days > 0 && !options.force {
            let grace = Duration::from_secs(u64::from(policy.decision.grace_period_days) * 24 * 60 * 60);
            candidates.retain(|c| {
                if modified_within(&c.path, grace) {
                    session.skip(
                        c.path.clone(),
                        SkipCause::GracePeriod,
                        format!("modified within the last {} days", policy.decision.grace_period_days),
                    );
                    return false;
                }
                true
            });
        }

        self.transition(ExecutorState::Verifying);
        if options.skip_db_check {
            tracing::info!("database verification skipped");
        } else {
            let verifier = DatabaseVerifier::new(self.probe.as_deref(), &policy.database);
            let report = verifier.verify_candidates(&mut candidates);
            tracing::info!(
                reachable = report.reachable,
                tables = report.tables.len(),
                "database verification finished"
            );
            for candidate in &candidates {
                if let Some(error) = &candidate.metadata.verification_error {
                    diagnostics.push(ScanDiagnostic::error(
                        relative_display(&candidate.path, &self.project_root),
                        DiagnosticStage::Verify,
                        error.clone(),
                    ));
                }
            }
        }

        self.transition(ExecutorState::Deciding);
        let root = self.project_root.clone();
        candidates.retain(|c| match safety.check(&relative_display(&c.path, &root)) {
            Some((cause, reason)) => {
                session.skip(c.path.clone(), cause, reason);
                false
            }
            None => true,
        });
        if policy.decision.search_references && !candidates.is_empty() {
            let filter = FileFilter::new(&root, &[], &[])?.with_ignored_dir(&quarantine_root);
            let searched = discover(&filter, &[root.clone()], DETECTOR_EXTENSIONS);
            let index = ReferenceIndex::build(&root, &searched.files, analyzer.resolver());
            candidates.retain(|c| {
                // importers inside the graph are dependents and go through the impact rules
                match index.find_referrer(&c.path, |r| graph.node(r).is_some()) {
                    Some(referrer) => {
                        session.skip(
                            c.path.clone(),
                            SkipCause::ReferencedBySearch,
                            format!("referenced from {}", relative_display(&referrer, &root)),
                        );
                        false
                    }
                    None => true,
                }
            });
            tracing::info!(files = index.files_searched(), "reference search finished");
        }

        let usage = graph.usage_map();
        let impact = ImpactAnalyzer::new(&self.project_root, &usage, &policy.impact);
        let analysis = impact.analyze(&candidates);
        let mut accepted: Vec<QuarantineCandidate> = analysis.safe.clone();
        for candidate in &analysis.risky {
            match risky_rejection(candidate, &analysis.possible_breaks, &policy.decision) {
                Some((cause, reason)) => session.skip(candidate.path.clone(), cause, reason),
                None => {
                    tracing::debug!(
                        path = %relative_display(&candidate.path, &self.project_root),
                        "risky candidate accepted"
                    );
                    accepted.push(candidate.clone());
                }
            }
        }
        accepted.sort_by(|a, b| a.path.cmp(&b.path));
        tracing::info!(
            accepted = accepted.len(),
            skipped = session.skipped.len(),
            breaks = analysis.possible_breaks.len(),
            "decisions made"
        );

        self.transition(ExecutorState::Moving);
        let mut quarantined = Vec::with_capacity(accepted.len());
        for (i, candidate) in accepted.iter().enumerate() {
            if self.cancelled() {
                tracing::warn!(remaining = accepted.len() - i, "cancellation requested, stopping moves");
                for rest in &accepted[i..] {
                    session.skip(rest.path.clone(), SkipCause::Cancelled, "run cancelled before move");
                }
                session.finalize(SessionStatus::Cancelled);
                break;
            }
            if options.dry_run {
                quarantined.push(manager.dry_run_file(&mut session, candidate));
                continue;
            }
            match manager.quarantine_file(&mut session, candidate) {
                Ok(file) => quarantined.push(file),
                Err(e) => {
                    tracing::warn!(path = %candidate.path.display(), error = %e, "move failed");
                    diagnostics.push(ScanDiagnostic::error(
                        relative_display(&candidate.path, &self.project_root),
                        DiagnosticStage::Move,
                        e.to_string(),
                    ));
                    session.skip(candidate.path.clone(), SkipCause::MoveFailed, e.to_string());
                }
            }
        }

        self.transition(ExecutorState::Reporting);
        if options.dry_run {
            session.possible_breaks = analysis.possible_breaks.clone();
            session.manifest.usage_map = usage;
            session.finalize(SessionStatus::Completed);
            tracing::info!(
                would_quarantine = quarantined.len(),
                "[DRY RUN] nothing was moved or written"
            );
        } else if let Err(e) = persist_session(&manager, &mut session, &usage, &analysis.possible_breaks) {
            salvage_session(&manager, &mut session, &e);
            return Err(e);
        }
        diagnostics.sort();

        guard.release()?;
        self.transition(ExecutorState::Done);
        tracing::info!(
            session = %session.id,
            status = %session.status,
            files = session.files_quarantined,
            "quarantine run finished"
        );

        Ok(RunOutcome {
            skipped: session.skipped.clone(),
            possible_breaks: analysis.possible_breaks,
            quarantined,
            session,
            state_history: self.history.clone(),
            final_state: self.state,
            diagnostics,
        })
    }
}

/// Write every session artifact and fold the session into the ledger.
fn persist_session(
    manager: &QuarantineManager,
    session: &mut QuarantineSession,
    usage: &UsageMap,
    breaks: &[PossibleBreak],
) -> Result<()> {
    manager.save_usage_map(session, usage)?;
    manager.save_possible_breaks(session, breaks)?;
    session.finalize(SessionStatus::Completed);
    manager.save_manifest(session)?;
    manager.generate_rollback_script(session)?;
    manager.save_summary(session)?;
    manager.update_cleanup_log(session)?;
    Ok(())
}

/// After a reporting failure: mark the session failed and write whatever
/// can still be written, so files that already moved stay restorable.
fn salvage_session(manager: &QuarantineManager, session: &mut QuarantineSession, error: &QuarantineError) {
    session.fail(error.to_string());
    tracing::error!(
        session = %session.id,
        moved = session.files_quarantined,
        error = %error,
        "reporting failed, writing a failed session"
    );
    if let Err(e) = manager.save_manifest(session) {
        tracing::error!(error = %e, "manifest not written");
    }
    if let Err(e) = manager.generate_rollback_script(session) {
        tracing::error!(error = %e, "rollback script not written");
    }
    if let Err(e) = manager.save_summary(session) {
        tracing::error!(error = %e, "summary not written");
    }
    if let Err(e) = manager.update_cleanup_log(session) {
        tracing::error!(error = %e, "ledger not updated");
    }
}

/// Copy graph edges onto candidates. Files outside the graph (json, sql,
/// unparseable sources) keep empty lists.
fn attach_graph(candidates: &mut [QuarantineCandidate], graph: &DependencyGraph) {
    for candidate in candidates.iter_mut() {
        if let Some(node) = graph.node(&candidate.path) {
            candidate.dependencies = node.imports.clone();
            candidate.dependents = node.dependents.clone();
        }
    }
}

fn modified_within(path: &Path, window: Duration) -> bool {
    let modified = match fs::metadata(path).and_then(|m| m.modified()) {
        Ok(t) => t,
        Err(_) => return false,
    };
    SystemTime::now()
        .duration_since(modified)
        .map(|age| age < window)
        .unwrap_or(true)
}

/// Why a risky candidate stays put, or `None` when it may be moved anyway.
fn risky_rejection(
    candidate: &QuarantineCandidate,
    breaks: &[PossibleBreak],
    policy: &crate::policy::DecisionPolicy,
) -> Option<(SkipCause, String)> {
    let critical = breaks
        .iter()
        .any(|b| b.file_path == candidate.path && b.severity == Severity::Critical);
    if critical {
        return Some((SkipCause::CriticalBreak, "critical break predicted".to_string()));
    }
    if candidate.dependents.len() > policy.max_risky_dependents {
        return Some((
            SkipCause::TooManyDependents,
            format!(
                "{} dependents (max {})",
                candidate.dependents.len(),
                policy.max_risky_dependents
            ),
        ));
    }
    if candidate.metadata.has_database_dependency() {
        return Some((SkipCause::DatabaseDependency, "uses the database".to_string()));
    }
    if candidate.confidence < policy.min_risky_confidence && !candidate.category.is_test_like() {
        return Some((
            SkipCause::LowConfidence,
            format!(
                "{} candidate at {}% confidence (needs {}%)",
                candidate.category, candidate.confidence, policy.min_risky_confidence
            ),
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CandidateSource, Category, RiskLevel};
    use crate::error::QuarantineError;
    use crate::impact::BreakType;
    use crate::policy::DecisionPolicy;
    use tempfile::TempDir;

    fn project() -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir_all(root.join("src/lib")).unwrap();
        fs::create_dir_all(root.join("src/tests")).unwrap();
        fs::write(
            root.join("src/tests/math.spec.ts"),
            "describe('math', () => { it('adds', () => { expect(1 + 1).toBe(2); }); });\n",
        )
        .unwrap();
        fs::write(root.join("src/lib/used.ts"), "export const used = 1;\n").unwrap();
        fs::write(
            root.join("src/lib/consumer.ts"),
            "import { used } from './used';\nexport const value = used;\n",
        )
        .unwrap();
        (temp, root)
    }

    fn options(dry_run: bool) -> RunOptions {
        RunOptions {
            dry_run,
            skip_db_check: true,
            force: true,
            ..RunOptions::new("backend", vec![PathBuf::from("src")])
        }
    }

    fn risky(dependents: usize, confidence: u8, category: Category) -> QuarantineCandidate {
        let mut c = QuarantineCandidate::new(
            PathBuf::from("/p/src/x.ts"),
            "x",
            category,
            RiskLevel::NeedsReview,
            confidence,
            CandidateSource::Analyzer,
        );
        c.dependents = (0..dependents).map(|i| PathBuf::from(format!("/p/src/d{i}.ts"))).collect();
        c
    }

    #[test]
    fn test_full_run_moves_test_file_and_walks_all_states() {
        let (_t, root) = project();
        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let outcome = executor.run(&options(false)).unwrap();

        assert_eq!(outcome.final_state, ExecutorState::Done);
        assert_eq!(
            outcome.state_history,
            vec![
                ExecutorState::Idle,
                ExecutorState::Locking,
                ExecutorState::Detecting,
                ExecutorState::Analyzing,
                ExecutorState::Verifying,
                ExecutorState::Deciding,
                ExecutorState::Moving,
                ExecutorState::Reporting,
                ExecutorState::Done,
            ]
        );
        let spec = root.join("src/tests/math.spec.ts");
        assert!(outcome.quarantined.iter().any(|f| f.original_path == spec));
        assert!(!spec.exists());
        assert!(root.join("src/lib/used.ts").exists());
        assert_eq!(outcome.session.status, SessionStatus::Completed);
        assert!(outcome.session.quarantine_dir.join("manifest.json").is_file());
        assert!(outcome.session.rollback_script.is_file());
        assert!(!root.join(".shared_quarantine/.lock").exists());
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let (_t, root) = project();
        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let outcome = executor.run(&options(true)).unwrap();

        assert!(!outcome.quarantined.is_empty());
        assert!(outcome
            .quarantined
            .iter()
            .all(|f| f.quarantine_path.to_string_lossy().starts_with("[DRY RUN] ")));
        assert!(root.join("src/tests/math.spec.ts").exists());
        assert!(!outcome.session.quarantine_dir.exists());
        assert!(!root.join(".shared_quarantine/cleanup-log.json").exists());
    }

    #[test]
    fn test_lock_conflict_aborts_before_analysis() {
        let (_t, root) = project();
        let qroot = root.join(".shared_quarantine");
        let other = LockManager::new(&qroot, "frontend", Duration::from_secs(3600))
            .unwrap()
            .with_pid(std::process::id() + 1);
        assert!(other.acquire_lock().unwrap());

        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let err = executor.run(&options(false)).unwrap_err();
        assert!(matches!(err, QuarantineError::LockHeld { .. }));
        assert_eq!(executor.state(), ExecutorState::Aborted);
        assert_eq!(
            executor.state_history(),
            &[ExecutorState::Idle, ExecutorState::Locking, ExecutorState::Aborted]
        );
        assert!(root.join("src/tests/math.spec.ts").exists());
        assert!(!qroot.join("backend").exists());
    }

    #[test]
    fn test_malformed_lock_blocks_run() {
        let (_t, root) = project();
        let qroot = root.join(".shared_quarantine");
        fs::create_dir_all(&qroot).unwrap();
        fs::write(qroot.join(".lock"), "garbage").unwrap();

        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let err = executor.run(&options(false)).unwrap_err();
        assert!(matches!(err, QuarantineError::MalformedLock { .. }));
        assert_eq!(executor.state(), ExecutorState::Aborted);
    }

    #[test]
    fn test_preset_cancellation_moves_nothing() {
        let (_t, root) = project();
        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        executor.cancel_flag().store(true, Ordering::SeqCst);
        let outcome = executor.run(&options(false)).unwrap();

        assert!(outcome.quarantined.is_empty());
        assert_eq!(outcome.session.status, SessionStatus::Cancelled);
        assert!(outcome.skipped.iter().any(|s| s.cause == SkipCause::Cancelled));
        assert!(root.join("src/tests/math.spec.ts").exists());
    }

    #[test]
    fn test_entry_points_are_skipped() {
        let (_t, root) = project();
        fs::create_dir_all(root.join("src/app/api/mock")).unwrap();
        fs::write(
            root.join("src/app/api/mock/route.ts"),
            "const mockData = jest.fn();\nexport const GET = () => mockData();\n",
        )
        .unwrap();

        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let outcome = executor.run(&options(false)).unwrap();
        assert!(root.join("src/app/api/mock/route.ts").exists());
        assert!(outcome
            .skipped
            .iter()
            .any(|s| s.cause == SkipCause::EntryPoint && s.path.ends_with("api/mock/route.ts")));
    }

    #[test]
    fn test_risky_rules() {
        let policy = DecisionPolicy::default();
        assert_eq!(risky_rejection(&risky(0, 85, Category::Unused), &[], &policy), None);
        assert_eq!(risky_rejection(&risky(0, 20, Category::Test), &[], &policy), None);
        assert_eq!(
            risky_rejection(&risky(4, 100, Category::Test), &[], &policy).map(|r| r.0),
            Some(SkipCause::TooManyDependents)
        );
        assert_eq!(
            risky_rejection(&risky(0, 50, Category::Unused), &[], &policy).map(|r| r.0),
            Some(SkipCause::LowConfidence)
        );

        let mut db = risky(0, 95, Category::Seed);
        db.metadata.has_database_queries = Some(true);
        assert_eq!(
            risky_rejection(&db, &[], &policy).map(|r| r.0),
            Some(SkipCause::DatabaseDependency)
        );

        let candidate = risky(1, 95, Category::Test);
        let critical = PossibleBreak {
            file_path: candidate.path.clone(),
            break_type: BreakType::ImportError,
            severity: Severity::Critical,
            description: "imported by an API route".to_string(),
            affected_files: candidate.dependents.clone(),
            suggested_fix: None,
        };
        assert_eq!(
            risky_rejection(&candidate, &[critical], &policy).map(|r| r.0),
            Some(SkipCause::CriticalBreak)
        );
    }

    #[test]
    fn test_grace_period_protects_fresh_files_by_default() {
        let (_t, root) = project();

        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let outcome = executor
            .run(&RunOptions {
                force: false,
                ..options(false)
            })
            .unwrap();
        assert!(outcome.quarantined.is_empty());
        assert!(outcome
            .skipped
            .iter()
            .any(|s| s.cause == SkipCause::GracePeriod && s.reason.contains("7 days")));
        assert!(root.join("src/tests/math.spec.ts").exists());

        let mut forced = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let outcome = forced.run(&options(false)).unwrap();
        assert!(!outcome.quarantined.is_empty());
    }

    #[test]
    fn test_agent_path_cannot_escape_quarantine_root() {
        let (_t, root) = project();
        let escaped = root.parent().unwrap().join(format!(
            "escaped-{}",
            root.file_name().unwrap().to_string_lossy()
        ));

        for agent in [escaped.to_string_lossy().to_string(), "../escaped".to_string()] {
            let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
            let err = executor
                .run(&RunOptions {
                    agent,
                    ..options(false)
                })
                .unwrap_err();
            assert!(matches!(err, QuarantineError::InvalidAgentId(_)));
            assert_eq!(executor.state_history(), &[ExecutorState::Idle, ExecutorState::Aborted]);
        }
        assert!(!escaped.exists());
        assert!(!root.parent().unwrap().join("escaped").exists());
        assert!(!root.join(".shared_quarantine").exists());
        assert!(root.join("src/tests/math.spec.ts").exists());
    }

    #[test]
    fn test_unverified_low_confidence_file_is_not_moved() {
        let (_t, root) = project();
        fs::write(root.join("src/lib/legacy.ts"), "export const legacy = 1;
").unwrap();

        // no database configured: verification fails open to needs-review
        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let outcome = executor
            .run(&RunOptions {
                skip_db_check: false,
                ..options(false)
            })
            .unwrap();

        let legacy = root.join("src/lib/legacy.ts");
        assert!(legacy.exists());
        assert!(outcome.quarantined.iter().all(|f| f.original_path != legacy));
        let skip = outcome.skipped.iter().find(|s| s.path == legacy).unwrap();
        assert_eq!(skip.cause, SkipCause::LowConfidence);
        // test files still pass the risky rules
        assert!(!root.join("src/tests/math.spec.ts").exists());
    }

    #[test]
    fn test_unreadable_candidate_gets_verify_diagnostic() {
        let (_t, root) = project();
        fs::create_dir_all(root.join("src/mocks")).unwrap();
        fs::write(root.join("src/mocks/mock-binary.ts"), [0xff, 0xfe, 0x00, 0x9f]).unwrap();

        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let outcome = executor
            .run(&RunOptions {
                skip_db_check: false,
                dry_run: true,
                ..options(false)
            })
            .unwrap();

        assert!(outcome.diagnostics.iter().any(|d| matches!(
            d,
            ScanDiagnostic::Error { path, stage: DiagnosticStage::Verify, .. } if path == "src/mocks/mock-binary.ts"
        )));
    }

    #[test]
    fn test_reporting_failure_leaves_restorable_failed_session() {
        let (_t, root) = project();
        let qroot = root.join(".shared_quarantine");
        // an unreadable ledger makes the last reporting step fail
        fs::create_dir_all(qroot.join("cleanup-log.json")).unwrap();

        let mut executor = QuarantineExecutor::new(&root, Config::default()).unwrap();
        let err = executor.run(&options(false)).unwrap_err();
        assert!(matches!(err, QuarantineError::Io { .. }));
        assert_eq!(executor.state(), ExecutorState::Aborted);
        assert!(!qroot.join(".lock").exists());

        let spec = root.join("src/tests/math.spec.ts");
        assert!(!spec.exists());

        let sessions: Vec<PathBuf> = fs::read_dir(qroot.join("backend"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(sessions.len(), 1);
        let session_dir = &sessions[0];
        let summary = fs::read_to_string(session_dir.join("summary.md")).unwrap();
        assert!(summary.contains("**Status**: failed"));
        assert!(summary.contains("## Errors"));
        assert!(session_dir.join("rollback.sh").is_file());

        let report = crate::quarantine::restore_session(session_dir).unwrap();
        assert!(report.failed.is_empty());
        assert!(spec.exists());
    }
}
