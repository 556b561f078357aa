//! Session allocation, file moves and session artifacts.

use std::fmt::{self, Write as _};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::ledger::{self, CleanupLog};
use super::rollback;
use super::session::{
    ManifestSummary, QuarantineSession, QuarantinedFile, SessionManifest, SessionStatus,
};
use crate::candidate::QuarantineCandidate;
use crate::error::{QuarantineError, Result};
use crate::graph::UsageMap;
use crate::impact::{render_report, PossibleBreak};
use crate::lock::{validate_agent_id, write_atomic};
use crate::validation::{relative_display, validate_path_within_root};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const USAGE_MAP_FILE: &str = "usage-map.json";
pub const BREAKS_REPORT_FILE: &str = "possibleBreaks.md";
pub const SUMMARY_FILE: &str = "summary.md";
pub const ROLLBACK_SCRIPT_FILE: &str = "rollback.sh";

const SESSION_DIR_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";
const DRY_RUN_HASH: &str = "dry-run-hash";

/// Hex sha-256 of a file's bytes, streamed.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| QuarantineError::io(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| QuarantineError::io(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

pub fn new_session_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", now.timestamp_millis(), &suffix[..9])
}

/// Human-readable byte count (`1.5 KB`).
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}

pub struct QuarantineManager {
    project_root: PathBuf,
    quarantine_root: PathBuf,
}

impl QuarantineManager {
    /// `project_root` must already be canonical.
    pub fn new(project_root: &Path, quarantine_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            quarantine_root: quarantine_root.to_path_buf(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn quarantine_root(&self) -> &Path {
        &self.quarantine_root
    }

    /// Allocate a session. Only non-dry runs create the session directory.
    pub fn create_session(&self, agent: &str, dry_run: bool) -> Result<QuarantineSession> {
        validate_agent_id(agent)?;
        let now = Utc::now();
        let id = new_session_id(now);
        let agent_dir = self.quarantine_root.join(agent);
        let stamp = now.format(SESSION_DIR_FORMAT).to_string();

        let quarantine_dir = if dry_run {
            agent_dir.join(&stamp)
        } else {
            fs::create_dir_all(&agent_dir).map_err(|e| QuarantineError::io(&agent_dir, e))?;
            allocate_dir(&agent_dir, &stamp)?
        };

        tracing::info!(session = %id, dir = %quarantine_dir.display(), dry_run, "session created");

        Ok(QuarantineSession {
            id: id.clone(),
            agent: agent.to_string(),
            timestamp: now,
            duration_ms: 0,
            files_quarantined: 0,
            size_recovered_bytes: 0,
            status: SessionStatus::Running,
            rollback_script: quarantine_dir.join(ROLLBACK_SCRIPT_FILE),
            quarantine_dir,
            manifest: SessionManifest {
                session_id: id,
                created_at: now,
                agent: agent.to_string(),
                project_root: Some(self.project_root.clone()),
                files: Vec::new(),
                usage_map: UsageMap::new(),
                summary: ManifestSummary::default(),
            },
            possible_breaks: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
            dry_run,
        })
    }

    /// Move one candidate into the session, preserving its path below the
    /// project root. Failures are appended to `session.errors` and returned.
    pub fn quarantine_file(
        &self,
        session: &mut QuarantineSession,
        candidate: &QuarantineCandidate,
    ) -> Result<QuarantinedFile> {
        match self.move_into(session, candidate) {
            Ok(file) => {
                tracing::info!(
                    from = %relative_display(&file.original_path, &self.project_root),
                    hash = %file.file_hash,
                    "quarantined"
                );
                session.record_file(file.clone());
                Ok(file)
            }
            Err(e) => {
                session.errors.push(format!(
                    "Failed to quarantine {}: {}",
                    candidate.path.display(),
                    e
                ));
                Err(e)
            }
        }
    }

    fn move_into(&self, session: &QuarantineSession, candidate: &QuarantineCandidate) -> Result<QuarantinedFile> {
        let original = validate_path_within_root(&candidate.path, &self.project_root)?;
        let stat = fs::metadata(&original).map_err(|e| QuarantineError::io(&original, e))?;
        if !stat.is_file() {
            return Err(QuarantineError::io(
                &original,
                io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let file_hash = hash_file(&original)?;

        let relative = original
            .strip_prefix(&self.project_root)
            .map_err(|_| QuarantineError::Config(format!("{} is outside the project root", original.display())))?;
        let target = session.quarantine_dir.join(relative);
        if target.exists() {
            return Err(QuarantineError::RestoreConflict(target));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| QuarantineError::io(parent, e))?;
        }
        fs::rename(&original, &target).map_err(|e| QuarantineError::io(&original, e))?;

        Ok(QuarantinedFile {
            original_path: original,
            quarantine_path: target,
            file_hash,
            size_bytes: stat.len(),
            reason: candidate.reason.clone(),
            category: candidate.category,
            risk_level: candidate.risk_level,
            dependencies: candidate.dependencies.clone(),
            dependents: candidate.dependents.clone(),
            moved_at: Utc::now(),
            metadata: record_metadata(candidate),
        })
    }

    /// The record a dry run reports in place of a move. Touches nothing.
    pub fn dry_run_file(&self, session: &mut QuarantineSession, candidate: &QuarantineCandidate) -> QuarantinedFile {
        let size_bytes = fs::metadata(&candidate.path).map(|m| m.len()).unwrap_or(0);
        let file = QuarantinedFile {
            original_path: candidate.path.clone(),
            quarantine_path: PathBuf::from(format!("[DRY RUN] {}", candidate.path.display())),
            file_hash: DRY_RUN_HASH.to_string(),
            size_bytes,
            reason: candidate.reason.clone(),
            category: candidate.category,
            risk_level: candidate.risk_level,
            dependencies: candidate.dependencies.clone(),
            dependents: candidate.dependents.clone(),
            moved_at: Utc::now(),
            metadata: record_metadata(candidate),
        };
        tracing::info!(path = %relative_display(&candidate.path, &self.project_root), "[DRY RUN] would quarantine");
        session.record_file(file.clone());
        file
    }

    pub fn save_manifest(&self, session: &QuarantineSession) -> Result<PathBuf> {
        let path = session.quarantine_dir.join(MANIFEST_FILE);
        write_json(&path, &session.manifest)?;
        Ok(path)
    }

    /// Persist the usage map and embed it in the manifest.
    pub fn save_usage_map(&self, session: &mut QuarantineSession, usage: &UsageMap) -> Result<PathBuf> {
        let path = session.quarantine_dir.join(USAGE_MAP_FILE);
        write_json(&path, usage)?;
        session.manifest.usage_map = usage.clone();
        Ok(path)
    }

    pub fn save_possible_breaks(&self, session: &mut QuarantineSession, breaks: &[PossibleBreak]) -> Result<PathBuf> {
        let path = session.quarantine_dir.join(BREAKS_REPORT_FILE);
        let report = render_report(breaks, &self.project_root, Utc::now());
        write_atomic(&path, report.as_bytes())?;
        session.possible_breaks = breaks.to_vec();
        Ok(path)
    }

    pub fn save_summary(&self, session: &QuarantineSession) -> Result<PathBuf> {
        let path = session.quarantine_dir.join(SUMMARY_FILE);
        write_atomic(&path, self.render_summary(session).as_bytes())?;
        Ok(path)
    }

    pub fn generate_rollback_script(&self, session: &QuarantineSession) -> Result<PathBuf> {
        rollback::write_rollback_script(session)
    }

    pub fn update_cleanup_log(&self, session: &mut QuarantineSession) -> Result<CleanupLog> {
        ledger::update_cleanup_log(&self.quarantine_root, session)
    }

    pub fn render_summary(&self, session: &QuarantineSession) -> String {
        let mut out = String::new();
        if self.write_summary(&mut out, session).is_err() {
            tracing::warn!(session = %session.id, "summary truncated");
        }
        out
    }

    fn write_summary(&self, out: &mut String, session: &QuarantineSession) -> fmt::Result {
        writeln!(out, "# {} Cleanup Summary\n", title_case(&session.agent))?;
        writeln!(out, "**Session ID**: {}", session.id)?;
        writeln!(out, "**Agent**: {}", session.agent)?;
        writeln!(out, "**Timestamp**: {}", session.timestamp.to_rfc3339())?;
        writeln!(out, "**Duration**: {}ms", session.duration_ms)?;
        writeln!(out, "**Status**: {}\n", session.status)?;

        out.push_str("## Statistics\n\n");
        writeln!(out, "- **Files Quarantined**: {}", session.files_quarantined)?;
        writeln!(out, "- **Size Recovered**: {}", format_bytes(session.size_recovered_bytes))?;
        writeln!(out, "- **Files Skipped**: {}", session.skipped.len())?;
        out.push_str("- **Categories**:\n");
        for (category, count) in &session.manifest.summary.categories {
            writeln!(out, "  - {}: {}", category, count)?;
        }
        out.push_str("- **Risk Levels**:\n");
        for (level, count) in &session.manifest.summary.risk_levels {
            writeln!(out, "  - {}: {}", level, count)?;
        }

        out.push_str("\n## Quarantined Files\n\n");
        for (i, file) in session.manifest.files.iter().enumerate() {
            writeln!(out, "### {}. {}\n", i + 1, relative_display(&file.original_path, &self.project_root))?;
            writeln!(out, "- **Category**: {}", file.category)?;
            writeln!(out, "- **Risk Level**: {}", file.risk_level)?;
            writeln!(out, "- **Reason**: {}", file.reason)?;
            writeln!(out, "- **Size**: {}", format_bytes(file.size_bytes))?;
            writeln!(out, "- **Dependencies**: {}", file.dependencies.len())?;
            writeln!(out, "- **Dependents**: {}\n", file.dependents.len())?;
        }

        if !session.skipped.is_empty() {
            out.push_str("## Skipped\n\n");
            for skip in &session.skipped {
                writeln!(out, "- `{}`: {}", relative_display(&skip.path, &self.project_root), skip.reason)?;
            }
            out.push('\n');
        }

        if !session.errors.is_empty() {
            out.push_str("## Errors\n\n");
            for error in &session.errors {
                writeln!(out, "- {}", error)?;
            }
            out.push('\n');
        }

        if !session.possible_breaks.is_empty() {
            writeln!(
                out,
                "## Breaking Changes\n\nFound {} potential breaking changes. See `{}` for details.\n",
                session.possible_breaks.len(),
                BREAKS_REPORT_FILE
            )?;
        }

        out.push_str("## Rollback\n\nTo roll this session back, run:\n\n```bash\n");
        writeln!(out, "./{}", ROLLBACK_SCRIPT_FILE)?;
        out.push_str("```\n\nor `sequester rollback <session dir>` for a hash-checked restore.\n");
        Ok(())
    }
}

/// Candidate metadata plus what the move itself knows.
fn record_metadata(candidate: &QuarantineCandidate) -> crate::candidate::CandidateMetadata {
    let mut metadata = candidate.metadata.clone();
    metadata.insert_extra("original_confidence", candidate.confidence);
    metadata.insert_extra("source", serde_json::json!(candidate.source));
    metadata
}

/// Create `<parent>/<stamp>`, falling back to `<stamp>-1`, `<stamp>-2`, ...
fn allocate_dir(parent: &Path, stamp: &str) -> Result<PathBuf> {
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            stamp.to_string()
        } else {
            format!("{}-{}", stamp, attempt)
        };
        let dir = parent.join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(QuarantineError::io(&dir, e)),
        }
    }
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| QuarantineError::serialization(path, e))?;
    write_atomic(path, &json)
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
