//! Reversing a session: the generated `rollback.sh` and the native,
//! hash-checked restore behind `sequester rollback`.

use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::manager::{hash_file, MANIFEST_FILE};
use super::session::{QuarantineSession, SessionManifest};
use crate::error::{QuarantineError, Result};
use crate::lock::write_atomic;
use crate::validation::{canonicalize_path, normalize_lexically, PathValidationError};

/// Single-quote for bash: `it's` → `'it'\''s'`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Script body that moves every manifest file back, in manifest order.
pub fn build_rollback_script(session: &QuarantineSession) -> String {
    let mut out = String::new();
    if write_script(&mut out, session).is_err() {
        tracing::warn!(session = %session.id, "rollback script truncated");
    }
    out
}

fn write_script(out: &mut String, session: &QuarantineSession) -> fmt::Result {
    let files = &session.manifest.files;
    out.push_str("#!/usr/bin/env bash\n");
    writeln!(out, "# Rollback for {} session {}", session.agent, session.id)?;
    writeln!(out, "# Generated at: {}", session.timestamp.to_rfc3339())?;
    out.push_str("set -euo pipefail\n\n");
    writeln!(
        out,
        "echo {}",
        shell_quote(&format!("Rolling back {} session {}...", session.agent, session.id))
    )?;
    out.push('\n');

    for file in files {
        let dir = file
            .original_path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());
        writeln!(out, "mkdir -p {}", shell_quote(&dir))?;
        writeln!(
            out,
            "mv {} {}",
            shell_quote(&file.quarantine_path.to_string_lossy()),
            shell_quote(&file.original_path.to_string_lossy())
        )?;
    }

    out.push('\n');
    writeln!(out, "echo {}", shell_quote(&format!("Restored {} files", files.len())))
}

/// Write `rollback.sh` into the session directory with mode 0755.
pub fn write_rollback_script(session: &QuarantineSession) -> Result<PathBuf> {
    let path = session.rollback_script.clone();
    write_atomic(&path, build_rollback_script(session).as_bytes())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .map_err(|e| QuarantineError::io(&path, e))?;
    }

    Ok(path)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreFailure {
    pub path: PathBuf,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreReport {
    pub session_id: String,
    pub restored: Vec<PathBuf>,
    pub failed: Vec<RestoreFailure>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub fn read_manifest(session_dir: &Path) -> Result<SessionManifest> {
    let path = session_dir.join(MANIFEST_FILE);
    let content = fs::read_to_string(&path).map_err(|e| QuarantineError::io(&path, e))?;
    serde_json::from_str(&content).map_err(|e| QuarantineError::serialization(&path, e))
}

/// Restore every file of a session, newest move first.
///
/// A file is only moved back when its current hash matches the manifest,
/// nothing exists at its original location, and both ends stay inside the
/// session directory and the recorded project root. Per-file failures are
/// reported, not fatal.
pub fn restore_session(session_dir: &Path) -> Result<RestoreReport> {
    let manifest = read_manifest(session_dir)?;
    let session_dir = canonicalize_path(session_dir)?;
    let mut report = RestoreReport {
        session_id: manifest.session_id.clone(),
        ..RestoreReport::default()
    };

    for file in manifest.files.iter().rev() {
        match restore_one(
            &session_dir,
            manifest.project_root.as_deref(),
            &file.quarantine_path,
            &file.original_path,
            &file.file_hash,
        ) {
            Ok(()) => {
                tracing::info!(path = %file.original_path.display(), "restored");
                report.restored.push(file.original_path.clone());
            }
            Err(e) => {
                tracing::warn!(path = %file.original_path.display(), error = %e, "restore failed");
                report.failed.push(RestoreFailure {
                    path: file.original_path.clone(),
                    error: e.to_string(),
                    code: e.code().to_string(),
                });
            }
        }
    }

    tracing::info!(
        session = %report.session_id,
        restored = report.restored.len(),
        failed = report.failed.len(),
        "restore finished"
    );
    Ok(report)
}

fn restore_one(
    session_dir: &Path,
    project_root: Option<&Path>,
    quarantined: &Path,
    original: &Path,
    expected_hash: &str,
) -> Result<()> {
    let quarantined = normalize_lexically(quarantined);
    let original = normalize_lexically(original);

    if !quarantined.starts_with(session_dir) {
        return Err(PathValidationError::OutsideRoot(
            quarantined.to_string_lossy().into_owned(),
            session_dir.to_string_lossy().into_owned(),
        )
        .into());
    }
    if let Some(root) = project_root {
        if !original.starts_with(normalize_lexically(root)) {
            return Err(PathValidationError::OutsideRoot(
                original.to_string_lossy().into_owned(),
                root.to_string_lossy().into_owned(),
            )
            .into());
        }
    }

    let actual = hash_file(&quarantined)?;
    if actual != expected_hash {
        return Err(QuarantineError::HashMismatch {
            path: quarantined,
            expected: expected_hash.to_string(),
            actual,
        });
    }
    if fs::symlink_metadata(&original).is_ok() {
        return Err(QuarantineError::RestoreConflict(original));
    }
    if let Some(parent) = original.parent() {
        fs::create_dir_all(parent).map_err(|e| QuarantineError::io(parent, e))?;
    }
    fs::rename(&quarantined, &original).map_err(|e| QuarantineError::io(&quarantined, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::{CandidateSource, Category, QuarantineCandidate, RiskLevel};
    use crate::quarantine::QuarantineManager;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, QuarantineManager) {
        let temp = TempDir::new().unwrap();
        let base = fs::canonicalize(temp.path()).unwrap();
        let project = base.join("project");
        fs::create_dir_all(project.join("src/lib")).unwrap();
        let manager = QuarantineManager::new(&project, &base.join("q"));
        (temp, project, manager)
    }

    fn quarantine(manager: &QuarantineManager, files: &[(&Path, &str)]) -> QuarantineSession {
        let mut session = manager.create_session("backend", false).unwrap();
        for (path, content) in files {
            fs::write(path, content).unwrap();
            let c = QuarantineCandidate::new(
                path.to_path_buf(),
                "unused",
                Category::Unused,
                RiskLevel::Safe,
                70,
                CandidateSource::Analyzer,
            );
            manager.quarantine_file(&mut session, &c).unwrap();
        }
        manager.save_manifest(&session).unwrap();
        session
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/a b/c.ts"), "'/a b/c.ts'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_script_lists_moves_in_order() {
        let (_t, project, manager) = setup();
        let a = project.join("src/a.ts");
        let b = project.join("src/lib/b's.ts");
        let session = quarantine(&manager, &[(&a, "a"), (&b, "b")]);

        let script = build_rollback_script(&session);
        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        let mv_a = script.find(&format!("mv {} {}", shell_quote(&session.quarantine_dir.join("src/a.ts").to_string_lossy()), shell_quote(&a.to_string_lossy()))).unwrap();
        let mv_b = script.find(r"b'\''s.ts").unwrap();
        assert!(mv_a < mv_b);
        assert!(script.contains(&format!("mkdir -p {}", shell_quote(&project.join("src/lib").to_string_lossy()))));
    }

    #[cfg(unix)]
    #[test]
    fn test_script_is_executable() {
        use std::os::unix::fs::PermissionsExt;
        let (_t, project, manager) = setup();
        let session = quarantine(&manager, &[(&project.join("src/a.ts"), "a")]);
        let path = write_rollback_script(&session).unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn test_restore_is_inverse_of_quarantine() {
        let (_t, project, manager) = setup();
        let a = project.join("src/a.ts");
        let b = project.join("src/lib/b.ts");
        let session = quarantine(&manager, &[(&a, "alpha"), (&b, "beta")]);
        assert!(!a.exists() && !b.exists());

        let report = restore_session(&session.quarantine_dir).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.restored, vec![b.clone(), a.clone()]);
        assert_eq!(fs::read_to_string(&a).unwrap(), "alpha");
        assert_eq!(fs::read_to_string(&b).unwrap(), "beta");
    }

    #[test]
    fn test_restore_refuses_modified_file() {
        let (_t, project, manager) = setup();
        let a = project.join("src/a.ts");
        let session = quarantine(&manager, &[(&a, "alpha")]);
        fs::write(session.quarantine_dir.join("src/a.ts"), "tampered").unwrap();

        let report = restore_session(&session.quarantine_dir).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].code, "SEQ-V-002");
        assert!(!a.exists());
        assert!(session.quarantine_dir.join("src/a.ts").exists());
    }

    #[test]
    fn test_restore_refuses_to_overwrite() {
        let (_t, project, manager) = setup();
        let a = project.join("src/a.ts");
        let session = quarantine(&manager, &[(&a, "alpha")]);
        fs::write(&a, "new file").unwrap();

        let report = restore_session(&session.quarantine_dir).unwrap();
        assert_eq!(report.failed[0].code, "SEQ-V-003");
        assert_eq!(fs::read_to_string(&a).unwrap(), "new file");
    }

    #[test]
    fn test_restore_missing_manifest_fails() {
        let temp = TempDir::new().unwrap();
        assert!(restore_session(temp.path()).is_err());
    }
}
