//! Rollback tests: both the generated rollback.sh and the native restore
//! must put every quarantined file back byte-for-byte.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use sequester::quarantine::hash_file;
use sequester::{restore_session, Config, QuarantineExecutor, RunOptions};
use tempfile::TempDir;
use walkdir::WalkDir;

fn setup() -> (TempDir, PathBuf, Config) {
    let temp = TempDir::new().unwrap();
    let base = fs::canonicalize(temp.path()).unwrap();
    let root = base.join("project");

    let files = [
        ("src/tests/user.test.ts", "test('user', () => { expect(1).toBe(1); });\n"),
        ("src/tests/it's quoted.spec.ts", "describe('q', () => { it('x', () => expect(true)); });\n"),
        ("src/mocks/handlers.ts", "export const handlers = [jest.fn()];\n"),
        ("src/lib/real.ts", "export const real = 1;\n"),
        ("src/index.ts", "import { real } from './lib/real';\nexport default real;\n"),
    ];
    for (rel, content) in files {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    let mut config = Config::default();
    config.quarantine.dir = base.join("quarantine");
    (temp, root, config)
}

fn hashes(root: &Path) -> BTreeMap<PathBuf, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), hash_file(e.path()).unwrap()))
        .collect()
}

fn run(root: &Path, config: Config) -> sequester::RunOutcome {
    QuarantineExecutor::new(root, config)
        .unwrap()
        .run(&RunOptions {
            skip_db_check: true,
            force: true,
            ..RunOptions::new("backend", vec![PathBuf::from("src")])
        })
        .unwrap()
}

#[test]
fn test_native_restore_is_inverse_of_run() {
    let (_temp, root, config) = setup();
    let before = hashes(&root);

    let outcome = run(&root, config);
    assert!(outcome.quarantined.len() >= 3);
    assert_ne!(hashes(&root), before);

    let report = restore_session(&outcome.session.quarantine_dir).unwrap();
    assert!(report.is_complete(), "failures: {:?}", report.failed);
    assert_eq!(report.restored.len(), outcome.quarantined.len());
    assert_eq!(hashes(&root), before);
}

#[cfg(unix)]
#[test]
fn test_rollback_script_is_inverse_of_run() {
    let (_temp, root, config) = setup();
    let before = hashes(&root);

    let outcome = run(&root, config);
    let status = std::process::Command::new("bash")
        .arg(&outcome.session.rollback_script)
        .status()
        .expect("bash available");
    assert!(status.success());
    assert_eq!(hashes(&root), before);
}

#[test]
fn test_restore_twice_reports_conflicts_not_damage() {
    let (_temp, root, config) = setup();
    let before = hashes(&root);

    let outcome = run(&root, config);
    assert!(restore_session(&outcome.session.quarantine_dir).unwrap().is_complete());

    // the quarantined copies are gone now, so nothing can be restored twice
    let again = restore_session(&outcome.session.quarantine_dir).unwrap();
    assert!(again.restored.is_empty());
    assert_eq!(again.failed.len(), outcome.quarantined.len());
    assert_eq!(hashes(&root), before);
}

#[test]
fn test_restore_keeps_tampered_file_in_quarantine() {
    let (_temp, root, config) = setup();
    let outcome = run(&root, config);
    let victim = &outcome.quarantined[0];
    fs::write(&victim.quarantine_path, "changed after the move").unwrap();

    let report = restore_session(&outcome.session.quarantine_dir).unwrap();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].path, victim.original_path);
    assert_eq!(report.failed[0].code, "SEQ-V-002");
    assert_eq!(report.restored.len(), outcome.quarantined.len() - 1);
    assert!(!victim.original_path.exists());
    assert!(victim.quarantine_path.exists());
}
