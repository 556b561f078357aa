//! Integration tests for ignore rules and include/exclude globs.
//!
//! Tests:
//! 1. .gitignore and .ignore are honored by discovery and the executor
//! 2. exclude globs from the config keep files out of a run
//! 3. a quarantine root inside the project is never rescanned

use std::fs;
use std::path::{Path, PathBuf};

use sequester::graph::discover;
use sequester::ingest::DETECTOR_EXTENSIONS;
use sequester::{Config, FileFilter, QuarantineExecutor, RunOptions, ScanDiagnostic, SkipReason};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}

fn project() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    (temp, root)
}

fn run(root: &Path, config: Config) -> sequester::RunOutcome {
    QuarantineExecutor::new(root, config)
        .unwrap()
        .run(&RunOptions {
            skip_db_check: true,
            force: true,
            ..RunOptions::new("frontend", vec![PathBuf::from("src")])
        })
        .unwrap()
}

#[test]
fn test_gitignore_and_ignore_honored() {
    let (_temp, root) = project();
    fs::write(root.join(".gitignore"), "src/generated/\n").unwrap();
    fs::write(root.join(".ignore"), "*.local.ts\n").unwrap();

    let kept = write(&root, "src/tests/a.test.ts", "test('a', () => expect(1));\n");
    let generated = write(&root, "src/generated/mock-data.ts", "export const mockData = [];\n");
    let local = write(&root, "src/tests/b.local.ts", "test('b', () => expect(1));\n");

    let filter = FileFilter::new(&root, &[], &[]).unwrap();
    let discovery = discover(&filter, &[PathBuf::from("src")], DETECTOR_EXTENSIONS);
    assert_eq!(discovery.files, vec![kept.clone()]);
    assert!(discovery.diagnostics.contains(&ScanDiagnostic::skipped(
        "src/tests/b.local.ts".to_string(),
        SkipReason::IgnoredByGitignore
    )));

    let outcome = run(&root, Config::default());
    assert!(!kept.exists());
    assert!(generated.exists());
    assert!(local.exists());
    assert_eq!(outcome.quarantined.len(), 1);
}

#[test]
fn test_exclude_glob_keeps_files_out_of_run() {
    let (_temp, root) = project();
    let fixture = write(&root, "src/fixtures/users.fixture.ts", "export const sampleUsers = [];\n");
    let spec = write(&root, "src/tests/a.spec.ts", "describe('a', () => { it('x', () => expect(1)); });\n");

    let mut config = Config::default();
    config.quarantine.exclude = vec!["src/fixtures/**".to_string()];
    let outcome = run(&root, config);

    assert!(fixture.exists());
    assert!(!spec.exists());
    assert!(outcome.diagnostics.iter().any(|d| matches!(
        d,
        ScanDiagnostic::Skipped { path, reason: SkipReason::ExcludedByGlob } if path == "src/fixtures/users.fixture.ts"
    )));
}

#[test]
fn test_quarantine_inside_project_is_not_rescanned() {
    let (_temp, root) = project();
    write(&root, "src/tests/a.test.ts", "test('a', () => expect(1));\n");

    let mut config = Config::default();
    config.quarantine.dir = PathBuf::from("src/.attic");
    let first = run(&root, config.clone());
    assert_eq!(first.quarantined.len(), 1);
    assert!(first.session.quarantine_dir.starts_with(root.join("src/.attic")));

    let second = run(&root, config);
    assert!(second.quarantined.is_empty());
    assert!(first.quarantined[0].quarantine_path.exists());
}
