//! Cross-process lock behavior, modeled with distinct pids in one process.

use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use sequester::lock::{LockAttempt, LockManager, LockStatus};
use sequester::QuarantineError;
use tempfile::TempDir;

const HOUR: Duration = Duration::from_secs(3600);

#[test]
fn test_concurrent_acquire_has_one_winner() {
    for _ in 0..10 {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [("backend", 1001_u32), ("frontend", 1002_u32)]
            .into_iter()
            .map(|(agent, pid)| {
                let root = root.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let manager = LockManager::new(&root, agent, HOUR).unwrap().with_pid(pid);
                    barrier.wait();
                    manager.acquire_lock().unwrap()
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}

#[test]
fn test_stale_lock_is_taken_over() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".lock"), "frontend:1000:4242").unwrap();

    let manager = LockManager::new(temp.path(), "backend", HOUR).unwrap();
    let info = manager.get_lock_info().unwrap().unwrap();
    assert_eq!(info.status, LockStatus::Stale);

    match manager.try_acquire().unwrap() {
        LockAttempt::TookOver(previous) => assert_eq!(previous.agent_id, "frontend"),
        other => panic!("expected takeover, got {:?}", other),
    }
    assert_eq!(manager.get_lock_info().unwrap().unwrap().agent_id, "backend");
}

#[test]
fn test_release_by_non_owner_is_noop() {
    let temp = TempDir::new().unwrap();
    let owner = LockManager::new(temp.path(), "backend", HOUR).unwrap().with_pid(1);
    let other = LockManager::new(temp.path(), "shared", HOUR).unwrap().with_pid(2);

    assert!(owner.acquire_lock().unwrap());
    assert!(!other.release_lock().unwrap());
    assert!(owner.is_locked().unwrap());
    assert!(owner.release_lock().unwrap());
    assert!(!owner.is_locked().unwrap());
}

#[test]
fn test_malformed_lock_blocks_everyone() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join(".lock"), "not a lock").unwrap();
    let manager = LockManager::new(temp.path(), "backend", HOUR).unwrap();

    assert!(matches!(manager.acquire_lock(), Err(QuarantineError::MalformedLock { .. })));
    assert_eq!(fs::read_to_string(temp.path().join(".lock")).unwrap(), "not a lock");
}

#[test]
fn test_guard_releases_on_drop() {
    let temp = TempDir::new().unwrap();
    let manager = LockManager::new(temp.path(), "backend", HOUR).unwrap();
    {
        let _guard = manager.acquire_guard().unwrap();
        assert!(manager.is_locked().unwrap());
        let rival = LockManager::new(temp.path(), "frontend", HOUR).unwrap().with_pid(7);
        assert!(matches!(rival.acquire_guard(), Err(QuarantineError::LockHeld { .. })));
    }
    assert!(!manager.is_locked().unwrap());
}

#[test]
fn test_agent_ids_with_separators_are_rejected() {
    let temp = TempDir::new().unwrap();
    for bad in ["", "a:b", "has space", "tab\tbed", "../escaped", "/tmp/escaped", "nested/agent", ".."] {
        assert!(matches!(
            LockManager::new(temp.path(), bad, HOUR),
            Err(QuarantineError::InvalidAgentId(_))
        ));
    }
    assert!(LockManager::new(temp.path(), "ci_runner-2", HOUR).is_ok());
}
