//! Status command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use sequester::lock::{LockManager, LockStatus};
use sequester::output::{generate_execution_id, output_json, JsonResponse, StatusResponse};
use sequester::quarantine::{format_bytes, read_cleanup_log};
use sequester::{Config, OutputFormat};

use crate::run_cmd::absolute;

/// Agent id used for read-only lock inspection; never written.
const STATUS_AGENT: &str = "status";

/// Show the lock state and ledger totals.
///
/// Usage: sequester status [--root DIR] [--quarantine-dir DIR]
pub fn run_status(
    root: PathBuf,
    quarantine_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    output_format: OutputFormat,
) -> Result<()> {
    let root = std::fs::canonicalize(&root)
        .with_context(|| format!("project root {} does not exist", root.display()))?;
    let mut config = Config::load(&root, config_path.as_deref())?;
    if let Some(dir) = &quarantine_dir {
        config.quarantine.dir = absolute(dir)?;
    }
    sequester::logging::init(&config.logging, false);

    let quarantine_root = config.quarantine_root(&root);
    let lock = LockManager::new(&quarantine_root, STATUS_AGENT, config.lock.stale_after())?;
    let lock_info = lock.get_lock_info()?;
    let ledger = read_cleanup_log(&quarantine_root)?;
    let response = StatusResponse::new(&quarantine_root, lock_info, ledger.as_ref());

    if output_format.is_json() {
        let exec_id = generate_execution_id();
        output_json(&JsonResponse::new(&response, &exec_id), output_format)?;
        return Ok(());
    }

    println!("quarantine root: {}", response.quarantine_root.display());
    match &response.lock {
        None => println!("lock: free"),
        Some(info) => {
            let state = match info.status {
                LockStatus::Active => "active",
                LockStatus::Stale => "stale",
            };
            println!("lock: {} (held by {}, pid {})", state, info.agent_id, info.pid);
        }
    }
    println!("sessions: {}", response.sessions);
    println!("files quarantined: {}", response.total_files_quarantined);
    println!("size recovered: {}", format_bytes(response.total_size_recovered));
    for (agent, stats) in &response.agents {
        let last = stats
            .last_run
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "  {}: {} sessions, {} files, last run {}",
            agent, stats.sessions, stats.files_quarantined, last
        );
    }
    Ok(())
}
