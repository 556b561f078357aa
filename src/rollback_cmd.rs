//! Rollback command implementation

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use sequester::output::{generate_execution_id, output_json, JsonResponse, RollbackResponse};
use sequester::quarantine::restore_session;
use sequester::OutputFormat;

/// Restore a quarantine session from its manifest.
///
/// Usage: sequester rollback <SESSION_DIR>
///
/// Exits 1 when any file could not be restored; those files stay in the
/// session directory.
pub fn run_rollback(session_dir: PathBuf, output_format: OutputFormat) -> Result<ExitCode> {
    let report = restore_session(&session_dir)
        .with_context(|| format!("cannot roll back {}", session_dir.display()))?;
    let complete = report.is_complete();
    let response = RollbackResponse::new(&session_dir, report);

    if output_format.is_json() {
        let exec_id = generate_execution_id();
        output_json(&JsonResponse::new(&response, &exec_id), output_format)?;
    } else {
        println!("session {}", response.session_id);
        println!("restored: {}", response.restored.len());
        for path in &response.restored {
            println!("  {}", path.display());
        }
        if !response.failed.is_empty() {
            println!("failed: {}", response.failed.len());
            for failure in &response.failed {
                println!("  {} [{}] {}", failure.path.display(), failure.code, failure.error);
            }
        }
    }

    Ok(if complete { ExitCode::SUCCESS } else { ExitCode::from(1) })
}
