//! Run command implementation

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sequester::output::{generate_execution_id, output_json, ErrorResponse, JsonResponse, RunResponse};
use sequester::quarantine::format_bytes;
use sequester::verify::SqliteProbe;
use sequester::{Config, OutputFormat, QuarantineError, QuarantineExecutor, RunOptions, SessionStatus};

pub struct RunArgs {
    pub agent: String,
    pub root: PathBuf,
    pub scopes: Vec<PathBuf>,
    pub dry_run: bool,
    pub verbose: bool,
    pub skip_db_check: bool,
    pub force: bool,
    pub quarantine_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub database: Option<PathBuf>,
    pub output: OutputFormat,
}

/// Resolve a user-supplied path against the working directory.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("cannot read the working directory")?
        .join(path))
}

/// Run the quarantine pipeline.
///
/// Usage: sequester run <AGENT> [--root DIR] [--scope DIR]... [--dry-run]
pub fn run_quarantine(args: RunArgs) -> Result<ExitCode> {
    let root = std::fs::canonicalize(&args.root)
        .with_context(|| format!("project root {} does not exist", args.root.display()))?;

    let mut config = Config::load(&root, args.config.as_deref())?;
    if let Some(dir) = &args.quarantine_dir {
        config.quarantine.dir = absolute(dir)?;
    }
    if let Some(db) = &args.database {
        config.database.path = Some(absolute(db)?);
    }
    sequester::logging::init(&config.logging, args.verbose);

    let scopes = if args.scopes.is_empty() {
        match config.agent_scope(&args.agent) {
            Ok(scopes) => scopes,
            Err(e @ QuarantineError::NoScope(_)) => {
                eprintln!("error: {}", e);
                return Ok(ExitCode::from(2));
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        args.scopes.clone()
    };

    let shutdown = Arc::new(AtomicBool::new(false));
    register_shutdown_signals(&shutdown)?;

    let mut executor = QuarantineExecutor::new(&root, config.clone())?.with_cancel_flag(Arc::clone(&shutdown));
    if !args.skip_db_check {
        if let Some(db_path) = config.database_path(&root) {
            match SqliteProbe::open(&db_path) {
                Ok(probe) => executor = executor.with_probe(Box::new(probe)),
                Err(e) => {
                    tracing::warn!(path = %db_path.display(), error = %e, "cannot open database, verification will fail open");
                }
            }
        }
    }

    let options = RunOptions {
        agent: args.agent.clone(),
        scopes,
        dry_run: args.dry_run,
        skip_db_check: args.skip_db_check,
        force: args.force,
    };

    let exec_id = generate_execution_id();
    let outcome = match executor.run(&options) {
        Ok(outcome) => outcome,
        Err(e) => {
            if args.output.is_json() {
                let response = ErrorResponse {
                    error: e.code().to_string(),
                    message: e.to_string(),
                };
                output_json(&JsonResponse::new(response, &exec_id), args.output)?;
            }
            return Err(anyhow::Error::new(e).context(format!("{} run aborted", args.agent)));
        }
    };

    let response = RunResponse::from_outcome(&outcome, &root);
    if args.output.is_json() {
        output_json(&JsonResponse::new(&response, &exec_id), args.output)?;
    } else {
        print_human(&response, &root);
    }

    if shutdown.load(Ordering::SeqCst) {
        tracing::warn!("run was interrupted; remaining candidates were left in place");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_human(response: &RunResponse, root: &Path) {
    let prefix = if response.dry_run { "[DRY RUN] " } else { "" };
    println!("{}session {} ({})", prefix, response.session_id, response.status);
    println!("project: {}", root.display());
    if let Some(dir) = &response.quarantine_dir {
        println!("quarantine: {}", dir.display());
    }

    let verb = if response.dry_run { "would quarantine" } else { "quarantined" };
    println!(
        "{}: {} files ({})",
        verb,
        response.files_quarantined,
        format_bytes(response.size_recovered_bytes)
    );
    for entry in &response.quarantined {
        println!("  {} [{}/{}] {}", entry.path, entry.category, entry.risk_level, entry.reason);
    }

    if !response.skipped.is_empty() {
        println!("skipped: {}", response.skipped.len());
        for entry in &response.skipped {
            println!("  {}: {}", entry.path, entry.reason);
        }
    }
    if response.impact.total > 0 {
        println!(
            "possible breaks: {} (critical {}, high {}, medium {}, low {})",
            response.impact.total,
            response.impact.critical,
            response.impact.high,
            response.impact.medium,
            response.impact.low
        );
    }
    for error in &response.errors {
        println!("error: {}", error);
    }
    if response.status == SessionStatus::Cancelled {
        println!("run cancelled; rerun to continue");
    }
    if let Some(script) = &response.rollback_script {
        if response.files_quarantined > 0 {
            println!("rollback: sequester rollback {}", script.parent().unwrap_or(script).display());
        }
    }
}

/// SIGINT/SIGTERM set `shutdown`; the executor stops before the next move.
fn register_shutdown_signals(shutdown: &Arc<AtomicBool>) -> Result<()> {
    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([signal::SIGTERM, signal::SIGINT])?;
        let shutdown = Arc::clone(shutdown);
        std::thread::spawn(move || {
            if signals.forever().next().is_some() {
                tracing::warn!("signal received, finishing the current move");
                shutdown.store(true, Ordering::SeqCst);
            }
        });
    }
    #[cfg(not(unix))]
    let _ = shutdown;
    Ok(())
}
