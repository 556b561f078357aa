//! CLI argument parsing for sequester
//!
//! Defines the [`Command`] enum for `run`, `rollback` and `status`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use once_cell::sync::Lazy;
use sequester::version::version_detail;
use sequester::OutputFormat;

static LONG_VERSION: Lazy<String> = Lazy::new(version_detail);

#[derive(Debug, Parser)]
#[command(
    name = "sequester",
    version = LONG_VERSION.as_str(),
    about = "Move dead test, mock and seed code out of a JavaScript/TypeScript project, reversibly"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Detect, analyze and quarantine dead code for one agent scope
    Run {
        /// Agent name: lock owner and session directory (backend, frontend, shared, ...)
        agent: String,

        /// Project root
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Directory to scan, relative to the root; repeatable. Defaults to the agent's scope
        #[arg(long = "scope", value_name = "DIR")]
        scopes: Vec<PathBuf>,

        /// Report what would move without touching the filesystem
        #[arg(long)]
        dry_run: bool,

        /// Debug-level logging
        #[arg(short, long)]
        verbose: bool,

        /// Skip database verification entirely
        #[arg(long)]
        skip_db_check: bool,

        /// Ignore the recent-modification grace period
        #[arg(long)]
        force: bool,

        /// Quarantine root (default: <root>/.shared_quarantine)
        #[arg(long, value_name = "DIR")]
        quarantine_dir: Option<PathBuf>,

        /// Config file (default: <root>/sequester.toml if present)
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// SQLite database probed read-only for table usage
        #[arg(long, value_name = "PATH")]
        database: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        output: OutputFormat,
    },

    /// Restore every file of a quarantine session
    Rollback {
        /// Session directory containing manifest.json
        session_dir: PathBuf,

        #[arg(short, long)]
        verbose: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        output: OutputFormat,
    },

    /// Show the lock state and ledger totals
    Status {
        #[arg(long, default_value = ".")]
        root: PathBuf,

        #[arg(long, value_name = "DIR")]
        quarantine_dir: Option<PathBuf>,

        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        output: OutputFormat,
    },
}
