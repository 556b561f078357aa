//! sequester CLI - safe dead-code quarantine
//!
//! Usage: sequester <run|rollback|status> [arguments]

mod cli;
mod rollback_cmd;
mod run_cmd;
mod status_cmd;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use run_cmd::RunArgs;
use sequester::config::LoggingConfig;

fn main() -> ExitCode {
    // clap exits with status 2 on usage errors
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            agent,
            root,
            scopes,
            dry_run,
            verbose,
            skip_db_check,
            force,
            quarantine_dir,
            config,
            database,
            output,
        } => {
            let args = RunArgs {
                agent,
                root,
                scopes,
                dry_run,
                verbose,
                skip_db_check,
                force,
                quarantine_dir,
                config,
                database,
                output,
            };
            match run_cmd::run_quarantine(args) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    ExitCode::from(1)
                }
            }
        }
        Command::Rollback {
            session_dir,
            verbose,
            output,
        } => {
            sequester::logging::init(&LoggingConfig::default(), verbose);
            match rollback_cmd::run_rollback(session_dir, output) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("Error: {:#}", e);
                    ExitCode::from(1)
                }
            }
        }
        Command::Status {
            root,
            quarantine_dir,
            config,
            output,
        } => {
            if let Err(e) = status_cmd::run_status(root, quarantine_dir, config, output) {
                eprintln!("Error: {:#}", e);
                return ExitCode::from(1);
            }
            ExitCode::SUCCESS
        }
    }
}
