mod commands;
mod config;
mod diagnostics;
mod document;
mod error;
mod fixer;
#[cfg(test)]
mod fixtures;
mod index;
mod logging;
mod paths;
mod reference;
mod repair;
mod scanner;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::OutputFormat;

#[derive(Parser)]
#[command(name = "projref", about = "Repair stale MSBuild ProjectReference paths and names", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Output format for the list of affected projects
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Worker threads (default: one per CPU)
    #[arg(long, global = true)]
    threads: Option<usize>,
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite stale references in place
    Fix {
        /// Directory to scan recursively for project files
        dir: PathBuf,
    },
    /// Report projects with stale references without modifying them
    Validate {
        /// Directory to scan recursively for project files
        dir: PathBuf,
    },
}

/// Parse arguments, run the command, and map errors to exit status 2.
fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match &cli.command {
        Commands::Fix { dir } => commands::fix(dir, cli.threads, cli.format),
        Commands::Validate { dir } => commands::validate(dir, cli.threads, cli.format),
    };

    return result.unwrap_or_else(|e| {
        diagnostics::print_error(&e);
        return ExitCode::from(2);
    });
}
