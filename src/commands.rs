//! CLI commands for projref: validate and fix.

use std::path::Path;
use std::process::ExitCode;

use crate::config::Config;
use crate::error;
use crate::repair;
use crate::types::RepairReport;

/// How the list of stale projects is written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// A single JSON object with mode, count, and project paths.
    Json,
    /// One project path per line.
    #[default]
    Text,
}

/// Rewrite every stale reference under `dir` and list the projects saved.
///
/// # Errors
///
/// Returns `Error::TargetNotFound` if `dir` does not exist, or any fatal
/// error from config loading, scanning, indexing, or fixing.
pub fn fix(dir: &Path, threads: Option<usize>, format: OutputFormat) -> Result<ExitCode, error::Error> {
    let config = load_config(dir, threads)?;
    let report = repair::fix(dir, &config)?;
    print_report(&report, format)?;

    if report.count == 0 {
        eprintln!("All project references up to date, nothing to fix.");
    } else {
        eprintln!("Fixed {} project(s).", report.count);
    }
    return Ok(ExitCode::SUCCESS);
}

/// Report every project with a stale reference under `dir` without writing.
/// Exits 1 when anything is stale so CI can gate on it.
///
/// # Errors
///
/// Returns `Error::TargetNotFound` if `dir` does not exist, or any fatal
/// error from config loading, scanning, or indexing.
pub fn validate(dir: &Path, threads: Option<usize>, format: OutputFormat) -> Result<ExitCode, error::Error> {
    let config = load_config(dir, threads)?;
    let report = repair::validate(dir, &config)?;
    print_report(&report, format)?;

    if report.count == 0 {
        eprintln!("All project references up to date.");
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!();
    eprintln!("{} project(s) have stale references.", report.count);
    eprintln!("hint: run `projref fix {}` to rewrite them.", dir.display());
    return Ok(ExitCode::from(1));
}

/// Check the target exists, then load its `.projref.toml`; `--threads` wins
/// over the file.
///
/// # Errors
///
/// Returns `Error::TargetNotFound` or any config loading error.
fn load_config(dir: &Path, threads: Option<usize>) -> Result<Config, error::Error> {
    if !dir.is_dir() {
        return Err(error::Error::TargetNotFound { path: dir.to_path_buf() });
    }
    let mut config = Config::load(dir)?;
    if threads.is_some() {
        config.threads = threads;
    }
    return Ok(config);
}

/// Write the stale project list to stdout in the requested format.
///
/// # Errors
///
/// Returns `Error::Json` if the report cannot be serialized.
fn print_report(report: &RepairReport, format: OutputFormat) -> Result<(), error::Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            for project in &report.projects {
                println!("{}", project.display());
            }
        },
    }
    return Ok(());
}
