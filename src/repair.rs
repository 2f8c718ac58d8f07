//! Whole-tree runs: index every project, then repair every project.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::Config;
use crate::error::Error;
use crate::fixer;
use crate::index::ProjectIndex;
use crate::scanner;
use crate::types::{Mode, RepairReport};

/// Repair every stale reference under `root`, writing corrected projects.
///
/// # Errors
///
/// Returns the first fatal error from scanning, indexing, or any project.
pub fn fix(root: &Path, config: &Config) -> Result<RepairReport, Error> {
    return run(root, config, Mode::Fix);
}

/// Scan `root`, build the identifier index from every project, and run the
/// fixer over the projects the config selects on a dedicated worker pool. Any error aborts the run; projects
/// already saved before the failure stay saved.
///
/// # Errors
///
/// Returns `Error::ThreadPool` if the pool cannot be created, or the first
/// fatal error from scanning, indexing, or fixing.
pub fn run(root: &Path, config: &Config, mode: Mode) -> Result<RepairReport, Error> {
    let pool = build_pool(config.threads)?;
    return pool.install(|| -> Result<RepairReport, Error> {
        let projects = scanner::scan(root)?;
        let index = ProjectIndex::build(&projects)?;
        if index.is_empty() {
            tracing::warn!(root = %root.display(), "no project files found");
        }
        let selected = scanner::select_for_fix(root, &projects, config)?;
        let modified = repair_all(&selected, &index, mode)?;
        tracing::info!(?mode, indexed = index.len(), modified = modified.len(), "run complete");
        return Ok(RepairReport::new(mode, modified));
    });
}

/// Report every stale reference under `root` without writing anything.
///
/// # Errors
///
/// Returns the first fatal error from scanning, indexing, or any project.
pub fn validate(root: &Path, config: &Config) -> Result<RepairReport, Error> {
    return run(root, config, Mode::Validate);
}

/// Worker pool sized from config; `None` keeps rayon's default.
///
/// # Errors
///
/// Returns `Error::ThreadPool` if rayon refuses the configuration.
fn build_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, Error> {
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| return format!("projref-{i}"));
    if let Some(threads) = threads {
        builder = builder.num_threads(threads);
    }
    return Ok(builder.build()?);
}

/// Fix each project independently; the index is shared read-only.
///
/// # Errors
///
/// Returns the first error any project produces.
fn repair_all(projects: &[PathBuf], index: &ProjectIndex, mode: Mode) -> Result<Vec<PathBuf>, Error> {
    let outcomes = projects
        .par_iter()
        .map(|project| -> Result<Option<PathBuf>, Error> {
            let modified = fixer::fix_project(project, index, mode.persist())?;
            return Ok(modified.then(|| return project.clone()));
        })
        .collect::<Result<Vec<Option<PathBuf>>, Error>>()?;

    return Ok(outcomes.into_iter().flatten().collect());
}
