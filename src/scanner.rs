use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::paths;

/// Project file extensions projref understands, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csproj", "fsproj", "sqlproj", "synproj", "vbproj"];

/// Find every supported project file under `root`.
/// Returned paths are absolute, normalized, and sorted; callers must not
/// depend on the order for correctness. Symlinked project files are included.
///
/// # Errors
///
/// Returns `Error::Io` if `root` cannot be made absolute,
/// or `Error::Walk` if any directory entry cannot be read.
pub fn scan(root: &Path) -> Result<Vec<PathBuf>, Error> {
    let root = paths::absolute_normalized(root)?;
    let mut projects = Vec::new();

    for entry in WalkDir::new(&root) {
        let entry = entry?;
        if !entry.path().is_file() || !is_project_file(entry.path()) {
            continue;
        }
        projects.push(entry.into_path());
    }

    projects.sort();
    tracing::debug!(root = %root.display(), count = projects.len(), "located project files");
    return Ok(projects);
}

/// The subset of `projects` whose references should be repaired, per the
/// config's include/exclude prefixes relative to `root`. Projects left out
/// here are still indexed, so references to them keep resolving.
///
/// # Errors
///
/// Returns `Error::Io` if `root` cannot be made absolute.
pub fn select_for_fix(root: &Path, projects: &[PathBuf], config: &Config) -> Result<Vec<PathBuf>, Error> {
    let root = paths::absolute_normalized(root)?;
    let selected: Vec<PathBuf> = projects
        .iter()
        .filter(|project| {
            let relative = project.strip_prefix(&root).unwrap_or(project.as_path());
            let relative_str = relative.to_string_lossy().replace('\\', "/");
            return config.should_fix(&relative_str);
        })
        .cloned()
        .collect();

    tracing::debug!(
        selected = selected.len(),
        skipped = projects.len().saturating_sub(selected.len()),
        "applied config filters"
    );
    return Ok(selected);
}

/// Whether a file name ends in `proj` and carries one of the supported extensions.
fn is_project_file(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| return n.to_string_lossy()) else {
        return false;
    };
    if !name.to_ascii_lowercase().ends_with("proj") {
        return false;
    }
    return path
        .extension()
        .map(|ext| return ext.to_string_lossy())
        .is_some_and(|ext| return SUPPORTED_EXTENSIONS.iter().any(|s| return s.eq_ignore_ascii_case(&ext)));
}
