//! Path arithmetic shared by the locator, index, and fixer.
//!
//! MSBuild stores `Include` paths with `\` separators regardless of the host
//! platform. [`to_msbuild_separators`] is the only place that decides the
//! stored form, so cached and computed values are compared without any
//! re-normalization at read time.

use std::path::{Component, Path, PathBuf};

/// Separator MSBuild uses inside `Include` attributes.
pub const MSBUILD_SEPARATOR: char = '\\';

/// Make a path absolute against the current directory and collapse `.`/`..`.
/// Does not touch the filesystem beyond reading the current directory, so
/// symlinks are left as the user spelled them.
///
/// # Errors
///
/// Returns an I/O error if the current directory cannot be determined.
pub fn absolute_normalized(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    return Ok(normalize_path(&absolute));
}

/// Convert a stored MSBuild path into a host path that can be joined and displayed.
pub fn from_msbuild_separators(value: &str) -> PathBuf {
    if std::path::MAIN_SEPARATOR == MSBUILD_SEPARATOR {
        return PathBuf::from(value);
    }
    return PathBuf::from(value.replace(MSBUILD_SEPARATOR, std::path::MAIN_SEPARATOR_STR));
}

/// Display name MSBuild caches for a referenced project: the file name without extension.
pub fn display_name(project: &Path) -> String {
    return project
        .file_stem()
        .map(|stem| return stem.to_string_lossy().into_owned())
        .unwrap_or_default();
}

/// Collapse `.` and `..` components in a path without touching the filesystem.
/// Preserves leading `..` when there is nothing left to pop.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        push_normalized_component(&mut components, component);
    }
    return components.iter().collect();
}

/// Handle a single path component during normalization.
/// Pops the last component for `..` when possible, preserves it otherwise.
fn push_normalized_component<'a>(components: &mut Vec<Component<'a>>, component: Component<'a>) {
    match component {
        Component::CurDir => {},
        Component::ParentDir => {
            if matches!(components.last(), Some(Component::Normal(_))) {
                components.pop();
            } else if !matches!(components.last(), Some(Component::RootDir | Component::Prefix(_))) {
                components.push(component);
            }
        },
        other => components.push(other),
    }
}

/// Relative path from a project's directory to another project file, in MSBuild form.
///
/// Both inputs are expected to be absolute and normalized, which is what the
/// locator hands out. If no relative form exists (different Windows drives)
/// the target's absolute path is used, as MSBuild itself would.
pub fn relative_include(from_dir: &Path, target: &Path) -> String {
    let relative = pathdiff::diff_paths(target, from_dir).unwrap_or_else(|| return target.to_path_buf());
    return to_msbuild_separators(&relative.to_string_lossy());
}

/// Canonicalize every directory separator to `\`.
pub fn to_msbuild_separators(value: &str) -> String {
    return value.replace('/', "\\");
}
