//! Per-project reference repair.
//!
//! For every `ProjectReference` in a project, the referenced identifier is
//! looked up in the [`ProjectIndex`] and the cached `Include` path and `Name`
//! are recomputed from where that project actually lives. Stale values are
//! rewritten in memory; the document is saved only when asked to and only
//! when something changed.

use std::path::Path;

use crate::document::Document;
use crate::error::Error;
use crate::index::ProjectIndex;
use crate::paths;
use crate::reference::{self, ReferenceFragment};

/// Repair every reference in one project.
/// Returns whether any reference was stale. With `persist` set, a stale
/// project is written back to `project`; otherwise the file is never touched.
///
/// # Errors
///
/// Returns `Error::UnresolvedReference` if a reference names an identifier
/// missing from the index, `Error::MalformedReference` if a reference lacks
/// its `Project`, `Name`, or `Include`, or any load/save error for `project`.
pub fn fix_project(project: &Path, index: &ProjectIndex, persist: bool) -> Result<bool, Error> {
    let mut document = Document::load(project)?;
    let project_dir = project.parent().unwrap_or_else(|| return Path::new(""));

    let mut modified = false;
    for mut fragment in reference::reference_fragments(&mut document, project) {
        if fix_fragment(&mut fragment, project, project_dir, index)? {
            modified = true;
        }
    }

    if modified && persist {
        document.save()?;
        tracing::info!(project = %project.display(), "saved repaired project");
    } else {
        tracing::debug!(project = %project.display(), modified, "checked project");
    }
    return Ok(modified);
}

/// Recompute one reference's cached path and name, rewriting whichever is stale.
///
/// # Errors
///
/// Returns `Error::UnresolvedReference` or `Error::MalformedReference`.
fn fix_fragment(
    fragment: &mut ReferenceFragment<'_>,
    project: &Path,
    project_dir: &Path,
    index: &ProjectIndex,
) -> Result<bool, Error> {
    let target_id = fragment.target_id()?;
    let cached_include = fragment.target_include()?;
    let cached_name = fragment.target_name()?;

    let Some(target) = index.get(&target_id) else {
        let claimed = paths::normalize_path(&project_dir.join(paths::from_msbuild_separators(&cached_include)));
        return Err(Error::UnresolvedReference {
            expected_path: claimed,
            id: target_id.to_string(),
            project: project.to_path_buf(),
        });
    };

    if target == project {
        tracing::warn!(project = %project.display(), id = %target_id, "project references itself");
    }

    let mut modified = false;

    let include = paths::relative_include(project_dir, target);
    if include != cached_include {
        tracing::info!(
            project = %project.display(),
            id = %target_id,
            from = %cached_include,
            to = %include,
            "stale reference path"
        );
        fragment.set_target_include(&include)?;
        modified = true;
    }

    let name = paths::display_name(target);
    if name != cached_name {
        tracing::info!(
            project = %project.display(),
            id = %target_id,
            from = %cached_name,
            to = %name,
            "stale reference name"
        );
        fragment.set_target_name(&name)?;
        modified = true;
    }

    return Ok(modified);
}
