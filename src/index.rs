//! Identifier index: which project file declares which `ProjectGuid`.
//!
//! Built once per run from every located project, in parallel. Workers race
//! to insert into a `DashMap`; the entry API makes each insert atomic, so a
//! second project claiming an identifier is always reported as a conflict
//! instead of silently replacing the first. Once built the index is a plain
//! read-only map shared by all fix workers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rayon::prelude::*;

use crate::document::Document;
use crate::error::Error;
use crate::reference;
use crate::types::ProjectId;

/// Read-only map from project identifier to the absolute path of its project file.
#[derive(Debug)]
pub struct ProjectIndex {
    /// Identifier to absolute project path.
    entries: HashMap<ProjectId, PathBuf>,
}

impl ProjectIndex {
    /// Read each project's own identifier in parallel on the current rayon pool.
    ///
    /// # Errors
    ///
    /// Returns `Error::DuplicateProjectId` if two projects declare the same
    /// identifier (every project is read first, so the reported pair does not
    /// depend on scheduling), `Error::MissingProjectId` if a project declares none,
    /// or any load error for an unreadable project.
    pub fn build(projects: &[PathBuf]) -> Result<Self, Error> {
        let map: DashMap<ProjectId, PathBuf> = DashMap::with_capacity(projects.len());
        let conflicts: DashMap<ProjectId, Vec<Claimant>> = DashMap::new();

        projects.par_iter().try_for_each(|project| -> Result<(), Error> {
            let document = Document::load(project)?;
            let id = reference::own_project_id(&document)?;
            match map.entry(id.clone()) {
                Entry::Occupied(existing) => {
                    let claimant = (project.clone(), id.to_string());
                    conflicts.entry(existing.key().clone()).or_default().push(claimant);
                },
                Entry::Vacant(slot) => {
                    slot.insert(project.clone());
                },
            }
            return Ok(());
        })?;

        if let Some(err) = first_conflict(&map, conflicts) {
            return Err(err);
        }

        let entries: HashMap<ProjectId, PathBuf> = map.into_iter().collect();
        tracing::info!(projects = entries.len(), "built project index");
        return Ok(Self { entries });
    }

    /// Where the project with this identifier lives, if it was scanned.
    pub fn get(&self, id: &ProjectId) -> Option<&Path> {
        return self.entries.get(id).map(PathBuf::as_path);
    }

    /// Whether no projects were indexed.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Number of indexed projects.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }
}

/// A project claiming an identifier, with the identifier as that project spells it.
type Claimant = (PathBuf, String);

/// Report the conflict whose claimants sort first, naming its two
/// lowest-sorting claimants. Every claimant is gathered before choosing, so
/// the error is the same whichever worker inserted first.
fn first_conflict(map: &DashMap<ProjectId, PathBuf>, conflicts: DashMap<ProjectId, Vec<Claimant>>) -> Option<Error> {
    let mut claimed: Vec<Vec<Claimant>> = conflicts
        .into_iter()
        .map(|(id, mut claimants)| {
            if let Some(inserted) = map.get(&id) {
                claimants.push((inserted.value().clone(), inserted.key().to_string()));
            }
            claimants.sort();
            return claimants;
        })
        .collect();
    claimed.sort();

    let mut claimants = claimed.into_iter().next()?.into_iter();
    let ((first, id), (second, _)) = (claimants.next()?, claimants.next()?);
    tracing::debug!(id = %id, others = claimants.len(), "duplicate project id");
    return Some(Error::DuplicateProjectId { first, id, second });
}
