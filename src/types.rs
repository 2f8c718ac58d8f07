/// Core domain types for projref identifiers, run modes, and reports.
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

/// A `ProjectGuid` as declared by a project or cited by a reference.
/// Equality and hashing ignore ASCII case, as MSBuild does for GUIDs;
/// the original spelling is kept for messages.
#[derive(Debug, Clone)]
pub struct ProjectId {
    /// Uppercased form used for equality and hashing.
    key: String,
    /// The identifier exactly as written in the project file.
    raw: String,
}

impl ProjectId {
    /// Wrap an identifier read from a project file.
    pub fn new(raw: &str) -> Self {
        return Self { key: raw.to_ascii_uppercase(), raw: raw.to_string() };
    }

    /// The identifier as written.
    pub fn as_str(&self) -> &str {
        return &self.raw;
    }
}

impl PartialEq for ProjectId {
    fn eq(&self, other: &Self) -> bool {
        return self.key == other.key;
    }
}

impl Eq for ProjectId {}

impl Hash for ProjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f.write_str(self.as_str());
    }
}

/// Whether corrections are written back or only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Rewrite stale references on disk.
    Fix,
    /// Report stale references without touching any file.
    Validate,
}

impl Mode {
    /// Whether modified documents are saved.
    pub const fn persist(self) -> bool {
        return matches!(self, Self::Fix);
    }
}

/// Outcome of a full run: the projects that were (or would be) modified.
#[derive(Debug, serde::Serialize)]
pub struct RepairReport {
    /// Number of affected projects.
    pub count: usize,
    /// Which mode produced this report.
    pub mode: Mode,
    /// Affected project files, sorted.
    pub projects: Vec<PathBuf>,
}

impl RepairReport {
    /// Build a report, sorting the affected projects for stable output.
    pub fn new(mode: Mode, mut projects: Vec<PathBuf>) -> Self {
        projects.sort();
        return Self { count: projects.len(), mode, projects };
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn project_ids_compare_case_insensitively() {
        let upper = ProjectId::new("{6F2B1C3A-0000-4000-8000-ABCDEF012345}");
        let lower = ProjectId::new("{6f2b1c3a-0000-4000-8000-abcdef012345}");
        assert_eq!(upper, lower);

        let mut set = HashSet::new();
        set.insert(upper);
        assert!(set.contains(&lower));
        assert_eq!(lower.to_string(), "{6f2b1c3a-0000-4000-8000-abcdef012345}");
    }

    #[test]
    fn only_fix_mode_persists() {
        assert!(Mode::Fix.persist());
        assert!(!Mode::Validate.persist());
    }

    #[test]
    fn report_sorts_projects_and_counts_them() {
        let report = RepairReport::new(Mode::Validate, vec![PathBuf::from("/b"), PathBuf::from("/a")]);
        assert_eq!(report.count, 2);
        assert_eq!(report.projects, vec![PathBuf::from("/a"), PathBuf::from("/b")]);
    }
}
