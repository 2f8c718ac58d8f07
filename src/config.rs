use std::path::Path;

use crate::error::Error;

/// Name of the optional config file in the target directory.
pub const CONFIG_FILE: &str = ".projref.toml";

/// Project configuration loaded from `.projref.toml`.
/// Include/exclude patterns are path prefixes applied to project files,
/// relative to the target directory and `/`-separated. They decide which
/// projects get repaired; every project is still indexed.
#[derive(Debug, Default)]
pub struct Config {
    /// Prefixes of projects never repaired.
    exclude: Vec<String>,
    /// Prefixes of projects to repair; empty means all.
    include: Vec<String>,
    /// Worker pool size; `None` lets rayon decide.
    pub threads: Option<usize>,
}

/// Raw TOML structure for `.projref.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjrefTomlConfig {
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    threads: Option<usize>,
}

impl Config {
    /// Parse config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        let raw: ProjrefTomlConfig = toml::from_str(content)?;
        return Ok(Self {
            exclude: raw.exclude,
            include: raw.include,
            threads: raw.threads,
        });
    }

    /// Load config from `.projref.toml` in the given root directory.
    /// Returns a default that repairs everything if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };

        tracing::debug!(path = %path.display(), "loaded config");
        return Self::from_toml(&content);
    }

    /// Check whether a project's references should be repaired.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_fix(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| return relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        return !self.exclude.iter().any(|p| return relative_path.starts_with(p.as_str()));
    }
}
