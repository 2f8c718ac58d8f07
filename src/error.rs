/// Crate-level error types for projref diagnostics.
use std::path::PathBuf;

/// All errors in projref carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the project file, identifier, or
/// reason for failure. Every variant is fatal for the whole run.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Two project files declare the same `ProjectGuid`.
    #[error(
        "duplicate project id `{id}`: declared by both {} and {}",
        first.display(),
        second.display()
    )]
    DuplicateProjectId {
        /// The project that sorts first of the two conflicting paths.
        first: PathBuf,
        /// The identifier declared twice.
        id: String,
        /// The project that sorts second of the two conflicting paths.
        second: PathBuf,
    },

    /// Underlying I/O error outside of any particular project file.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// The report could not be serialized as JSON.
    #[error("json: {0}")]
    Json(
        /// The wrapped serde_json error.
        #[from]
        serde_json::Error,
    ),

    /// A project file is not well-formed XML (an element is never closed).
    #[error("malformed project {}: {reason}", path.display())]
    MalformedDocument {
        /// Project file that failed to parse.
        path: PathBuf,
        /// Description of the structural problem.
        reason: String,
    },

    /// A `ProjectReference` lacks one of the pieces every reference must carry.
    #[error("a ProjectReference in {} does not contain {missing}; this is invalid", project.display())]
    MalformedReference {
        /// Name of the missing element or attribute, e.g. "a Name element".
        missing: &'static str,
        /// Project file that contains the malformed reference.
        project: PathBuf,
    },

    /// A project file does not declare its own `ProjectGuid`.
    #[error("project {} does not contain a ProjectGuid", path.display())]
    MissingProjectId {
        /// Project file without an identifier.
        path: PathBuf,
    },

    /// Reading or writing a specific project file failed.
    #[error("failed on project {}: {source}", path.display())]
    ProjectIo {
        /// Project file being read or written.
        path: PathBuf,
        /// The wrapped I/O error.
        source: std::io::Error,
    },

    /// The directory handed to `validate` or `fix` does not exist.
    #[error("target directory not found: {}", path.display())]
    TargetNotFound {
        /// The directory given on the command line.
        path: PathBuf,
    },

    /// The worker pool could not be created.
    #[error("thread pool: {0}")]
    ThreadPool(
        /// The wrapped rayon build error.
        #[from]
        rayon::ThreadPoolBuildError,
    ),

    /// TOML deserialization of `.projref.toml` failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A reference points at a project id that no scanned project declares.
    #[error(
        "project {}: project id `{id}` does not exist in the scanned tree; according to the reference it should be located at {}; was it deleted?",
        project.display(),
        expected_path.display()
    )]
    UnresolvedReference {
        /// Where the stale `Include` path says the target lives.
        expected_path: PathBuf,
        /// The identifier that could not be resolved.
        id: String,
        /// Project file that owns the broken reference.
        project: PathBuf,
    },

    /// Walking the target directory failed.
    #[error("walk: {0}")]
    Walk(
        /// The wrapped walkdir error.
        #[from]
        walkdir::Error,
    ),

    /// quick-xml failed to read or write a project file.
    #[error("xml: {}: {source}", path.display())]
    Xml {
        /// Project file being parsed or written.
        path: PathBuf,
        /// The wrapped XML error.
        source: quick_xml::Error,
    },
}
