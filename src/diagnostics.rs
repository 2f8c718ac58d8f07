use std::path::Path;

use crate::config::CONFIG_FILE;
use crate::error::Error;

/// ANSI bold, used for markdown headings on a terminal.
const BOLD: &str = "\x1b[1m";
/// ANSI reset after a bold heading.
const RESET: &str = "\x1b[0m";

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where the user can
/// act on it, how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::DuplicateProjectId { first, id, second } => render_duplicate_project_id(first, id, second),
        Error::MalformedReference { missing, project } => render_malformed_reference(missing, project),
        Error::MissingProjectId { path } => render_missing_project_id(path),
        Error::TargetNotFound { path } => render_target_not_found(path),
        Error::TomlDe(e) => render_invalid_config(&e.to_string()),
        Error::UnresolvedReference { expected_path, id, project } => {
            render_unresolved_reference(expected_path, id, project)
        },
        _ => render_generic(e),
    };
}

/// Variants that need no extra context beyond their message.
fn render_generic(e: &Error) -> String {
    return match e {
        Error::Io(e) => format!("\
# Error: I/O

{e}
"),
        Error::Json(e) => format!("\
# Error: JSON Output

{e}
"),
        Error::MalformedDocument { path, reason } => format!("\
# Error: Malformed Project

`{}` is not well-formed XML: {reason}
", path.display()),

        Error::ProjectIo { path, source } => format!("\
# Error: Project I/O

Could not read or write `{}`: {source}
", path.display()),

        Error::ThreadPool(e) => format!("\
# Error: Worker Pool

{e}

## Fix

Pass a smaller `--threads` value or remove `threads` from `{CONFIG_FILE}`.
"),
        Error::Walk(e) => format!("\
# Error: Directory Walk

{e}
"),
        Error::Xml { path, source } => format!("\
# Error: Invalid XML

Could not parse `{}`: {source}
", path.display()),

        // Already handled in render_error, but need exhaustive match.
        _ => format!("\
# Error

{e}
"),
    };
}

/// Two projects claim one id; list both.
fn render_duplicate_project_id(first: &Path, id: &str, second: &Path) -> String {
    return format!("\
# Error: Duplicate Project Id

`{id}` is declared by more than one project:

- {}
- {}

References to `{id}` cannot be resolved while both exist.

## Fix

Delete the stale copy, or give one of the projects a new `ProjectGuid`.
", first.display(), second.display());
}

/// `.projref.toml` failed to parse; show the keys it accepts.
fn render_invalid_config(reason: &str) -> String {
    return format!("\
# Error: Invalid Config

`{CONFIG_FILE}` could not be parsed: {reason}

## Supported keys

    include = [\"src/\"]
    exclude = [\"src/legacy/\"]
    threads = 4
");
}

/// A reference is missing a piece; show a complete one.
fn render_malformed_reference(missing: &str, project: &Path) -> String {
    return format!("\
# Error: Malformed Project Reference

A `ProjectReference` in `{}` does not contain {missing}.

## Fix

Every reference needs an `Include` attribute plus `Project` and `Name` child elements:

    <ProjectReference Include=\"..\\Lib\\Lib.csproj\">
      <Project>{{00000000-0000-0000-0000-000000000000}}</Project>
      <Name>Lib</Name>
    </ProjectReference>
", project.display());
}

/// A project has no `ProjectGuid`.
fn render_missing_project_id(path: &Path) -> String {
    return format!("\
# Error: Missing Project Id

`{}` does not declare a `ProjectGuid`, so other projects cannot reference it by id.

## Fix

Add one to the project's first `PropertyGroup`:

    <ProjectGuid>{{00000000-0000-0000-0000-000000000000}}</ProjectGuid>
", path.display());
}

/// The directory argument does not exist.
fn render_target_not_found(path: &Path) -> String {
    return format!("\
# Error: Directory Not Found

`{}` does not exist or is not a directory.
", path.display());
}

/// A reference names an id no project declares.
fn render_unresolved_reference(expected_path: &Path, id: &str, project: &Path) -> String {
    return format!("\
# Error: Unresolved Project Reference

`{}` references project id `{id}`, but no scanned project declares it.

According to the reference it should be located at:

    {}

## Fix

Restore the deleted project, or remove the reference from `{}`.
", project.display(), expected_path.display(), project.display());
}
