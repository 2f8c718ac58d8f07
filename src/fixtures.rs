//! Builders for on-disk project trees used by unit tests.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// A cached `ProjectReference`: (include path, target id, display name).
pub type Ref<'a> = (&'a str, &'a str, &'a str);

/// Render a legacy-style project that declares `id` and the given references.
pub fn project_xml(id: &str, refs: &[Ref<'_>]) -> String {
    let mut out = String::from(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<Project ToolsVersion=\"15.0\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n\
  <PropertyGroup>\n",
    );
    let _ = writeln!(out, "    <ProjectGuid>{id}</ProjectGuid>");
    out.push_str("  </PropertyGroup>\n");
    if !refs.is_empty() {
        out.push_str("  <ItemGroup>\n");
        for (include, target, name) in refs {
            let _ = writeln!(out, "    <ProjectReference Include=\"{include}\">");
            let _ = writeln!(out, "      <Project>{target}</Project>");
            let _ = writeln!(out, "      <Name>{name}</Name>");
            out.push_str("    </ProjectReference>\n");
        }
        out.push_str("  </ItemGroup>\n");
    }
    out.push_str("</Project>\n");
    return out;
}

/// Write a project under `root` and return its absolute path.
pub fn write_project(root: &Path, relative: &str, id: &str, refs: &[Ref<'_>]) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, project_xml(id, refs)).unwrap();
    return crate::paths::absolute_normalized(&path).unwrap();
}
