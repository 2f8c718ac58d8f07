//! Access to the identifier a project declares and the `ProjectReference`
//! items it contains.
//!
//! A reference looks like this in a legacy MSBuild project:
//!
//! ```xml
//! <ProjectReference Include="..\Lib\Lib.csproj">
//!   <Project>{7D6A2B0E-...}</Project>
//!   <Name>Lib</Name>
//! </ProjectReference>
//! ```
//!
//! `Project` is the ground truth; `Include` and `Name` are cached hints that
//! go stale when projects move.

use std::path::Path;

use crate::document::{Document, Element};
use crate::error::Error;
use crate::paths;
use crate::types::ProjectId;

/// Attribute holding the cached relative path to the referenced project.
const INCLUDE_ATTRIBUTE: &str = "Include";

/// Child element holding the cached display name of the referenced project.
const NAME_ELEMENT: &str = "Name";

/// Element a project uses to declare its own identifier.
const PROJECT_ID_ELEMENT: &str = "ProjectGuid";

/// Element for one project-to-project reference.
const REFERENCE_ELEMENT: &str = "ProjectReference";

/// Child element holding the referenced project's identifier.
const TARGET_ID_ELEMENT: &str = "Project";

/// One `ProjectReference` inside a loaded document, borrowed mutably so its
/// cached path and name can be rewritten in place.
pub struct ReferenceFragment<'a> {
    /// The `ProjectReference` element.
    element: &'a mut Element,
    /// The project file that contains this reference, for error messages.
    project: &'a Path,
}

impl ReferenceFragment<'_> {
    /// Rewrite the cached `Include` path, canonicalizing separators to `\`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Xml` if the element's attribute list is malformed.
    pub fn set_target_include(&mut self, value: &str) -> Result<(), Error> {
        let canonical = paths::to_msbuild_separators(value);
        return self.element.set_attribute(INCLUDE_ATTRIBUTE, &canonical).map_err(|source| {
            return Error::Xml { path: self.project.to_path_buf(), source };
        });
    }

    /// Rewrite the cached display name.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` if the reference has no `Name` element.
    pub fn set_target_name(&mut self, value: &str) -> Result<(), Error> {
        let Some(name) = self.element.first_descendant_mut(NAME_ELEMENT) else {
            return Err(self.malformed("a Name element"));
        };
        name.set_text(value);
        return Ok(());
    }

    /// The identifier of the project this reference points at.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` if there is no `Project` element,
    /// or `Error::Xml` if its text cannot be unescaped.
    pub fn target_id(&self) -> Result<ProjectId, Error> {
        let Some(element) = self.element.first_descendant(TARGET_ID_ELEMENT) else {
            return Err(self.malformed("a Project element"));
        };
        let text = element.text().map_err(|source| return self.xml_error(source))?;
        return Ok(ProjectId::new(&text));
    }

    /// The cached relative path to the referenced project, as stored.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` if there is no `Include` attribute,
    /// or `Error::Xml` if the attribute cannot be read.
    pub fn target_include(&self) -> Result<String, Error> {
        let value = self.element.attribute(INCLUDE_ATTRIBUTE).map_err(|source| return self.xml_error(source))?;
        return value.ok_or_else(|| return self.malformed("an Include attribute"));
    }

    /// The cached display name of the referenced project.
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReference` if there is no `Name` element,
    /// or `Error::Xml` if its text cannot be unescaped.
    pub fn target_name(&self) -> Result<String, Error> {
        let Some(element) = self.element.first_descendant(NAME_ELEMENT) else {
            return Err(self.malformed("a Name element"));
        };
        return element.text().map_err(|source| return self.xml_error(source));
    }

    /// Error naming the piece this reference lacks.
    fn malformed(&self, missing: &'static str) -> Error {
        return Error::MalformedReference { missing, project: self.project.to_path_buf() };
    }

    /// Wrap a quick-xml failure with the owning project.
    fn xml_error(&self, source: quick_xml::Error) -> Error {
        return Error::Xml { path: self.project.to_path_buf(), source };
    }
}

/// The identifier a project declares for itself.
///
/// # Errors
///
/// Returns `Error::MissingProjectId` if the document has no `ProjectGuid`,
/// or `Error::Xml` if its text cannot be unescaped.
pub fn own_project_id(document: &Document) -> Result<ProjectId, Error> {
    let Some(element) = document.first_descendant(PROJECT_ID_ELEMENT) else {
        return Err(Error::MissingProjectId { path: document.path().to_path_buf() });
    };
    let text = element.text().map_err(|source| {
        return Error::Xml { path: document.path().to_path_buf(), source };
    })?;
    return Ok(ProjectId::new(&text));
}

/// Every `ProjectReference` in the document, in document order.
/// `project` names the document in errors; pass the path it was loaded from.
pub fn reference_fragments<'a>(document: &'a mut Document, project: &'a Path) -> Vec<ReferenceFragment<'a>> {
    return document
        .descendants_mut(REFERENCE_ELEMENT)
        .into_iter()
        .map(|element| return ReferenceFragment { element, project })
        .collect();
}

#[cfg(test)]
mod tests {
    use super::*;

    const APP: &str = r#"<Project xmlns="http://schemas.microsoft.com/developer/msbuild/2003">
  <PropertyGroup>
    <ProjectGuid>{A1}</ProjectGuid>
  </PropertyGroup>
  <ItemGroup>
    <ProjectReference Include="..\Lib\Lib.csproj">
      <Project>{b2}</Project>
      <Name>Lib</Name>
    </ProjectReference>
    <ProjectReference Include="..\Util\Util.csproj">
      <Project>{C3}</Project>
      <Name>Util</Name>
    </ProjectReference>
  </ItemGroup>
</Project>
"#;

    fn parse(content: &str) -> Document {
        return Document::parse(Path::new("/src/App/App.csproj"), content).unwrap();
    }

    #[test]
    fn reads_own_project_id() {
        let doc = parse(APP);
        assert_eq!(own_project_id(&doc).unwrap(), ProjectId::new("{a1}"));
    }

    #[test]
    fn missing_own_project_id_names_the_file() {
        let doc = parse("<Project><PropertyGroup /></Project>");
        let err = own_project_id(&doc).unwrap_err();
        assert!(matches!(err, Error::MissingProjectId { ref path } if path.ends_with("App.csproj")));
    }

    #[test]
    fn fragments_are_read_in_document_order() {
        let mut doc = parse(APP);
        let project = doc.path().to_path_buf();
        let fragments = reference_fragments(&mut doc, &project);
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].target_id().unwrap().as_str(), "{b2}");
        assert_eq!(fragments[0].target_include().unwrap(), r"..\Lib\Lib.csproj");
        assert_eq!(fragments[0].target_name().unwrap(), "Lib");
        assert_eq!(fragments[1].target_name().unwrap(), "Util");
    }

    #[test]
    fn document_without_references_has_no_fragments() {
        let mut doc = parse("<Project><PropertyGroup><ProjectGuid>{A}</ProjectGuid></PropertyGroup></Project>");
        let project = doc.path().to_path_buf();
        assert!(reference_fragments(&mut doc, &project).is_empty());
    }

    #[test]
    fn each_missing_piece_is_reported() {
        let cases = [
            (r#"<ProjectReference Include="x.csproj"><Name>x</Name></ProjectReference>"#, "a Project element"),
            (r#"<ProjectReference Include="x.csproj"><Project>{X}</Project></ProjectReference>"#, "a Name element"),
            (r"<ProjectReference><Project>{X}</Project><Name>x</Name></ProjectReference>", "an Include attribute"),
        ];
        for (fragment, expected) in cases {
            let mut doc = parse(&format!("<Project><ItemGroup>{fragment}</ItemGroup></Project>"));
            let project = doc.path().to_path_buf();
            let fragments = reference_fragments(&mut doc, &project);
            let fragment = &fragments[0];
            let err = fragment
                .target_id()
                .and_then(|_| fragment.target_name())
                .and_then(|_| fragment.target_include())
                .unwrap_err();
            assert!(
                matches!(err, Error::MalformedReference { missing, ref project } if missing == expected && project.ends_with("App.csproj")),
                "expected {expected}, got {err}"
            );
        }
    }

    #[test]
    fn setters_rewrite_in_place_with_canonical_separators() {
        let mut doc = parse(APP);
        let project = doc.path().to_path_buf();
        {
            let mut fragments = reference_fragments(&mut doc, &project);
            fragments[0].set_target_include("../../libs/Lib/Lib.csproj").unwrap();
            fragments[0].set_target_name("Core").unwrap();
        }

        let fragments = reference_fragments(&mut doc, &project);
        assert_eq!(fragments[0].target_include().unwrap(), r"..\..\libs\Lib\Lib.csproj");
        assert_eq!(fragments[0].target_name().unwrap(), "Core");
        assert_eq!(fragments[1].target_name().unwrap(), "Util");
    }
}
