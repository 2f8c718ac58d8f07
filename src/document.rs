//! In-memory MSBuild project documents.
//!
//! A project file is read into a tree of quick-xml events. Elements are
//! addressable by local name; everything else (declaration, comments,
//! whitespace, text) is kept as the raw event it was read as, so writing an
//! untouched tree reproduces the input byte-for-byte.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::error::Error;

/// Byte order mark, common at the top of Visual Studio project files.
const BOM: &str = "\u{feff}";

/// Byte encoding a project file was read in; `save` writes it back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    /// UTF-16 big-endian, detected by its byte order mark.
    Utf16Be,
    /// UTF-16 little-endian, detected by its byte order mark.
    Utf16Le,
    /// UTF-8, with or without a byte order mark.
    Utf8,
}

impl Encoding {
    /// Pick the encoding from the leading bytes. UTF-16 is only recognized
    /// with a byte order mark; everything else is read as UTF-8.
    fn sniff(bytes: &[u8]) -> Self {
        return match bytes {
            [0xFE, 0xFF, ..] => Self::Utf16Be,
            [0xFF, 0xFE, ..] => Self::Utf16Le,
            _ => Self::Utf8,
        };
    }

    /// Decode file bytes into text. A byte order mark stays in the text as
    /// `U+FEFF`, which `parse` strips and remembers.
    fn decode(self, bytes: Vec<u8>) -> Result<String, std::io::Error> {
        let invalid = |reason: String| return std::io::Error::new(std::io::ErrorKind::InvalidData, reason);
        let from_pair: fn([u8; 2]) -> u16 = match self {
            Self::Utf8 => return String::from_utf8(bytes).map_err(|e| return invalid(e.to_string())),
            Self::Utf16Be => u16::from_be_bytes,
            Self::Utf16Le => u16::from_le_bytes,
        };
        let pairs = bytes.chunks_exact(2);
        if !pairs.remainder().is_empty() {
            return Err(invalid("UTF-16 content has an odd number of bytes".to_string()));
        }
        let units = pairs.filter_map(|pair| return <[u8; 2]>::try_from(pair).ok()).map(from_pair);
        return char::decode_utf16(units)
            .collect::<Result<String, _>>()
            .map_err(|e| return invalid(e.to_string()));
    }

    /// Encode rendered text back into file bytes.
    fn encode(self, text: &str) -> Vec<u8> {
        let to_pair: fn(u16) -> [u8; 2] = match self {
            Self::Utf8 => return text.as_bytes().to_vec(),
            Self::Utf16Be => u16::to_be_bytes,
            Self::Utf16Le => u16::to_le_bytes,
        };
        return text.encode_utf16().flat_map(to_pair).collect();
    }
}

/// A loaded project file. Owned by exactly one worker for the duration of a fix.
#[derive(Debug)]
pub struct Document {
    /// Whether the file started with a byte order mark.
    bom: bool,
    /// Encoding the file was read in.
    encoding: Encoding,
    /// Top-level nodes: the declaration, the root element, and surrounding whitespace.
    nodes: Vec<Node>,
    /// Where the document was loaded from and where `save` writes it.
    path: PathBuf,
}

/// One XML element and everything between its start and end tags.
#[derive(Debug)]
pub struct Element {
    /// Child elements, text, and comments in document order.
    children: Vec<Node>,
    /// Closing tag; `None` for a self-closing element.
    end: Option<BytesEnd<'static>>,
    /// Opening tag including its attributes, as read.
    start: BytesStart<'static>,
}

/// A node in the document tree.
#[derive(Debug)]
enum Node {
    /// A nested element.
    Element(Element),
    /// Any other event (text, comment, declaration, processing instruction).
    Other(Event<'static>),
}

impl Document {
    /// Every element with the given local name, in document order.
    /// Matching does not descend into an element that itself matches.
    #[cfg(test)]
    pub fn descendants(&self, name: &str) -> Vec<&Element> {
        let mut found = Vec::new();
        collect_descendants(&self.nodes, name, &mut found);
        return found;
    }

    /// Mutable variant of [`Document::descendants`].
    pub fn descendants_mut(&mut self, name: &str) -> Vec<&mut Element> {
        let mut found = Vec::new();
        collect_descendants_mut(&mut self.nodes, name, &mut found);
        return found;
    }

    /// The first element with the given local name, if any.
    pub fn first_descendant(&self, name: &str) -> Option<&Element> {
        return first_in(&self.nodes, name);
    }

    /// Read and parse a project file.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProjectIo` if the file cannot be read or is neither
    /// UTF-8 nor BOM-marked UTF-16, `Error::Xml` if it is not valid XML,
    /// or `Error::MalformedDocument` if an element is never closed.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let io_error = |source| return Error::ProjectIo { path: path.to_path_buf(), source };
        let bytes = std::fs::read(path).map_err(io_error)?;
        let encoding = Encoding::sniff(&bytes);
        let content = encoding.decode(bytes).map_err(io_error)?;

        let mut document = Self::parse(path, &content)?;
        document.encoding = encoding;
        return Ok(document);
    }

    /// Parse project XML that was read from `path`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Xml` if the content is not valid XML,
    /// or `Error::MalformedDocument` if an element is never closed.
    pub fn parse(path: &Path, content: &str) -> Result<Self, Error> {
        let (bom, body) = match content.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, content),
        };

        let mut reader = Reader::from_str(body);
        let mut open: Vec<Element> = Vec::new();
        let mut roots: Vec<Node> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|source| {
                return Error::Xml { path: path.to_path_buf(), source };
            })?;
            match event {
                Event::Eof => break,
                Event::Empty(start) => {
                    let element = Element { children: Vec::new(), end: None, start: start.into_owned() };
                    push_node(&mut open, &mut roots, Node::Element(element));
                },
                Event::End(end) => {
                    let Some(mut element) = open.pop() else {
                        return Err(Error::MalformedDocument {
                            path: path.to_path_buf(),
                            reason: "closing tag without a matching opening tag".to_string(),
                        });
                    };
                    element.end = Some(end.into_owned());
                    push_node(&mut open, &mut roots, Node::Element(element));
                },
                Event::Start(start) => {
                    open.push(Element { children: Vec::new(), end: None, start: start.into_owned() });
                },
                other => push_node(&mut open, &mut roots, Node::Other(other.into_owned())),
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(Error::MalformedDocument {
                path: path.to_path_buf(),
                reason: format!("element <{}> is never closed", unclosed.name()),
            });
        }

        return Ok(Self { bom, encoding: Encoding::Utf8, nodes: roots, path: path.to_path_buf() });
    }

    /// The file this document was loaded from.
    pub fn path(&self) -> &Path {
        return &self.path;
    }

    /// Write the document back to the file it was loaded from.
    ///
    /// # Errors
    ///
    /// Returns `Error::Xml` if serialization fails,
    /// or `Error::ProjectIo` if the file cannot be written.
    pub fn save(&self) -> Result<(), Error> {
        let bytes = self.serialize()?;
        std::fs::write(&self.path, bytes).map_err(|source| {
            return Error::ProjectIo { path: self.path.clone(), source };
        })?;
        return Ok(());
    }

    /// Render the document in the encoding it was read in, including the
    /// byte order mark if it had one.
    ///
    /// # Errors
    ///
    /// Returns `Error::Xml` if an event cannot be written.
    pub fn serialize(&self) -> Result<Vec<u8>, Error> {
        let mut writer = Writer::new(Vec::new());
        write_nodes(&mut writer, &self.nodes).map_err(|source| {
            return Error::Xml { path: self.path.clone(), source };
        })?;
        let rendered = String::from_utf8(writer.into_inner()).map_err(|e| {
            return Error::MalformedDocument { path: self.path.clone(), reason: e.to_string() };
        })?;

        let mut text = String::with_capacity(rendered.len().saturating_add(BOM.len()));
        if self.bom {
            text.push_str(BOM);
        }
        text.push_str(&rendered);
        return Ok(self.encoding.encode(&text));
    }
}

impl Element {
    /// Unescaped value of an attribute matched by its exact (qualified) name.
    ///
    /// # Errors
    ///
    /// Returns a quick-xml error if the attribute list or value is malformed.
    pub fn attribute(&self, key: &str) -> Result<Option<String>, quick_xml::Error> {
        let Some(attr) = self.start.try_get_attribute(key)? else {
            return Ok(None);
        };
        return Ok(Some(attr.unescape_value()?.into_owned()));
    }

    /// First element with the given local name beneath this one.
    pub fn first_descendant(&self, name: &str) -> Option<&Element> {
        return first_in(&self.children, name);
    }

    /// Mutable variant of [`Element::first_descendant`].
    pub fn first_descendant_mut(&mut self, name: &str) -> Option<&mut Element> {
        return first_in_mut(&mut self.children, name);
    }

    /// Whether this element's local name (namespace prefix ignored) is `name`.
    pub fn is_named(&self, name: &str) -> bool {
        return self.start.local_name().as_ref() == name.as_bytes();
    }

    /// Qualified tag name, for messages.
    pub fn name(&self) -> String {
        return String::from_utf8_lossy(self.start.name().as_ref()).into_owned();
    }

    /// Set an attribute, replacing its value in place or appending it.
    /// Other attributes keep their order and raw values.
    ///
    /// # Errors
    ///
    /// Returns a quick-xml error if the existing attribute list is malformed.
    pub fn set_attribute(&mut self, key: &str, value: &str) -> Result<(), quick_xml::Error> {
        let existing = self
            .start
            .attributes()
            .map(|attr| return attr.map(|a| return (a.key.as_ref().to_vec(), a.value.into_owned())))
            .collect::<Result<Vec<(Vec<u8>, Vec<u8>)>, _>>()?;

        self.start.clear_attributes();
        let mut replaced = false;
        for (attr_key, raw_value) in &existing {
            if attr_key.as_slice() == key.as_bytes() {
                self.start.push_attribute((key, value));
                replaced = true;
            } else {
                push_raw_attribute(&mut self.start, attr_key, raw_value)?;
            }
        }
        if !replaced {
            self.start.push_attribute((key, value));
        }
        return Ok(());
    }

    /// Replace all content of this element with a single text node.
    /// A self-closing element gains an explicit closing tag.
    pub fn set_text(&mut self, value: &str) {
        self.children = vec![Node::Other(Event::Text(BytesText::new(value).into_owned()))];
        if self.end.is_none() {
            self.end = Some(self.start.to_end().into_owned());
        }
    }

    /// Concatenated, unescaped text of this element and all its descendants.
    ///
    /// # Errors
    ///
    /// Returns a quick-xml error if a text node contains an invalid escape.
    pub fn text(&self) -> Result<String, quick_xml::Error> {
        let mut out = String::new();
        append_text(&self.children, &mut out)?;
        return Ok(out);
    }
}

/// Append unescaped text and CDATA content in document order.
fn append_text(nodes: &[Node], out: &mut String) -> Result<(), quick_xml::Error> {
    for node in nodes {
        match node {
            Node::Element(element) => append_text(&element.children, out)?,
            Node::Other(Event::CData(cdata)) => out.push_str(&String::from_utf8_lossy(cdata)),
            Node::Other(Event::Text(text)) => out.push_str(&text.unescape()?),
            Node::Other(_) => {},
        }
    }
    return Ok(());
}

#[cfg(test)]
/// Gather matching elements, not descending into a match.
fn collect_descendants<'a>(nodes: &'a [Node], name: &str, found: &mut Vec<&'a Element>) {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.is_named(name) {
                found.push(element);
            } else {
                collect_descendants(&element.children, name, found);
            }
        }
    }
}

/// Mutable variant of `collect_descendants`; matches are disjoint borrows.
fn collect_descendants_mut<'a>(nodes: &'a mut [Node], name: &str, found: &mut Vec<&'a mut Element>) {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.is_named(name) {
                found.push(element);
            } else {
                collect_descendants_mut(&mut element.children, name, found);
            }
        }
    }
}

/// Depth-first search for the first element with a local name.
fn first_in<'a>(nodes: &'a [Node], name: &str) -> Option<&'a Element> {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.is_named(name) {
                return Some(element);
            }
            if let Some(found) = first_in(&element.children, name) {
                return Some(found);
            }
        }
    }
    return None;
}

/// Mutable variant of [`first_in`].
fn first_in_mut<'a>(nodes: &'a mut [Node], name: &str) -> Option<&'a mut Element> {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.is_named(name) {
                return Some(element);
            }
            if let Some(found) = first_in_mut(&mut element.children, name) {
                return Some(found);
            }
        }
    }
    return None;
}

/// Attach a finished node to the innermost open element, or to the top level.
fn push_node(open: &mut [Element], roots: &mut Vec<Node>, node: Node) {
    match open.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

/// Re-append an attribute with its original escaped value.
/// Values that contain a double quote were single-quoted in the source and
/// are re-escaped instead, since the writer always uses double quotes.
fn push_raw_attribute(
    start: &mut BytesStart<'static>,
    key: &[u8],
    raw_value: &[u8],
) -> Result<(), quick_xml::Error> {
    if raw_value.contains(&b'"') {
        let key_str = String::from_utf8_lossy(key);
        let value = Attribute { key: QName(key), value: Cow::Borrowed(raw_value) }.unescape_value()?;
        start.push_attribute((key_str.as_ref(), value.as_ref()));
    } else {
        start.push_attribute(Attribute { key: QName(key), value: Cow::Borrowed(raw_value) });
    }
    return Ok(());
}

/// Write nodes back as events; elements become start, children, end.
fn write_nodes(writer: &mut Writer<Vec<u8>>, nodes: &[Node]) -> Result<(), quick_xml::Error> {
    for node in nodes {
        match node {
            Node::Element(element) => match &element.end {
                None => writer.write_event(Event::Empty(element.start.borrow()))?,
                Some(end) => {
                    writer.write_event(Event::Start(element.start.borrow()))?;
                    write_nodes(writer, &element.children)?;
                    writer.write_event(Event::End(end.borrow()))?;
                },
            },
            Node::Other(event) => writer.write_event(event)?,
        }
    }
    return Ok(());
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\r\n\
<Project ToolsVersion=\"15.0\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\r\n\
  <!-- generated -->\r\n\
  <PropertyGroup>\r\n\
    <ProjectGuid>{AAAA}</ProjectGuid>\r\n\
  </PropertyGroup>\r\n\
  <ItemGroup>\r\n\
    <ProjectReference Include=\"..\\Lib\\Lib.csproj\" Condition=\"'$(X)' == 'true'\">\r\n\
      <Project>{BBBB}</Project>\r\n\
      <Name>Lib</Name>\r\n\
    </ProjectReference>\r\n\
    <ProjectReference Include=\"..\\Other\\Other.csproj\" />\r\n\
  </ItemGroup>\r\n\
</Project>\r\n";

    fn parse(content: &str) -> Document {
        return Document::parse(Path::new("/p/App.csproj"), content).unwrap();
    }

    #[test]
    fn untouched_document_serializes_byte_for_byte() {
        let doc = parse(LEGACY);
        assert_eq!(doc.serialize().unwrap(), LEGACY.as_bytes());
    }

    #[test]
    fn descendants_are_in_document_order_and_ignore_namespace() {
        let doc = parse(LEGACY);
        let refs = doc.descendants("ProjectReference");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].attribute("Include").unwrap().as_deref(), Some(r"..\Lib\Lib.csproj"));
        assert_eq!(refs[1].attribute("Include").unwrap().as_deref(), Some(r"..\Other\Other.csproj"));
        assert_eq!(doc.first_descendant("ProjectGuid").unwrap().text().unwrap(), "{AAAA}");
    }

    #[test]
    fn prefixed_elements_match_by_local_name() {
        let doc = parse("<ms:Project xmlns:ms=\"urn:x\"><ms:ProjectGuid>{G}</ms:ProjectGuid></ms:Project>");
        assert_eq!(doc.first_descendant("ProjectGuid").unwrap().text().unwrap(), "{G}");
    }

    #[test]
    fn set_attribute_rewrites_only_that_attribute() {
        let mut doc = parse(LEGACY);
        for reference in doc.descendants_mut("ProjectReference") {
            reference.set_attribute("Include", r"..\..\New\Lib.csproj").unwrap();
        }
        let out = String::from_utf8(doc.serialize().unwrap()).unwrap();
        assert!(out.contains(
            r#"<ProjectReference Include="..\..\New\Lib.csproj" Condition="'$(X)' == 'true'">"#
        ));
        assert!(out.contains(r#"<ProjectReference Include="..\..\New\Lib.csproj"/>"#));
        assert!(out.contains("<!-- generated -->\r\n"));
        assert!(out.starts_with('\u{feff}'));
    }

    #[test]
    fn set_attribute_appends_when_missing() {
        let mut doc = parse("<Project><ProjectReference /></Project>");
        doc.descendants_mut("ProjectReference")[0].set_attribute("Include", "a.csproj").unwrap();
        let out = String::from_utf8(doc.serialize().unwrap()).unwrap();
        assert_eq!(out, r#"<Project><ProjectReference Include="a.csproj"/></Project>"#);
    }

    #[test]
    fn set_text_replaces_content_and_escapes() {
        let mut doc = parse(LEGACY);
        let reference = doc.descendants_mut("ProjectReference").into_iter().next().unwrap();
        reference.first_descendant_mut("Name").unwrap().set_text("A&B");
        let out = String::from_utf8(doc.serialize().unwrap()).unwrap();
        assert!(out.contains("<Name>A&amp;B</Name>"));

        let reparsed = parse(&out);
        let name = reparsed.descendants("ProjectReference")[0].first_descendant("Name").unwrap().text().unwrap();
        assert_eq!(name, "A&B");
    }

    #[test]
    fn set_text_on_self_closing_element_adds_closing_tag() {
        let mut doc = parse("<Project><Name/></Project>");
        doc.descendants_mut("Name")[0].set_text("Lib");
        assert_eq!(doc.serialize().unwrap(), b"<Project><Name>Lib</Name></Project>");
    }

    #[test]
    fn text_concatenates_cdata_and_entities() {
        let doc = parse("<Project><Name>a&lt;<![CDATA[b]]></Name></Project>");
        assert_eq!(doc.first_descendant("Name").unwrap().text().unwrap(), "a<b");
    }

    #[test]
    fn unclosed_element_is_malformed() {
        let err = Document::parse(Path::new("/p/Bad.csproj"), "<Project><ItemGroup>").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. } | Error::Xml { .. }), "got {err}");
    }

    #[test]
    fn mismatched_end_tag_is_an_xml_error() {
        let err = Document::parse(Path::new("/p/Bad.csproj"), "<Project></ItemGroup>").unwrap_err();
        assert!(matches!(err, Error::Xml { .. } | Error::MalformedDocument { .. }), "got {err}");
    }

    #[test]
    fn save_and_load_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("App.csproj");
        std::fs::write(&path, LEGACY).unwrap();

        let mut doc = Document::load(&path).unwrap();
        doc.descendants_mut("Name")[0].set_text("Renamed");
        doc.save().unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, LEGACY.replace("<Name>Lib</Name>", "<Name>Renamed</Name>"));
    }

    fn utf16le(text: &str) -> Vec<u8> {
        return text.encode_utf16().flat_map(u16::to_le_bytes).collect();
    }

    #[test]
    fn utf16_project_is_read_and_written_back_as_utf16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Old.csproj");
        let utf16_legacy = LEGACY.replace("encoding=\"utf-8\"", "encoding=\"utf-16\"");
        std::fs::write(&path, utf16le(&utf16_legacy)).unwrap();

        let mut doc = Document::load(&path).unwrap();
        assert_eq!(doc.first_descendant("ProjectGuid").unwrap().text().unwrap(), "{AAAA}");
        doc.descendants_mut("Name")[0].set_text("Renamed");
        doc.save().unwrap();

        let written = std::fs::read(&path).unwrap();
        assert_eq!(&written[..2], &[0xFF, 0xFE]);
        assert_eq!(written, utf16le(&utf16_legacy.replace("<Name>Lib</Name>", "<Name>Renamed</Name>")));
    }

    #[test]
    fn utf16_big_endian_is_detected_by_its_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Be.csproj");
        let bytes: Vec<u8> = "\u{feff}<Project><ProjectGuid>{BE}</ProjectGuid></Project>"
            .encode_utf16()
            .flat_map(u16::to_be_bytes)
            .collect();
        std::fs::write(&path, &bytes).unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.first_descendant("ProjectGuid").unwrap().text().unwrap(), "{BE}");
        assert_eq!(doc.serialize().unwrap(), bytes);
    }

    #[test]
    fn invalid_utf8_names_the_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bad.csproj");
        std::fs::write(&path, b"<Project>\xC3\x28</Project>").unwrap();

        let err = Document::load(&path).unwrap_err();
        assert!(matches!(err, Error::ProjectIo { ref path, .. } if path.ends_with("Bad.csproj")), "got {err}");
    }

    #[test]
    fn load_missing_file_names_the_project() {
        let err = Document::load(Path::new("/definitely/missing/App.csproj")).unwrap_err();
        assert!(matches!(err, Error::ProjectIo { ref path, .. } if path.ends_with("App.csproj")));
    }
}
