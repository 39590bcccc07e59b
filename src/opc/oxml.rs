//! XML builders for package-level parts.
//!
//! `.rels` documents are composed record by record through the
//! [`RelsXmlBuilder`] trait, so a relationship collection never formats XML
//! itself and the exact sequence of records it emits is observable.

use crate::common::xml::escape_xml;
use crate::opc::constants::{namespace, target_mode};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// Receives the records of a `.rels` document in emission order.
pub trait RelsXmlBuilder {
    /// Finished document type.
    type Output;

    /// Append one `<Relationship>` record.
    fn add_rel(&mut self, r_id: &str, reltype: &str, target_ref: &str, is_external: bool);

    /// Close the document and return it.
    fn xml(self) -> Self::Output;
}

/// Builder for a `<Relationships>` element, the root of every `.rels` part.
///
/// Attributes are written in schema order (`Id`, `Type`, `Target`,
/// `TargetMode`) and internal relationships omit `TargetMode`, which is the
/// implicit default.
#[derive(Debug)]
pub struct CtRelationships {
    xml: String,
}

impl CtRelationships {
    /// Start a new, empty `<Relationships>` document.
    pub fn new() -> Self {
        let mut xml = String::with_capacity(1024);
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str(r#"<Relationships xmlns=""#);
        xml.push_str(namespace::OPC_RELATIONSHIPS);
        xml.push_str(r#"">"#);
        xml.push('\n');
        Self { xml }
    }
}

impl Default for CtRelationships {
    fn default() -> Self {
        Self::new()
    }
}

impl RelsXmlBuilder for CtRelationships {
    type Output = String;

    fn add_rel(&mut self, r_id: &str, reltype: &str, target_ref: &str, is_external: bool) {
        self.xml.push_str(r#"  <Relationship Id=""#);
        self.xml.push_str(&escape_xml(r_id));
        self.xml.push_str(r#"" Type=""#);
        self.xml.push_str(&escape_xml(reltype));
        self.xml.push_str(r#"" Target=""#);
        self.xml.push_str(&escape_xml(target_ref));
        self.xml.push('"');
        if is_external {
            self.xml.push_str(r#" TargetMode=""#);
            self.xml.push_str(target_mode::EXTERNAL);
            self.xml.push('"');
        }
        self.xml.push_str("/>\n");
    }

    fn xml(mut self) -> String {
        self.xml.push_str("</Relationships>");
        self.xml
    }
}

/// Builder for `[Content_Types].xml`.
///
/// Callers are responsible for ordering; `Default` elements must precede
/// `Override` elements for some consumers.
#[derive(Debug)]
pub struct CtTypes {
    xml: String,
}

impl CtTypes {
    /// Start a new, empty `<Types>` document.
    pub fn new() -> Self {
        let mut xml = String::with_capacity(4096);
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        xml.push_str(r#"<Types xmlns=""#);
        xml.push_str(namespace::OPC_CONTENT_TYPES);
        xml.push_str(r#"">"#);
        xml.push('\n');
        Self { xml }
    }

    /// Append a `<Default Extension="..." ContentType="..."/>` element.
    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        self.xml.push_str(r#"  <Default Extension=""#);
        self.xml.push_str(&escape_xml(ext));
        self.xml.push_str(r#"" ContentType=""#);
        self.xml.push_str(&escape_xml(content_type));
        self.xml.push_str("\"/>\n");
    }

    /// Append an `<Override PartName="..." ContentType="..."/>` element.
    pub fn add_override(&mut self, partname: &str, content_type: &str) {
        self.xml.push_str(r#"  <Override PartName=""#);
        self.xml.push_str(&escape_xml(partname));
        self.xml.push_str(r#"" ContentType=""#);
        self.xml.push_str(&escape_xml(content_type));
        self.xml.push_str("\"/>\n");
    }

    /// Close the document and return it.
    pub fn xml(mut self) -> String {
        self.xml.push_str("</Types>");
        self.xml
    }
}

impl Default for CtTypes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_relationships() {
        let xml = CtRelationships::new().xml();
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n\
             </Relationships>"
        );
    }

    #[test]
    fn test_relationship_records() {
        let mut rels = CtRelationships::new();
        rels.add_rel("rId1", "http://rt-hyperlink", "http://some/link?a=1&b=2", true);
        rels.add_rel("rId2", "http://rt-image", "../media/image1.png", false);
        let xml = rels.xml();

        assert!(xml.contains(
            r#"<Relationship Id="rId1" Type="http://rt-hyperlink" Target="http://some/link?a=1&amp;b=2" TargetMode="External"/>"#
        ));
        assert!(xml.contains(
            r#"<Relationship Id="rId2" Type="http://rt-image" Target="../media/image1.png"/>"#
        ));
        assert!(xml.find("rId1").unwrap() < xml.find("rId2").unwrap());
    }

    #[test]
    fn test_content_types() {
        let mut types = CtTypes::new();
        types.add_default("png", "image/png");
        types.add_override("/ppt/presentation.xml", "application/xml");
        let xml = types.xml();

        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/xml"/>"#
        ));
        assert!(xml.ends_with("</Types>"));
    }
}
