//! Open Packaging Convention (OPC) objects related to package parts.
//!
//! This module provides the Part trait and its BlobPart / XmlPart implementations.
//! Parts are the fundamental units of content in an OPC package, each with a unique
//! partname, content type, and optional relationships.

use crate::opc::error::{OpcError, Result};
use crate::opc::packuri::PackURI;
use crate::opc::rel::{RelTarget, Relationships};
use memchr::memmem;
use parking_lot::RwLock;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a part of the package graph.
///
/// The graph may be cyclic, so parts are shared rather than owned by the
/// relationships pointing at them. Each part carries its own lock, which
/// serializes writers of that part's relationships.
pub type PartRef = Arc<RwLock<dyn Part>>;

/// Wrap a part into a [`PartRef`].
pub fn part_ref<P: Part + 'static>(part: P) -> PartRef {
    Arc::new(RwLock::new(part))
}

/// Trait representing a part in an OPC package.
///
/// Parts are the fundamental units of content in an OPC package. Each part
/// has a unique partname (PackURI), a content type, and may have relationships
/// to other parts. The partname never changes once the part is created.
pub trait Part: Send + Sync + fmt::Debug {
    /// Get the partname of this part.
    fn partname(&self) -> &PackURI;

    /// Get the content type of this part.
    fn content_type(&self) -> &str;

    /// Get the binary content of this part.
    fn blob(&self) -> &[u8];

    /// Get the relationships for this part.
    fn rels(&self) -> &Relationships;

    /// Get mutable access to the relationships for this part.
    fn rels_mut(&mut self) -> &mut Relationships;

    /// Add a relationship with a caller-supplied rId.
    ///
    /// This is how the unmarshaller replays the relationships read from a package.
    fn add_relationship(&mut self, reltype: String, target: RelTarget, r_id: String) -> Result<()> {
        self.rels_mut().add_relationship(reltype, target, r_id)?;
        Ok(())
    }

    /// Called once after the whole package graph has been loaded.
    ///
    /// Parts that need their relationships to finish initializing override this;
    /// by the time it runs every part and every relationship exists.
    fn after_unmarshal(&mut self) -> Result<()> {
        Ok(())
    }

    /// Add or get a relationship to another part.
    ///
    /// If a relationship of the given type to the target already exists,
    /// returns its rId. Otherwise, creates a new relationship and returns
    /// the new rId. The target may be this part itself.
    fn relate_to(&mut self, target: &PartRef, reltype: &str) -> Result<String> {
        // A self-reference is already write-locked by our caller
        let target = if std::ptr::addr_eq(&*self as *const Self, target.data_ptr()) {
            RelTarget::part_named(self.partname().clone(), target)
        } else {
            RelTarget::part(target)
        };
        let rel = self.rels_mut().get_or_add(reltype, target)?;
        Ok(rel.r_id().to_string())
    }

    /// Add or get an external relationship.
    fn relate_to_ext(&mut self, target_url: &str, reltype: &str) -> Result<String> {
        self.rels_mut().get_or_add_ext_rel(reltype, target_url)
    }

    /// Get the part targeted by the relationship with the given rId.
    fn related_part(&self, r_id: &str) -> Result<PartRef> {
        self.rels().related_part(r_id)
    }

    /// Get the part this part is related to by the single relationship of `reltype`.
    fn part_related_by(&self, reltype: &str) -> Result<PartRef> {
        self.rels().part_with_reltype(reltype)?.target_part()
    }

    /// Get the target reference for a relationship ID.
    fn target_ref(&self, r_id: &str) -> Result<String> {
        self.rels().target_ref(r_id)
    }

    /// Count references to a relationship ID in the part content.
    ///
    /// For non-XML parts, returns 0.
    fn rel_ref_count(&self, r_id: &str) -> usize {
        let pattern = format!(r#"r:id="{}""#, r_id);
        let finder = memmem::Finder::new(pattern.as_bytes());
        finder.find_iter(self.blob()).count()
    }

    /// Remove the relationship `r_id` unless the content still references it
    /// more than once.
    ///
    /// Returns true if the relationship was removed.
    fn drop_rel(&mut self, r_id: &str) -> bool {
        if self.rel_ref_count(r_id) < 2 {
            return self.rels_mut().remove(r_id).is_some();
        }
        false
    }
}

/// A part that stores opaque binary content.
///
/// This is the default part type for non-XML content such as images and
/// embedded objects.
#[derive(Debug)]
pub struct BlobPart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The binary content of this part
    blob: Vec<u8>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl BlobPart {
    /// Create a new BlobPart.
    ///
    /// # Arguments
    /// * `partname` - The partname (URI) of this part
    /// * `content_type` - The content type of this part
    /// * `blob` - The binary content of this part
    pub fn new(partname: PackURI, content_type: String, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            blob,
            rels,
        }
    }

    /// Replace the binary content of this part.
    pub fn set_blob(&mut self, blob: Vec<u8>) {
        self.blob = blob;
    }
}

impl Part for BlobPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        &self.blob
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }
}

/// An XML part that provides parsed access to its XML content.
///
/// Stores the raw XML as UTF-8 bytes and parses it on demand with quick-xml.
#[derive(Debug)]
pub struct XmlPart {
    /// The partname (URI) of this part
    partname: PackURI,

    /// The content type of this part
    content_type: String,

    /// The XML content as raw bytes (UTF-8 encoded)
    xml_bytes: Vec<u8>,

    /// Relationships from this part to other parts
    rels: Relationships,
}

impl XmlPart {
    /// Create a new XmlPart without validating its content.
    pub fn new(partname: PackURI, content_type: String, xml_bytes: Vec<u8>) -> Self {
        let rels = Relationships::new(partname.base_uri().to_string());
        Self {
            partname,
            content_type,
            xml_bytes,
            rels,
        }
    }

    /// Load an XML part from raw data, checking that it is valid UTF-8.
    pub fn load(partname: PackURI, content_type: String, xml_bytes: Vec<u8>) -> Result<Self> {
        std::str::from_utf8(&xml_bytes).map_err(|e| {
            OpcError::XmlError(format!("Invalid UTF-8 in XML part {}: {}", partname, e))
        })?;

        Ok(Self::new(partname, content_type, xml_bytes))
    }

    /// Get a reader for parsing the XML content.
    pub fn reader(&self) -> Reader<&[u8]> {
        let mut reader = Reader::from_reader(self.xml_bytes.as_slice());
        reader.config_mut().trim_text(true);
        reader
    }

    /// Find all elements matching a local name and collect their attributes.
    ///
    /// Returns one map per matching element, keyed by the attribute's
    /// qualified name (e.g. `r:id`).
    pub fn find_elements_with_attrs(
        &self,
        element_name: &str,
    ) -> Result<Vec<HashMap<String, String>>> {
        let mut reader = self.reader();
        let mut buf = Vec::new();
        let mut results = Vec::new();
        let element_name_bytes = element_name.as_bytes();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                    if e.local_name().as_ref() == element_name_bytes {
                        let mut attrs = HashMap::new();
                        for attr in e.attributes() {
                            let attr = attr?;
                            let key = std::str::from_utf8(attr.key.as_ref())?;
                            let value = attr
                                .unescape_value()
                                .map_err(|e| OpcError::XmlError(e.to_string()))?;
                            attrs.insert(key.to_string(), value.into_owned());
                        }
                        results.push(attrs);
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(OpcError::XmlError(format!("XML parse error: {}", e))),
                _ => {},
            }
            buf.clear();
        }

        Ok(results)
    }

    /// Get the XML content as a UTF-8 string.
    pub fn xml_str(&self) -> Result<&str> {
        std::str::from_utf8(&self.xml_bytes).map_err(Into::into)
    }

    /// Replace the XML content of this part.
    pub fn set_xml(&mut self, xml_bytes: Vec<u8>) -> Result<()> {
        std::str::from_utf8(&xml_bytes)?;
        self.xml_bytes = xml_bytes;
        Ok(())
    }
}

impl Part for XmlPart {
    fn partname(&self) -> &PackURI {
        &self.partname
    }

    fn content_type(&self) -> &str {
        &self.content_type
    }

    fn blob(&self) -> &[u8] {
        &self.xml_bytes
    }

    fn rels(&self) -> &Relationships {
        &self.rels
    }

    fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }
}

/// Creates parts from the raw `(partname, content_type, blob)` triples of a package.
///
/// Any closure with the same shape is a factory, which keeps tests and custom
/// loaders short.
pub trait PartFactory {
    /// Build the part for one package member.
    fn load(&self, partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<PartRef>;
}

impl<F> PartFactory for F
where
    F: Fn(PackURI, String, Vec<u8>) -> Result<PartRef>,
{
    fn load(&self, partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<PartRef> {
        self(partname, content_type, blob)
    }
}

/// Constructor registered for one content type.
pub type PartConstructor = fn(PackURI, String, Vec<u8>) -> Result<PartRef>;

/// Content-type based part factory.
///
/// Looks up a registered constructor for the part's content type, then falls
/// back to [`XmlPart`] for XML content types and [`BlobPart`] for everything else.
#[derive(Debug, Clone, Default)]
pub struct DefaultPartFactory {
    constructors: HashMap<String, PartConstructor>,
}

impl DefaultPartFactory {
    /// Create a factory with no custom constructors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `constructor` for every part of `content_type`.
    pub fn register<S: Into<String>>(
        &mut self,
        content_type: S,
        constructor: PartConstructor,
    ) -> &mut Self {
        self.constructors.insert(content_type.into(), constructor);
        self
    }

    /// Check if a content type represents XML content.
    #[inline]
    pub fn is_xml_content_type(content_type: &str) -> bool {
        content_type.ends_with("+xml") || content_type.ends_with("/xml")
    }
}

impl PartFactory for DefaultPartFactory {
    fn load(&self, partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<PartRef> {
        if let Some(constructor) = self.constructors.get(&content_type) {
            return constructor(partname, content_type, blob);
        }
        if Self::is_xml_content_type(&content_type) {
            Ok(part_ref(XmlPart::load(partname, content_type, blob)?))
        } else {
            Ok(part_ref(BlobPart::new(partname, content_type, blob)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::{content_type as ct, relationship_type as rt};

    fn slide_xml() -> Vec<u8> {
        br#"<p:sld xmlns:p="p" xmlns:a="a" xmlns:r="r"><p:cSld><p:spTree>
            <p:pic><p:blipFill><a:blip r:embed="rId2"/></p:blipFill></p:pic>
            <a:hlinkClick r:id="rId3"/><a:hlinkClick r:id="rId3"/>
        </p:spTree></p:cSld></p:sld>"#
            .to_vec()
    }

    #[test]
    fn test_blob_part() {
        let partname = PackURI::new("/ppt/media/image1.png").unwrap();
        let content = vec![0x89, 0x50, 0x4E, 0x47];
        let part = BlobPart::new(partname, ct::PNG.to_string(), content.clone());

        assert_eq!(part.content_type(), "image/png");
        assert_eq!(part.blob(), content.as_slice());
        assert_eq!(part.rels().base_uri(), "/ppt/media");
    }

    #[test]
    fn test_xml_part_rejects_invalid_utf8() {
        let partname = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        let result = XmlPart::load(partname, ct::PML_SLIDE.to_string(), vec![0xFF, 0xFE]);
        assert!(matches!(result, Err(OpcError::XmlError(_))));
    }

    #[test]
    fn test_find_elements_with_attrs() {
        let partname = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        let part = XmlPart::load(partname, ct::PML_SLIDE.to_string(), slide_xml()).unwrap();

        let blips = part.find_elements_with_attrs("blip").unwrap();
        assert_eq!(blips.len(), 1);
        assert_eq!(blips[0].get("r:embed").map(String::as_str), Some("rId2"));
        assert_eq!(part.find_elements_with_attrs("hlinkClick").unwrap().len(), 2);
    }

    #[test]
    fn test_relate_to_reuses_relationship() {
        let slide = part_ref(XmlPart::new(
            PackURI::new("/ppt/slides/slide1.xml").unwrap(),
            ct::PML_SLIDE.to_string(),
            slide_xml(),
        ));
        let layout = part_ref(XmlPart::new(
            PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap(),
            ct::PML_SLIDE_LAYOUT.to_string(),
            b"<p:sldLayout/>".to_vec(),
        ));

        let r_id = slide.write().relate_to(&layout, rt::SLIDE_LAYOUT).unwrap();
        assert_eq!(r_id, "rId1");
        assert_eq!(slide.write().relate_to(&layout, rt::SLIDE_LAYOUT).unwrap(), "rId1");

        let related = slide.read().part_related_by(rt::SLIDE_LAYOUT).unwrap();
        assert!(Arc::ptr_eq(&related, &layout));
        assert_eq!(
            slide.read().target_ref("rId1").unwrap(),
            "../slideLayouts/slideLayout1.xml"
        );
    }

    #[test]
    fn test_relate_to_self() {
        let part = part_ref(XmlPart::new(
            PackURI::new("/ppt/slides/slide1.xml").unwrap(),
            ct::PML_SLIDE.to_string(),
            slide_xml(),
        ));

        let r_id = part.write().relate_to(&part, "http://self").unwrap();
        let guard = part.read();
        assert_eq!(guard.target_ref(&r_id).unwrap(), "slide1.xml");
        assert!(Arc::ptr_eq(&guard.related_part(&r_id).unwrap(), &part));
    }

    #[test]
    fn test_drop_rel_respects_reference_count() {
        let mut slide = XmlPart::new(
            PackURI::new("/ppt/slides/slide1.xml").unwrap(),
            ct::PML_SLIDE.to_string(),
            slide_xml(),
        );
        slide.relate_to_ext("http://a", rt::HYPERLINK).unwrap();
        slide.relate_to_ext("http://b", rt::HYPERLINK).unwrap();
        slide.relate_to_ext("http://c", rt::HYPERLINK).unwrap();

        assert_eq!(slide.rel_ref_count("rId3"), 2);
        assert!(!slide.drop_rel("rId3"));
        assert!(slide.drop_rel("rId1"));
        assert_eq!(slide.rels().len(), 2);
    }

    #[test]
    fn test_default_factory_dispatch() {
        let mut factory = DefaultPartFactory::new();
        factory.register(ct::PNG, |partname, content_type, _blob| {
            Ok(part_ref(BlobPart::new(partname, content_type, b"custom".to_vec())))
        });

        let xml = factory
            .load(
                PackURI::new("/ppt/presentation.xml").unwrap(),
                ct::PML_PRESENTATION_MAIN.to_string(),
                b"<p:presentation/>".to_vec(),
            )
            .unwrap();
        assert_eq!(xml.read().blob(), b"<p:presentation/>");

        let image = factory
            .load(
                PackURI::new("/ppt/media/image1.png").unwrap(),
                ct::PNG.to_string(),
                vec![1, 2, 3],
            )
            .unwrap();
        assert_eq!(image.read().blob(), b"custom");

        let bin = factory
            .load(
                PackURI::new("/ppt/embeddings/oleObject1.bin").unwrap(),
                ct::OFC_OLE_OBJECT.to_string(),
                vec![0xD0, 0xCF],
            )
            .unwrap();
        assert_eq!(bin.read().blob(), &[0xD0, 0xCF]);
    }

    #[test]
    fn test_replace_content() {
        let mut image = BlobPart::new(
            PackURI::new("/ppt/media/image1.png").unwrap(),
            ct::PNG.to_string(),
            vec![1],
        );
        image.set_blob(vec![2, 3]);
        assert_eq!(image.blob(), &[2, 3]);

        let mut slide = XmlPart::new(
            PackURI::new("/ppt/slides/slide1.xml").unwrap(),
            ct::PML_SLIDE.to_string(),
            b"<p:sld/>".to_vec(),
        );
        assert!(slide.set_xml(vec![0xC3, 0x28]).is_err());
        slide.set_xml(b"<p:sld><p:cSld/></p:sld>".to_vec()).unwrap();
        assert_eq!(slide.xml_str().unwrap(), "<p:sld><p:cSld/></p:sld>");
    }

    #[test]
    fn test_is_xml_content_type() {
        assert!(DefaultPartFactory::is_xml_content_type("application/xml"));
        assert!(DefaultPartFactory::is_xml_content_type(ct::PML_SLIDE));
        assert!(!DefaultPartFactory::is_xml_content_type("image/png"));
    }
}
