//! Package writer for OPC packages.
//!
//! Serializes the [Content_Types].xml part, the package relationships and
//! every part reachable from them, each with its own `.rels` part.

use crate::opc::constants::content_type as ct;
use crate::opc::error::Result;
use crate::opc::oxml::CtTypes;
use crate::opc::package::OpcPackage;
use crate::opc::packuri::{CONTENT_TYPES_URI, PACKAGE_URI, PackURI};
use crate::opc::part::PartRef;
use crate::opc::phys_pkg::PhysPkgWriter;
use std::collections::BTreeMap;
use std::path::Path;

/// Package writer that serializes an OPC package to a ZIP archive.
///
/// # Example
///
/// ```no_run
/// use pptx_opc::opc::{OpcPackage, PackageWriter};
///
/// let pkg = OpcPackage::open("input.pptx")?;
/// PackageWriter::write("output.pptx", &pkg)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PackageWriter;

impl PackageWriter {
    /// Write an OPC package to a file.
    pub fn write<P: AsRef<Path>>(path: P, package: &OpcPackage) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Write an OPC package to a stream.
    pub fn write_to_stream<W: std::io::Write>(mut writer: W, package: &OpcPackage) -> Result<()> {
        let bytes = Self::to_bytes(package)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize an OPC package to ZIP bytes.
    pub fn to_bytes(package: &OpcPackage) -> Result<Vec<u8>> {
        let parts = package.iter_parts();
        let mut phys_writer = PhysPkgWriter::new();

        let content_types = ContentTypesItem::from_parts(&parts).to_xml();
        phys_writer.write(&PackURI::new(CONTENT_TYPES_URI)?, content_types.as_bytes())?;

        let pkg_rels_uri = PackURI::new(PACKAGE_URI)?.rels_uri()?;
        phys_writer.write(&pkg_rels_uri, package.rels().xml()?.as_bytes())?;

        Self::write_parts(&mut phys_writer, &parts)?;

        tracing::debug!(
            parts = parts.len(),
            package_rels = package.rels().len(),
            "serialized package"
        );
        phys_writer.finish()
    }

    /// Write all parts and their relationships.
    fn write_parts(phys_writer: &mut PhysPkgWriter, parts: &[PartRef]) -> Result<()> {
        for part in parts {
            let part = part.read();
            phys_writer.write(part.partname(), part.blob())?;

            if !part.rels().is_empty() {
                let rels_uri = part.partname().rels_uri()?;
                phys_writer.write(&rels_uri, part.rels().xml()?.as_bytes())?;
            }
        }

        Ok(())
    }
}

/// Helper for building [Content_Types].xml content.
///
/// Well-known extensions get a `Default` element; every other part gets an
/// `Override`. Both are emitted sorted.
#[derive(Debug)]
struct ContentTypesItem {
    /// Default content types by extension
    defaults: BTreeMap<String, String>,

    /// Override content types by partname
    overrides: BTreeMap<String, String>,
}

impl ContentTypesItem {
    fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());

        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    fn from_parts(parts: &[PartRef]) -> Self {
        let mut cti = Self::new();
        for part in parts {
            let part = part.read();
            cti.add_content_type(part.partname(), part.content_type());
        }
        cti
    }

    fn add_content_type(&mut self, partname: &PackURI, content_type: &str) {
        let ext = partname.ext().to_lowercase();
        if Self::is_default_content_type(&ext, content_type) {
            self.defaults.insert(ext, content_type.to_string());
        } else {
            self.overrides
                .insert(partname.to_string(), content_type.to_string());
        }
    }

    fn is_default_content_type(ext: &str, content_type: &str) -> bool {
        matches!(
            (ext, content_type),
            ("rels", ct::OPC_RELATIONSHIPS)
                | ("xml", ct::XML)
                | ("bmp", ct::BMP)
                | ("png", ct::PNG)
                | ("jpg", ct::JPEG)
                | ("jpeg", ct::JPEG)
                | ("gif", ct::GIF)
                | ("tif", ct::TIFF)
                | ("tiff", ct::TIFF)
                | ("emf", ct::X_EMF)
                | ("wmf", ct::X_WMF)
        )
    }

    fn to_xml(&self) -> String {
        let mut types = CtTypes::new();
        for (ext, content_type) in &self.defaults {
            types.add_default(ext, content_type);
        }
        for (partname, content_type) in &self.overrides {
            types.add_override(partname, content_type);
        }
        types.xml()
    }
}
