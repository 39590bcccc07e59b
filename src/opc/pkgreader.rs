//! Low-level, read-only API to a serialized Open Packaging Convention (OPC) package.
//!
//! This module provides the [`PackageReader`] interface consumed by the
//! unmarshaller and [`ZipPackageReader`], which implements it over a physical
//! package. Content types and relationships are resolved here, so everything
//! downstream works with absolute partnames.

use crate::opc::constants::target_mode;
use crate::opc::error::{OpcError, Result};
use crate::opc::options::PackageOptions;
use crate::opc::packuri::{PACKAGE_URI, PackURI};
use crate::opc::phys_pkg::PhysPkgReader;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::path::Path;

/// Serialized part as loaded from the physical package, before a part
/// factory turns it into a [`Part`](crate::opc::Part).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedPart {
    /// The partname (URI) of this part
    pub partname: PackURI,

    /// The content type of this part
    pub content_type: String,

    /// The binary content of this part
    pub blob: Vec<u8>,
}

/// Target of a serialized relationship, already resolved to an absolute
/// partname when internal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SrelTarget {
    Internal(PackURI),
    External(String),
}

/// Serialized relationship as read from a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedRelationship {
    /// Relationship ID (e.g., "rId1")
    pub r_id: String,

    /// Relationship type URI
    pub reltype: String,

    /// Target partname or external URL
    pub target: SrelTarget,
}

impl SerializedRelationship {
    /// Build a relationship from its `.rels` attributes.
    ///
    /// Internal targets are resolved against `base_uri`, the directory of the
    /// source part.
    pub fn from_attrs(
        base_uri: &str,
        r_id: String,
        reltype: String,
        target_ref: &str,
        mode: &str,
    ) -> Result<Self> {
        let target = if mode == target_mode::EXTERNAL {
            SrelTarget::External(target_ref.to_string())
        } else {
            SrelTarget::Internal(PackURI::from_rel_ref(base_uri, target_ref)?)
        };
        Ok(Self {
            r_id,
            reltype,
            target,
        })
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.target, SrelTarget::External(_))
    }

    /// Get the target partname of an internal relationship.
    pub fn target_partname(&self) -> Option<&PackURI> {
        match &self.target {
            SrelTarget::Internal(partname) => Some(partname),
            SrelTarget::External(_) => None,
        }
    }
}

/// Source of the serialized parts and relationships of a package.
pub trait PackageReader {
    /// Yield every part, moving its blob out of the reader.
    ///
    /// Parts are yielded in a stable order, each once. Calling this a second
    /// time yields nothing.
    fn iter_sparts(&mut self) -> impl Iterator<Item = Result<SerializedPart>> + '_;

    /// Yield `(source_partname, relationship)` pairs.
    ///
    /// Package relationships come first with the source `/`, followed by the
    /// relationships of each part in the same order as [`iter_sparts`](Self::iter_sparts).
    fn iter_srels(&self) -> impl Iterator<Item = (&PackURI, &SerializedRelationship)> + '_;
}

/// Content type map for looking up content types by part name or extension.
///
/// Implements the OPC content type discovery algorithm using Default and Override elements
/// from [Content_Types].xml. Overrides win over extension defaults.
#[derive(Debug, Default)]
pub(crate) struct ContentTypeMap {
    /// Lowercased file extension to content type
    defaults: HashMap<String, String>,

    /// Partname to content type
    overrides: HashMap<String, String>,
}

impl ContentTypeMap {
    /// Parse content types from [Content_Types].xml.
    pub(crate) fn from_xml(xml: &[u8]) -> Result<Self> {
        let mut map = Self::default();
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    match e.local_name().as_ref() {
                        b"Default" => {
                            let ext = attr_value(e, b"Extension")?;
                            let ct = attr_value(e, b"ContentType")?;
                            if let (Some(ext), Some(ct)) = (ext, ct) {
                                map.defaults.insert(ext.to_lowercase(), ct);
                            }
                        },
                        b"Override" => {
                            let partname = attr_value(e, b"PartName")?;
                            let ct = attr_value(e, b"ContentType")?;
                            if let (Some(partname), Some(ct)) = (partname, ct) {
                                map.overrides.insert(partname, ct);
                            }
                        },
                        _ => {},
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(OpcError::XmlError(format!(
                        "Content types parse error: {}",
                        e
                    )));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(map)
    }

    /// Get the content type for a partname.
    pub(crate) fn get(&self, pack_uri: &PackURI) -> Result<&str> {
        if let Some(ct) = self.overrides.get(pack_uri.as_str()) {
            return Ok(ct.as_str());
        }

        self.defaults
            .get(&pack_uri.ext().to_lowercase())
            .map(String::as_str)
            .ok_or_else(|| OpcError::ContentTypeNotFound(pack_uri.to_string()))
    }
}

/// Read one attribute of an element by its unqualified name.
fn attr_value(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|err| OpcError::XmlError(err.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Parse a `.rels` part into serialized relationships.
///
/// `Relationship` elements missing `Id`, `Type` or `Target` are skipped.
pub(crate) fn parse_rels_xml(
    rels_xml: &[u8],
    base_uri: &str,
) -> Result<SmallVec<[SerializedRelationship; 8]>> {
    let mut srels = SmallVec::new();
    let mut reader = Reader::from_reader(rels_xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"Relationship" {
                    let r_id = attr_value(e, b"Id")?;
                    let reltype = attr_value(e, b"Type")?;
                    let target_ref = attr_value(e, b"Target")?;
                    let mode = attr_value(e, b"TargetMode")?;

                    match (r_id, reltype, target_ref) {
                        (Some(r_id), Some(reltype), Some(target_ref)) => {
                            srels.push(SerializedRelationship::from_attrs(
                                base_uri,
                                r_id,
                                reltype,
                                &target_ref,
                                mode.as_deref().unwrap_or(target_mode::INTERNAL),
                            )?);
                        },
                        (r_id, _, _) => {
                            tracing::warn!(
                                base_uri,
                                r_id = r_id.as_deref().unwrap_or(""),
                                "skipping incomplete relationship"
                            );
                        },
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::XmlError(format!("Rels parse error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    Ok(srels)
}

/// Package reader over a ZIP archive or an expanded package directory.
///
/// Parts are discovered by walking the relationship graph depth-first from
/// the package relationships, so members nothing refers to are never loaded.
#[derive(Debug)]
pub struct ZipPackageReader {
    phys: PhysPkgReader,

    /// Parts in walk order, with their content types
    parts: Vec<(PackURI, String)>,

    /// Relationships per source, package first, then parts in walk order
    srels: Vec<(PackURI, SmallVec<[SerializedRelationship; 8]>)>,
}

impl ZipPackageReader {
    /// Open a package file or directory with default limits.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &PackageOptions::default())
    }

    /// Open a package file or directory.
    pub fn open_with<P: AsRef<Path>>(path: P, opts: &PackageOptions) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::open(path, opts)?)
    }

    /// Read a package from any seekable ZIP stream.
    pub fn from_reader<R: Read + Seek>(reader: R, opts: &PackageOptions) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::from_zip(reader, opts)?)
    }

    /// Read a package from ZIP bytes held in memory.
    pub fn from_bytes(data: &[u8], opts: &PackageOptions) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::from_bytes(data, opts)?)
    }

    /// Parse the content types and walk the relationship graph of `phys`.
    pub fn from_phys_reader(phys: PhysPkgReader) -> Result<Self> {
        let content_types = ContentTypeMap::from_xml(phys.content_types_xml()?)?;

        let package_uri = PackURI::new(PACKAGE_URI)?;
        let pkg_srels = Self::load_rels(&phys, &package_uri)?;

        let mut parts = Vec::new();
        let mut srels = vec![(package_uri, pkg_srels)];
        let mut visited = HashSet::new();

        // Pending targets in reverse, so popping visits them in document order
        let mut pending: Vec<PackURI> = internal_targets(&srels[0].1).rev().cloned().collect();

        while let Some(partname) = pending.pop() {
            if !visited.insert(partname.clone()) {
                continue;
            }
            if !phys.contains(&partname) {
                tracing::warn!(%partname, "relationship target missing from package");
                continue;
            }

            let content_type = content_types.get(&partname)?.to_string();
            let part_srels = Self::load_rels(&phys, &partname)?;
            pending.extend(
                internal_targets(&part_srels)
                    .rev()
                    .filter(|target| !visited.contains(*target))
                    .cloned(),
            );

            parts.push((partname.clone(), content_type));
            srels.push((partname, part_srels));
        }

        // Relationships to members that are not in the archive cannot be resolved
        for (_, rels) in srels.iter_mut() {
            rels.retain(|srel| {
                srel.target_partname()
                    .is_none_or(|target| visited.contains(target) && phys.contains(target))
            });
        }

        tracing::debug!(
            parts = parts.len(),
            relationships = srels.iter().map(|(_, rels)| rels.len()).sum::<usize>(),
            "walked package relationships"
        );

        Ok(Self { phys, parts, srels })
    }

    fn load_rels(
        phys: &PhysPkgReader,
        source_uri: &PackURI,
    ) -> Result<SmallVec<[SerializedRelationship; 8]>> {
        match phys.rels_xml_for(source_uri)? {
            Some(xml) => parse_rels_xml(xml, source_uri.base_uri()),
            None => Ok(SmallVec::new()),
        }
    }

    /// Get the partnames of all parts reachable from the package, in walk order.
    pub fn partnames(&self) -> impl Iterator<Item = &PackURI> {
        self.parts.iter().map(|(partname, _)| partname)
    }
}

fn internal_targets(
    srels: &[SerializedRelationship],
) -> impl DoubleEndedIterator<Item = &PackURI> {
    srels.iter().filter_map(SerializedRelationship::target_partname)
}

impl PackageReader for ZipPackageReader {
    fn iter_sparts(&mut self) -> impl Iterator<Item = Result<SerializedPart>> + '_ {
        let phys = &mut self.phys;
        self.parts.drain(..).map(move |(partname, content_type)| {
            let blob = phys.take(&partname)?;
            Ok(SerializedPart {
                partname,
                content_type,
                blob,
            })
        })
    }

    fn iter_srels(&self) -> impl Iterator<Item = (&PackURI, &SerializedRelationship)> + '_ {
        self.srels
            .iter()
            .flat_map(|(source, rels)| rels.iter().map(move |srel| (source, srel)))
    }
}
