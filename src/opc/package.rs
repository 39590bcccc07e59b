//! Objects that implement reading and writing OPC packages.
//!
//! This module provides the main OpcPackage type, which represents an Open Packaging
//! Convention package in memory. It owns the parts, holds the package-level
//! relationships, and provides high-level operations over the part graph.

use crate::opc::constants::relationship_type;
use crate::opc::error::{OpcError, Result};
use crate::opc::options::PackageOptions;
use crate::opc::packuri::{PACKAGE_URI, PackURI};
use crate::opc::part::{DefaultPartFactory, Part, PartFactory, PartRef, part_ref};
use crate::opc::phys_pkg::PhysPkgReader;
use crate::opc::pkgreader::{PackageReader, ZipPackageReader};
use crate::opc::pkgwriter::PackageWriter;
use crate::opc::rel::{RelTarget, Relationship, Relationships};
use crate::opc::unmarshal::Unmarshaller;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

/// Main API class for working with OPC packages.
///
/// The package holds the only strong references to its parts; relationships
/// between parts are weak. A part that is neither added to the package nor
/// reachable through it is dropped.
#[derive(Debug)]
pub struct OpcPackage {
    /// Package-level relationships
    rels: Relationships,

    /// All parts in the package, indexed by partname
    parts: HashMap<PackURI, PartRef>,
}

impl OpcPackage {
    /// Create a new empty OPC package.
    pub fn new() -> Self {
        Self {
            rels: Relationships::new(PACKAGE_URI.to_string()),
            parts: HashMap::new(),
        }
    }

    /// Open an OPC package from a file or an expanded package directory.
    ///
    /// # Example
    /// ```no_run
    /// use pptx_opc::opc::OpcPackage;
    ///
    /// let pkg = OpcPackage::open("deck.pptx")?;
    /// # Ok::<(), pptx_opc::OpcError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &PackageOptions::default())
    }

    /// Open an OPC package with explicit size limits.
    pub fn open_with<P: AsRef<Path>>(path: P, opts: &PackageOptions) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::open(path, opts)?)
    }

    /// Load an OPC package from a seekable ZIP stream.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, &PackageOptions::default())
    }

    /// Load an OPC package from a seekable ZIP stream with explicit size limits.
    pub fn from_reader_with<R: Read + Seek>(reader: R, opts: &PackageOptions) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::from_zip(reader, opts)?)
    }

    /// Load an OPC package from ZIP bytes held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::from_bytes(data, &PackageOptions::default())?)
    }

    /// Load an expanded package from a directory.
    pub fn from_dir<P: AsRef<Path>>(root: P) -> Result<Self> {
        Self::from_dir_with(root, &PackageOptions::default())
    }

    /// Load an expanded package from a directory with explicit size limits.
    pub fn from_dir_with<P: AsRef<Path>>(root: P, opts: &PackageOptions) -> Result<Self> {
        Self::from_phys_reader(PhysPkgReader::from_dir(root, opts)?)
    }

    fn from_phys_reader(phys: PhysPkgReader) -> Result<Self> {
        let mut reader = ZipPackageReader::from_phys_reader(phys)?;
        Self::load(&mut reader, &DefaultPartFactory::new())
    }

    /// Build a package from any reader, creating parts through `factory`.
    ///
    /// Nothing is returned unless every part and relationship loads.
    pub fn load<R, F>(reader: &mut R, factory: &F) -> Result<Self>
    where
        R: PackageReader,
        F: PartFactory + ?Sized,
    {
        let mut package = Self::new();
        Unmarshaller::unmarshal(reader, &mut package, factory)?;
        Ok(package)
    }

    /// Add a new part to the package and return the shared handle to it.
    ///
    /// A part with the same partname is replaced.
    pub fn add_part<P: Part + 'static>(&mut self, part: P) -> PartRef {
        let part = part_ref(part);
        self.insert_part(Arc::clone(&part));
        part
    }

    /// Add an already shared part, returning the part it replaces, if any.
    pub fn insert_part(&mut self, part: PartRef) -> Option<PartRef> {
        let partname = part.read().partname().clone();
        self.parts.insert(partname, part)
    }

    pub(crate) fn extend_parts<I: IntoIterator<Item = PartRef>>(&mut self, parts: I) {
        for part in parts {
            self.insert_part(part);
        }
    }

    /// Remove a part from the package.
    ///
    /// Relationships still pointing at the part fail with
    /// [`OpcError::PartNotFound`] once the last handle is dropped.
    pub fn remove_part(&mut self, partname: &PackURI) -> Option<PartRef> {
        self.parts.remove(partname)
    }

    /// Get a part by its partname.
    pub fn get_part(&self, partname: &PackURI) -> Result<PartRef> {
        self.parts
            .get(partname)
            .cloned()
            .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
    }

    /// Check if a part exists in the package.
    pub fn contains_part(&self, partname: &PackURI) -> bool {
        self.parts.contains_key(partname)
    }

    /// Get the number of parts in the package.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Get every part reachable from the package relationships.
    ///
    /// The graph is walked depth-first in relationship order and each part is
    /// returned once, so cycles are safe. Parts the package holds but nothing
    /// relates to are not included.
    pub fn iter_parts(&self) -> Vec<PartRef> {
        let mut parts = Vec::new();
        self.walk(|part| parts.push(Arc::clone(part)));
        parts
    }

    /// Visit every relationship reachable from the package, with its source partname.
    ///
    /// Package relationships come first, with the source `/`; each part's
    /// relationships follow in the order [`iter_parts`](Self::iter_parts) yields the parts.
    pub fn for_each_rel<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&PackURI, &Relationship),
    {
        let package_uri = PackURI::new(PACKAGE_URI)?;
        for rel in &self.rels {
            f(&package_uri, rel);
        }
        self.walk(|part| {
            let part = part.read();
            for rel in part.rels() {
                f(part.partname(), rel);
            }
        });
        Ok(())
    }

    fn walk<F: FnMut(&PartRef)>(&self, mut visit: F) {
        let mut visited = HashSet::new();
        let mut pending = Self::internal_targets(&self.rels, PACKAGE_URI);
        pending.reverse();

        while let Some(part) = pending.pop() {
            let mut children = {
                let guard = part.read();
                if !visited.insert(guard.partname().clone()) {
                    continue;
                }
                Self::internal_targets(guard.rels(), guard.partname().as_str())
            };
            visit(&part);
            children.reverse();
            pending.extend(children);
        }
    }

    fn internal_targets(rels: &Relationships, source: &str) -> Vec<PartRef> {
        rels.iter()
            .filter(|rel| !rel.is_external())
            .filter_map(|rel| match rel.target_part() {
                Ok(part) => Some(part),
                Err(_) => {
                    tracing::warn!(source, r_id = rel.r_id(), "relationship target was dropped");
                    None
                },
            })
            .collect()
    }

    /// Get a reference to the package-level relationships.
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    /// Get a mutable reference to the package-level relationships.
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Add a package-level relationship with a caller-supplied rId.
    pub fn add_relationship(&mut self, reltype: String, target: RelTarget, r_id: String) -> Result<()> {
        self.rels.add_relationship(reltype, target, r_id)?;
        Ok(())
    }

    /// Relate the package to a part, reusing an existing relationship of the
    /// same type to the same part. Returns the rId.
    pub fn relate_to(&mut self, part: &PartRef, reltype: &str) -> Result<String> {
        let rel = self.rels.get_or_add(reltype, RelTarget::part(part))?;
        Ok(rel.r_id().to_string())
    }

    /// Get the part the package is related to by the single relationship of `reltype`.
    pub fn part_related_by(&self, reltype: &str) -> Result<PartRef> {
        self.rels.part_with_reltype(reltype)?.target_part()
    }

    /// Get the main document part, `/ppt/presentation.xml` in a presentation.
    pub fn main_document_part(&self) -> Result<PartRef> {
        self.part_related_by(relationship_type::OFFICE_DOCUMENT)
    }

    /// Find the next available partname for a part template.
    ///
    /// `template` holds a `%d` placeholder; the first index from 1 whose
    /// partname is not used by a reachable part wins.
    ///
    /// # Example
    /// ```
    /// # use pptx_opc::opc::OpcPackage;
    /// let pkg = OpcPackage::new();
    /// let next = pkg.next_partname("/ppt/media/image%d.png")?;
    /// assert_eq!(next.as_str(), "/ppt/media/image1.png");
    /// # Ok::<(), pptx_opc::OpcError>(())
    /// ```
    pub fn next_partname(&self, template: &str) -> Result<PackURI> {
        if !template.contains("%d") {
            return Err(OpcError::InvalidPackUri(format!(
                "partname template has no %d placeholder: '{}'",
                template
            )));
        }

        let used: HashSet<PackURI> = self
            .iter_parts()
            .iter()
            .map(|part| part.read().partname().clone())
            .collect();

        let mut buf = itoa::Buffer::new();
        for n in 1..=used.len() + 1 {
            let candidate = PackURI::new(template.replacen("%d", buf.format(n), 1))?;
            if !used.contains(&candidate) {
                return Ok(candidate);
            }
        }
        // One of the len + 1 candidates is always free
        Err(OpcError::InvalidOperation(format!(
            "no free partname for template '{}'",
            template
        )))
    }

    /// Save the package to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        PackageWriter::write(path, self)
    }

    /// Serialize the package to ZIP bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        PackageWriter::to_bytes(self)
    }
}

impl Default for OpcPackage {
    fn default() -> Self {
        Self::new()
    }
}
