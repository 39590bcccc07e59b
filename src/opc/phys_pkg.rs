//! Provides a general interface to a physical OPC package.
//!
//! A package lives either in a ZIP archive (`.pptx`) or in a directory holding
//! an expanded archive. Either way its members are read into memory up front,
//! bounded by [`PackageOptions`], so the rest of the loader never touches I/O.

use crate::opc::error::{OpcError, Result};
use crate::opc::options::PackageOptions;
use crate::opc::packuri::{CONTENT_TYPES_URI, PackURI};
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Physical package reader that provides access to the members of an OPC package.
///
/// Members are keyed by their membername (the partname without its leading slash).
#[derive(Debug, Default)]
pub struct PhysPkgReader {
    members: HashMap<String, Vec<u8>>,
}

/// Running total of inflated bytes, checked against the package limits.
struct ReadBudget {
    opts: PackageOptions,
    total: u64,
}

impl ReadBudget {
    fn new(opts: &PackageOptions) -> Self {
        Self {
            opts: *opts,
            total: 0,
        }
    }

    /// Read one member, failing as soon as it crosses either limit.
    fn read_member<R: Read>(&mut self, name: &str, reader: R) -> Result<Vec<u8>> {
        let part_limit = self.opts.max_part_bytes;
        let mut blob = Vec::new();
        reader.take(part_limit.saturating_add(1)).read_to_end(&mut blob)?;

        let size = blob.len() as u64;
        if size > part_limit {
            return Err(OpcError::PartTooLarge {
                partname: name.to_string(),
                size,
                limit: part_limit,
            });
        }

        self.total = self.total.saturating_add(size);
        if self.total > self.opts.max_total_bytes {
            return Err(OpcError::PackageTooLarge {
                limit: self.opts.max_total_bytes,
            });
        }
        Ok(blob)
    }
}

impl PhysPkgReader {
    /// Open an OPC package from a file path.
    ///
    /// A directory is read as an expanded package, anything else as a ZIP archive.
    ///
    /// # Errors
    /// Returns an error if the path doesn't exist, isn't a valid ZIP file,
    /// or one of its members exceeds the limits in `opts`.
    pub fn open<P: AsRef<Path>>(path: P, opts: &PackageOptions) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(OpcError::PackageNotFound(path.display().to_string()));
        }
        if path.is_dir() {
            return Self::from_dir(path, opts);
        }

        let file = std::fs::File::open(path)?;
        Self::from_zip(std::io::BufReader::new(file), opts)
    }

    /// Read every member of a ZIP archive.
    pub fn from_zip<R: Read + Seek>(reader: R, opts: &PackageOptions) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(reader)?;
        let mut budget = ReadBudget::new(opts);
        let mut members = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let blob = budget.read_member(&name, file)?;
            members.insert(name, blob);
        }

        tracing::debug!(members = members.len(), bytes = budget.total, "read zip package");
        Ok(Self { members })
    }

    /// Read a ZIP archive held in memory.
    pub fn from_bytes(data: &[u8], opts: &PackageOptions) -> Result<Self> {
        Self::from_zip(Cursor::new(data), opts)
    }

    /// Read every file below `root` as the members of an expanded package.
    pub fn from_dir<P: AsRef<Path>>(root: P, opts: &PackageOptions) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(OpcError::PackageNotFound(root.display().to_string()));
        }

        let mut budget = ReadBudget::new(opts);
        let mut members = HashMap::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            for entry in std::fs::read_dir(&dir)? {
                let path = entry?.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let name = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                let blob = budget.read_member(&name, std::fs::File::open(&path)?)?;
                members.insert(name, blob);
            }
        }

        tracing::debug!(members = members.len(), bytes = budget.total, "read package directory");
        Ok(Self { members })
    }

    /// Get the binary content for a part by its PackURI.
    pub fn blob_for(&self, pack_uri: &PackURI) -> Result<&[u8]> {
        self.members
            .get(pack_uri.membername())
            .map(Vec::as_slice)
            .ok_or_else(|| OpcError::PartNotFound(pack_uri.to_string()))
    }

    /// Move the content of a member out of the reader.
    pub fn take(&mut self, pack_uri: &PackURI) -> Result<Vec<u8>> {
        self.members
            .remove(pack_uri.membername())
            .ok_or_else(|| OpcError::PartNotFound(pack_uri.to_string()))
    }

    /// Get the [Content_Types].xml content.
    ///
    /// This is a required part of every OPC package that maps parts to content types.
    pub fn content_types_xml(&self) -> Result<&[u8]> {
        self.blob_for(&PackURI::new(CONTENT_TYPES_URI)?)
    }

    /// Get the relationships XML for a specific source URI.
    ///
    /// Returns None if the source has no relationships file.
    pub fn rels_xml_for(&self, source_uri: &PackURI) -> Result<Option<&[u8]>> {
        let rels_uri = source_uri.rels_uri()?;
        Ok(self.members.get(rels_uri.membername()).map(Vec::as_slice))
    }

    /// Check if a specific member exists in the package.
    pub fn contains(&self, pack_uri: &PackURI) -> bool {
        self.members.contains_key(pack_uri.membername())
    }

    /// List all member names in the package, sorted.
    pub fn member_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.members.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of members in the package.
    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the package is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Physical package writer for creating OPC packages.
///
/// Members are deflated into an in-memory ZIP archive.
pub struct PhysPkgWriter {
    zip_writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl PhysPkgWriter {
    /// Create a new package writer that writes to memory.
    pub fn new() -> Self {
        Self {
            zip_writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Write a member with Deflate compression.
    pub fn write(&mut self, pack_uri: &PackURI, blob: &[u8]) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.zip_writer.start_file(pack_uri.membername(), options)?;
        self.zip_writer.write_all(blob)?;
        Ok(())
    }

    /// Finish writing and return the package bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        let cursor = self.zip_writer.finish()?;
        Ok(cursor.into_inner())
    }
}

impl Default for PhysPkgWriter {
    fn default() -> Self {
        Self::new()
    }
}
