//! Open Packaging Conventions (OPC) implementation.
//!
//! This module models a PresentationML package as a graph of parts joined by
//! relationships. It includes support for:
//!
//! - Pack URIs and relative references between parts
//! - Ordered, id-indexed relationship collections and their `.rels` XML
//! - Unmarshalling a package into a (possibly cyclic) part graph
//! - Content type management and ZIP-based physical packaging
//!
//! Parts are shared as [`PartRef`] handles. The package owns them; a
//! relationship only holds a weak reference to its target, so a graph with
//! cycles is freed with its package.

pub mod constants;
pub mod error;
pub mod options;
pub mod oxml;
pub mod package;
pub mod packuri;
pub mod part;
pub mod phys_pkg;
pub mod pkgreader;
pub mod pkgwriter;
pub mod rel;
pub mod unmarshal;

// Re-export commonly used types
pub use error::{OpcError, Result};
pub use options::PackageOptions;
pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::{BlobPart, DefaultPartFactory, Part, PartFactory, PartRef, XmlPart, part_ref};
pub use pkgreader::{
    PackageReader, SerializedPart, SerializedRelationship, SrelTarget, ZipPackageReader,
};
pub use pkgwriter::PackageWriter;
pub use rel::{RelTarget, Relationship, Relationships};
pub use unmarshal::Unmarshaller;
