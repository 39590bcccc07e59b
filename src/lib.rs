//! pptx-opc - Open Packaging Conventions object model for PowerPoint files
//!
//! This library lets a caller load, build and edit the part graph of a
//! `.pptx` package as in-memory objects instead of raw XML:
//!
//! - **Pack URIs**: normalized in-package paths with relative-reference math
//! - **Relationships**: typed, ordered, id-indexed edges between parts
//! - **Unmarshalling**: rebuilds the (possibly cyclic) part graph from a package
//! - **Writing**: serializes parts, `.rels` files and `[Content_Types].xml`
//! - **Enumerations**: chart constants of the PowerPoint object model
//!
//! # Example - Reading a PPTX package
//!
//! ```no_run
//! use pptx_opc::opc::OpcPackage;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pkg = OpcPackage::open("presentation.pptx")?;
//! let main = pkg.main_document_part()?;
//! println!("Main part: {}", main.read().partname());
//!
//! for rel in main.read().rels().iter() {
//!     println!("{} -> {}", rel.r_id(), rel.target_ref()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Authoring relationships
//!
//! ```
//! use pptx_opc::opc::constants::{content_type as ct, relationship_type as rt};
//! use pptx_opc::opc::{BlobPart, OpcPackage, PackURI};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut pkg = OpcPackage::new();
//! let slide = pkg.add_part(BlobPart::new(
//!     PackURI::new("/ppt/slides/slide1.xml")?,
//!     ct::PML_SLIDE.to_string(),
//!     b"<p:sld/>".to_vec(),
//! ));
//! let image = pkg.add_part(BlobPart::new(
//!     PackURI::new("/ppt/media/image1.png")?,
//!     ct::PNG.to_string(),
//!     vec![0x89, 0x50, 0x4E, 0x47],
//! ));
//!
//! let r_id = slide.write().relate_to(&image, rt::IMAGE)?;
//! assert_eq!(r_id, "rId1");
//! assert_eq!(slide.read().target_ref(&r_id)?, "../media/image1.png");
//! # Ok(())
//! # }
//! ```

/// Shared utilities (XML escaping)
pub mod common;

/// Enumerations of the PowerPoint object model
pub mod enums;

/// Open Packaging Conventions layer: URIs, parts, relationships, package I/O
pub mod opc;

// Re-export commonly used types for convenience
pub use opc::{OpcError, OpcPackage, PackURI, Part, Relationship, Relationships, Result};
