/// Provides the PackURI value type and utilities for working with package URIs.
///
/// A PackURI represents a part name within an OPC package, following the URI format
/// defined by the Open Packaging Conventions specification.
use crate::opc::error::{OpcError, Result};
use std::borrow::Borrow;
use std::fmt;

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

/// The URI for the [Content_Types].xml part
pub const CONTENT_TYPES_URI: &str = "/[Content_Types].xml";

/// Represents a package URI, which is a partname within an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path
/// separators. They are stored in normalized form: `.` and empty segments are
/// dropped and `..` segments are resolved, so two URIs naming the same part
/// always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full, normalized pack URI string (e.g., "/ppt/slides/slide1.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// # Arguments
    /// * `uri` - The URI string, which must begin with a forward slash
    ///
    /// # Errors
    /// Returns [`OpcError::InvalidPackUri`] if the URI doesn't start with a forward slash.
    pub fn new<S: Into<String>>(uri: S) -> Result<Self> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "PackURI must begin with slash, got '{}'",
                uri
            )));
        }
        if Self::is_normalized(&uri) {
            return Ok(PackURI { uri });
        }
        Ok(PackURI {
            uri: Self::normalize_path(&uri),
        })
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// This translates a relative reference (like "../slideLayouts/slideLayout1.xml")
    /// onto a base URI (like "/ppt/slides") to produce an absolute PackURI
    /// (like "/ppt/slideLayouts/slideLayout1.xml"). An absolute reference
    /// ignores `base_uri`.
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self> {
        if relative_ref.starts_with('/') {
            return Self::new(relative_ref);
        }
        let joined = if base_uri.ends_with('/') {
            format!("{}{}", base_uri, relative_ref)
        } else {
            format!("{}/{}", base_uri, relative_ref)
        };
        Self::new(joined)
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For example, "slide1.xml" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns an empty string.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI.
    ///
    /// For example, "xml" for "/ppt/presentation.xml" (note: no leading period).
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the partname index for tuple partnames, or None for singleton partnames.
    ///
    /// For example, returns 21 for "/ppt/slides/slide21.xml" and None for
    /// "/ppt/presentation.xml". Indexes never start with a zero digit.
    pub fn idx(&self) -> Option<u32> {
        let filename = self.filename();
        let stem = match filename.rfind('.') {
            Some(pos) => &filename[..pos],
            None => filename,
        };

        let bytes = stem.as_bytes();
        let digit_count = bytes.iter().rev().take_while(|b| b.is_ascii_digit()).count();
        // A tuple partname needs a name before its index
        let digits_start = bytes.len() - digit_count;
        if digits_start == 0 {
            return None;
        }
        let digits = &bytes[digits_start..];
        if digits.is_empty() || digits[0] == b'0' {
            return None;
        }
        atoi_simd::parse::<u32, false, false>(digits).ok()
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the Zip file membername for the package item.
    /// Returns an empty string for the package pseudo-partname "/".
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Get the relative reference from a base URI to this PackURI.
    ///
    /// For example, PackURI("/ppt/slideLayouts/slideLayout1.xml") would return
    /// "../slideLayouts/slideLayout1.xml" for base_uri "/ppt/slides". The result is
    /// always the shortest path: shared leading directories are skipped.
    ///
    /// # Errors
    /// Returns [`OpcError::InvalidPackUri`] if `base_uri` is not an absolute
    /// in-package path.
    pub fn relative_ref(&self, base_uri: &str) -> Result<String> {
        if !base_uri.starts_with('/') {
            return Err(OpcError::InvalidPackUri(format!(
                "base URI must begin with slash, got '{}'",
                base_uri
            )));
        }
        if base_uri == "/" {
            return Ok(self.membername().to_string());
        }

        let from_parts: Vec<&str> = base_uri.split('/').filter(|s| !s.is_empty()).collect();
        let to_parts: Vec<&str> = self.uri.split('/').filter(|s| !s.is_empty()).collect();

        let common = from_parts
            .iter()
            .zip(to_parts.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<&str> = Vec::with_capacity(from_parts.len() + to_parts.len());
        segments.extend(std::iter::repeat_n("..", from_parts.len() - common));
        segments.extend_from_slice(&to_parts[common..]);

        if segments.is_empty() {
            return Ok(".".to_string());
        }
        Ok(segments.join("/"))
    }

    /// Get the PackURI of the .rels part corresponding to this PackURI.
    ///
    /// For example, "/ppt/slides/_rels/slide1.xml.rels" for "/ppt/slides/slide1.xml"
    /// and "/_rels/.rels" for the package pseudo-partname.
    pub fn rels_uri(&self) -> Result<PackURI> {
        let rels_filename = format!("{}.rels", self.filename());
        let base_uri = self.base_uri();

        let rels_uri_str = if base_uri == "/" {
            format!("/_rels/{}", rels_filename)
        } else {
            format!("{}/_rels/{}", base_uri, rels_filename)
        };

        Self::new(rels_uri_str)
    }

    /// Get the full URI string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// True when no segment of `uri` needs resolving.
    fn is_normalized(uri: &str) -> bool {
        if uri == "/" {
            return true;
        }
        uri[1..]
            .split('/')
            .all(|segment| !matches!(segment, "" | "." | ".."))
    }

    /// Resolve ".", ".." and empty segments of an absolute path.
    fn normalize_path(path: &str) -> String {
        let mut segments: Vec<&str> = Vec::new();

        for segment in path.split('/') {
            match segment {
                "" | "." => {},
                ".." => {
                    segments.pop();
                },
                _ => segments.push(segment),
            }
        }

        let mut normalized = String::with_capacity(path.len());
        for segment in &segments {
            normalized.push('/');
            normalized.push_str(segment);
        }
        if normalized.is_empty() {
            normalized.push('/');
        }
        normalized
    }
}

impl fmt::Display for PackURI {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

impl Borrow<str> for PackURI {
    fn borrow(&self) -> &str {
        &self.uri
    }
}

impl TryFrom<&str> for PackURI {
    type Error = OpcError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/ppt/presentation.xml").is_ok());
        assert!(matches!(
            PackURI::new("ppt/presentation.xml"),
            Err(OpcError::InvalidPackUri(_))
        ));
    }

    #[test]
    fn test_new_normalizes() {
        let uri = PackURI::new("/ppt/slides/../media/./image1.png").unwrap();
        assert_eq!(uri.as_str(), "/ppt/media/image1.png");

        let uri = PackURI::new("/ppt//slides/").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slides");

        assert_eq!(PackURI::new("/..").unwrap().as_str(), "/");
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/ppt/slides", "../slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slideLayouts/slideLayout1.xml");

        let uri = PackURI::from_rel_ref("/", "ppt/presentation.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/presentation.xml");

        let uri = PackURI::from_rel_ref("/ppt", "/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.as_str(), "/ppt/slides/slide1.xml");

        let uri = PackURI::from_rel_ref("/ppt/slides", "/ppt/media/../media/image1.png").unwrap();
        assert_eq!(uri.as_str(), "/ppt/media/image1.png");
    }

    #[test]
    fn test_base_uri() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");

        let uri = PackURI::new("/presentation.xml").unwrap();
        assert_eq!(uri.base_uri(), "/");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.base_uri(), "/");
    }

    #[test]
    fn test_filename_and_ext() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.filename(), "");
        assert_eq!(root.ext(), "");
    }

    #[test]
    fn test_idx() {
        let uri = PackURI::new("/ppt/slides/slide21.xml").unwrap();
        assert_eq!(uri.idx(), Some(21));

        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(uri.idx(), None);

        let uri = PackURI::new("/ppt/slides/slide07.xml").unwrap();
        assert_eq!(uri.idx(), None);

        let uri = PackURI::new("/ppt/42.xml").unwrap();
        assert_eq!(uri.idx(), None);

        let uri = PackURI::new("/ppt/media/imageé3.png").unwrap();
        assert_eq!(uri.idx(), Some(3));

        let uri = PackURI::new("/ppt/media/图片12.png").unwrap();
        assert_eq!(uri.idx(), Some(12));
    }

    #[test]
    fn test_membername() {
        let uri = PackURI::new("/ppt/presentation.xml").unwrap();
        assert_eq!(uri.membername(), "ppt/presentation.xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_relative_ref() {
        let uri = PackURI::new("/ppt/slideLayouts/slideLayout1.xml").unwrap();
        assert_eq!(
            uri.relative_ref("/ppt/slides").unwrap(),
            "../slideLayouts/slideLayout1.xml"
        );
        assert_eq!(
            uri.relative_ref("/").unwrap(),
            "ppt/slideLayouts/slideLayout1.xml"
        );
        assert_eq!(
            uri.relative_ref("/ppt/slideLayouts").unwrap(),
            "slideLayout1.xml"
        );

        let media = PackURI::new("/ppt/media/image1.png").unwrap();
        assert_eq!(media.relative_ref("/ppt/slides").unwrap(), "../media/image1.png");
        assert_eq!(
            media.relative_ref("/docProps/a/b").unwrap(),
            "../../../ppt/media/image1.png"
        );
    }

    #[test]
    fn test_relative_ref_rejects_relative_base() {
        let uri = PackURI::new("/ppt/media/image1.png").unwrap();
        assert!(matches!(
            uri.relative_ref("ppt/slides"),
            Err(OpcError::InvalidPackUri(_))
        ));
    }

    #[test]
    fn test_rels_uri() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(
            uri.rels_uri().unwrap().as_str(),
            "/ppt/slides/_rels/slide1.xml.rels"
        );

        let root = PackURI::new(PACKAGE_URI).unwrap();
        assert_eq!(root.rels_uri().unwrap().as_str(), "/_rels/.rels");
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_]{1,8}(\\.xml)?"
    }

    proptest! {
        #[test]
        fn prop_relative_ref_resolves_back(
            target in prop::collection::vec(segment(), 1..5),
            base in prop::collection::vec(segment(), 0..4),
        ) {
            let uri = PackURI::new(format!("/{}", target.join("/"))).unwrap();
            let base_uri = format!("/{}", base.join("/"));

            let rel = uri.relative_ref(&base_uri).unwrap();
            prop_assert!(!rel.starts_with('/'));

            let resolved = PackURI::from_rel_ref(&base_uri, &rel).unwrap();
            prop_assert_eq!(resolved, uri);
        }

        #[test]
        fn prop_normalized_form_is_stable(path in prop::collection::vec("[a-z]{1,4}|\\.|\\.\\.", 0..8)) {
            let uri = PackURI::new(format!("/{}", path.join("/"))).unwrap();
            prop_assert!(PackURI::is_normalized(uri.as_str()));
            prop_assert_eq!(PackURI::new(uri.as_str()).unwrap(), uri.clone());
        }
    }
}
