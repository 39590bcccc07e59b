//! Relationship-related objects for OPC packages.
//!
//! This module provides types for managing relationships between parts in an OPC package,
//! including internal and external relationships.

use crate::opc::error::{OpcError, Result};
use crate::opc::oxml::{CtRelationships, RelsXmlBuilder};
use crate::opc::packuri::PackURI;
use crate::opc::part::{Part, PartRef};
use parking_lot::RwLock;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// The target handed to [`Relationships::add_relationship`].
///
/// The variant decides whether the relationship is external, so an external
/// relationship can never carry a part and an internal one can never carry a
/// bare URL.
#[derive(Debug, Clone)]
pub enum RelTarget {
    /// Another part of the same package.
    Part {
        /// Partname of `part`, captured when the target is built.
        partname: PackURI,
        part: PartRef,
    },
    /// A resource outside the package, such as a hyperlink URL.
    External(String),
}

impl RelTarget {
    /// Target an internal part, reading its partname.
    ///
    /// Takes a read lock on `part`; when the target is the part currently
    /// being written (a self-reference), use [`RelTarget::part_named`].
    pub fn part(part: &PartRef) -> Self {
        let partname = part.read().partname().clone();
        Self::Part {
            partname,
            part: Arc::clone(part),
        }
    }

    /// Target an internal part whose partname is already known.
    pub fn part_named(partname: PackURI, part: &PartRef) -> Self {
        Self::Part {
            partname,
            part: Arc::clone(part),
        }
    }

    /// Target an external resource.
    pub fn external<S: Into<String>>(target_ref: S) -> Self {
        Self::External(target_ref.into())
    }

    /// Check if this is an external target.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self, Self::External(_))
    }

    fn same_target(&self, rel: &Relationship) -> bool {
        match (self, &rel.target) {
            (Self::Part { partname, .. }, Target::Internal { partname: other, .. }) => {
                partname == other
            },
            (Self::External(url), Target::External(other)) => url == other,
            _ => false,
        }
    }
}

/// Stored form of a relationship target.
///
/// Internal targets are weak: the package owns its parts, and the part graph
/// may contain cycles.
#[derive(Debug)]
enum Target {
    Internal {
        partname: PackURI,
        part: Weak<RwLock<dyn Part>>,
    },
    External(String),
}

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an rId
/// (relationship ID). Can be either internal (pointing to another part) or external
/// (pointing to an external URL). Immutable once created.
#[derive(Debug)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target part or external URL
    target: Target,

    /// Directory of the source part, used to compute relative references
    base_uri: String,
}

impl Relationship {
    /// Create a new relationship.
    ///
    /// # Arguments
    /// * `r_id` - Relationship ID (e.g., "rId1")
    /// * `reltype` - Relationship type URI
    /// * `target` - Target part or external URL
    /// * `base_uri` - Directory of the source part
    pub fn new(r_id: String, reltype: String, target: RelTarget, base_uri: String) -> Self {
        let target = match target {
            RelTarget::Part { partname, part } => Target::Internal {
                partname,
                part: Arc::downgrade(&part),
            },
            RelTarget::External(target_ref) => Target::External(target_ref),
        };
        Self {
            r_id,
            reltype,
            target,
            base_uri,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the base URI the target reference is computed against.
    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        matches!(self.target, Target::External(_))
    }

    /// Get the target part of an internal relationship.
    ///
    /// # Errors
    /// * [`OpcError::InvalidOperation`] for an external relationship
    /// * [`OpcError::PartNotFound`] if the target part no longer exists
    pub fn target_part(&self) -> Result<PartRef> {
        match &self.target {
            Target::Internal { partname, part } => part
                .upgrade()
                .ok_or_else(|| OpcError::PartNotFound(partname.to_string())),
            Target::External(_) => Err(OpcError::InvalidOperation(format!(
                "target_part property on relationship '{}' is undefined when target mode is External",
                self.r_id
            ))),
        }
    }

    /// Get the absolute partname of an internal relationship's target.
    pub fn target_partname(&self) -> Result<&PackURI> {
        match &self.target {
            Target::Internal { partname, .. } => Ok(partname),
            Target::External(_) => Err(OpcError::InvalidOperation(format!(
                "target_partname on relationship '{}' is undefined when target mode is External",
                self.r_id
            ))),
        }
    }

    /// Get the value written to the `Target` attribute.
    ///
    /// For external relationships this is the URL exactly as given. For internal
    /// relationships it is the target partname relative to the source part's
    /// directory, e.g. "../media/image1.png".
    pub fn target_ref(&self) -> Result<Cow<'_, str>> {
        match &self.target {
            Target::Internal { partname, .. } => {
                partname.relative_ref(&self.base_uri).map(Cow::Owned)
            },
            Target::External(target_ref) => Ok(Cow::Borrowed(target_ref)),
        }
    }
}

/// Collection of relationships from a single source.
///
/// Keeps relationships in insertion order, which is also serialization order,
/// with a side index from rId to position for O(1) lookup by id.
#[derive(Debug)]
pub struct Relationships {
    /// Directory of the source part, "/" for the package
    base_uri: String,

    /// Relationships in insertion order
    rels: Vec<Relationship>,

    /// Map of relationship ID to position in `rels`
    index: HashMap<String, usize>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    ///
    /// # Arguments
    /// * `base_uri` - Directory of the source part, used for relative references
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Get the base URI shared by every relationship in the collection.
    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// Add a relationship to the collection.
    ///
    /// The caller supplies the rId; use [`next_r_id`](Self::next_r_id) or
    /// [`get_or_add`](Self::get_or_add) to have one allocated.
    ///
    /// # Errors
    /// Returns [`OpcError::DuplicateRelationshipId`] if `r_id` is already in use;
    /// the collection is left unchanged.
    pub fn add_relationship(
        &mut self,
        reltype: String,
        target: RelTarget,
        r_id: String,
    ) -> Result<&Relationship> {
        if self.index.contains_key(&r_id) {
            return Err(OpcError::DuplicateRelationshipId(r_id));
        }
        let rel = Relationship::new(r_id.clone(), reltype, target, self.base_uri.clone());
        let pos = self.rels.len();
        self.rels.push(rel);
        self.index.insert(r_id, pos);
        Ok(&self.rels[pos])
    }

    /// Get a relationship by its position in insertion order.
    ///
    /// # Errors
    /// Returns [`OpcError::IndexOutOfRange`] past the end of the collection.
    pub fn by_index(&self, index: usize) -> Result<&Relationship> {
        self.rels.get(index).ok_or(OpcError::IndexOutOfRange {
            index,
            len: self.rels.len(),
        })
    }

    /// Get a relationship by its ID.
    ///
    /// # Errors
    /// Returns [`OpcError::RelationshipNotFound`] if no relationship has this ID.
    pub fn by_id(&self, r_id: &str) -> Result<&Relationship> {
        self.get(r_id)
            .ok_or_else(|| OpcError::RelationshipNotFound(format!("rId: {}", r_id)))
    }

    /// Get a relationship by its ID, if present.
    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.index.get(r_id).map(|&pos| &self.rels[pos])
    }

    /// Check whether a relationship ID is in use.
    #[inline]
    pub fn contains(&self, r_id: &str) -> bool {
        self.index.contains_key(r_id)
    }

    /// Get or add a relationship to a target.
    ///
    /// If a relationship of the given type to the same target already exists,
    /// returns that relationship. Otherwise, creates a new one with the
    /// next available rId.
    pub fn get_or_add(&mut self, reltype: &str, target: RelTarget) -> Result<&Relationship> {
        let existing = self
            .rels
            .iter()
            .position(|rel| rel.reltype() == reltype && target.same_target(rel));
        if let Some(pos) = existing {
            return Ok(&self.rels[pos]);
        }

        let r_id = self.next_r_id();
        self.add_relationship(reltype.to_string(), target, r_id)
    }

    /// Get or add an external relationship, returning its rId.
    pub fn get_or_add_ext_rel(&mut self, reltype: &str, target_ref: &str) -> Result<String> {
        self.get_or_add(reltype, RelTarget::external(target_ref))
            .map(|rel| rel.r_id().to_string())
    }

    /// Get the next available relationship ID.
    ///
    /// Generates IDs in the format "rId1", "rId2", etc., filling in gaps
    /// if any exist.
    pub fn next_r_id(&self) -> String {
        let mut used_numbers: Vec<u32> = self
            .index
            .keys()
            .filter_map(|r_id| {
                r_id.strip_prefix("rId")
                    .and_then(|digits| atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok())
            })
            .collect();
        used_numbers.sort_unstable();

        let mut next_num = 1u32;
        for &num in &used_numbers {
            match num.cmp(&next_num) {
                std::cmp::Ordering::Equal => next_num += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }

        let mut buf = itoa::Buffer::new();
        let mut r_id = String::with_capacity(8);
        r_id.push_str("rId");
        r_id.push_str(buf.format(next_num));
        r_id
    }

    /// Get the single relationship of a specific type.
    ///
    /// Returns an error if no relationship of the type is found,
    /// or if multiple relationships of the type exist.
    pub fn part_with_reltype(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|rel| rel.reltype() == reltype);

        match (matching.next(), matching.next()) {
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "No relationship of type '{}'",
                reltype
            ))),
            (Some(rel), None) => Ok(rel),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "Multiple relationships of type '{}'",
                reltype
            ))),
        }
    }

    /// Get the part targeted by the relationship with the given rId.
    pub fn related_part(&self, r_id: &str) -> Result<PartRef> {
        self.by_id(r_id)?.target_part()
    }

    /// Get the serialized target reference of the relationship with the given rId.
    pub fn target_ref(&self, r_id: &str) -> Result<String> {
        self.by_id(r_id)?.target_ref().map(Cow::into_owned)
    }

    /// Get an iterator over all relationships in insertion order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.rels.iter()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Remove a relationship by its ID.
    ///
    /// Later relationships keep their relative order.
    pub fn remove(&mut self, r_id: &str) -> Option<Relationship> {
        let pos = self.index.remove(r_id)?;
        let rel = self.rels.remove(pos);
        for later in self.index.values_mut() {
            if *later > pos {
                *later -= 1;
            }
        }
        Some(rel)
    }

    /// Serialize relationships to `.rels` XML, in insertion order.
    pub fn xml(&self) -> Result<String> {
        self.compose(CtRelationships::new())
    }

    /// Feed every relationship to `builder`, in insertion order, and finish it.
    pub fn compose<B: RelsXmlBuilder>(&self, mut builder: B) -> Result<B::Output> {
        for rel in &self.rels {
            let target_ref = rel.target_ref()?;
            builder.add_rel(rel.r_id(), rel.reltype(), &target_ref, rel.is_external());
        }
        Ok(builder.xml())
    }
}

impl Default for Relationships {
    fn default() -> Self {
        Self::new(crate::opc::packuri::PACKAGE_URI.to_string())
    }
}

impl<'a> IntoIterator for &'a Relationships {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.rels.iter()
    }
}
