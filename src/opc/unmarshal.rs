//! Rebuilds the in-memory part graph from a [`PackageReader`].

use crate::opc::error::{OpcError, Result};
use crate::opc::package::OpcPackage;
use crate::opc::packuri::{PACKAGE_URI, PackURI};
use crate::opc::part::{PartFactory, PartRef};
use crate::opc::pkgreader::{PackageReader, SrelTarget};
use crate::opc::rel::RelTarget;
use std::collections::HashMap;

/// Hosts the static methods that turn serialized parts and relationships
/// into parts wired to each other.
///
/// Unmarshalling runs in three steps: every part is created through the
/// factory, then every relationship is replayed onto its source (the package
/// itself for the source `/`), and finally each part's
/// [`after_unmarshal`](crate::opc::Part::after_unmarshal) hook runs once.
/// The first error aborts the whole load and is returned unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Unmarshaller;

impl Unmarshaller {
    /// Construct the graph of parts read by `reader` into `package`.
    pub fn unmarshal<R, F>(reader: &mut R, package: &mut OpcPackage, factory: &F) -> Result<()>
    where
        R: PackageReader,
        F: PartFactory + ?Sized,
    {
        let parts = Self::unmarshal_parts(reader, factory)?;
        Self::unmarshal_relationships(reader, package, &parts)?;

        for part in parts.values() {
            part.write().after_unmarshal()?;
        }

        tracing::debug!(
            parts = parts.len(),
            package_rels = package.rels().len(),
            "unmarshalled package"
        );
        package.extend_parts(parts.into_values());
        Ok(())
    }

    /// Create a part for each serialized part, keyed by partname.
    ///
    /// The factory is called in reader order.
    pub fn unmarshal_parts<R, F>(reader: &mut R, factory: &F) -> Result<HashMap<PackURI, PartRef>>
    where
        R: PackageReader,
        F: PartFactory + ?Sized,
    {
        let mut parts = HashMap::new();
        for spart in reader.iter_sparts() {
            let spart = spart?;
            let partname = spart.partname.clone();
            let part = factory.load(spart.partname, spart.content_type, spart.blob)?;
            parts.insert(partname, part);
        }
        Ok(parts)
    }

    /// Add a relationship to the source object for each serialized relationship.
    ///
    /// The source `/` is the package itself; any other source and every
    /// internal target must be one of `parts`.
    pub fn unmarshal_relationships<R>(
        reader: &R,
        package: &mut OpcPackage,
        parts: &HashMap<PackURI, PartRef>,
    ) -> Result<()>
    where
        R: PackageReader,
    {
        for (source, srel) in reader.iter_srels() {
            let target = match &srel.target {
                SrelTarget::External(target_ref) => RelTarget::external(target_ref.as_str()),
                SrelTarget::Internal(partname) => {
                    let part = lookup(parts, partname)?;
                    RelTarget::part_named(partname.clone(), part)
                },
            };

            if source.as_str() == PACKAGE_URI {
                package.add_relationship(srel.reltype.clone(), target, srel.r_id.clone())?;
            } else {
                lookup(parts, source)?.write().add_relationship(
                    srel.reltype.clone(),
                    target,
                    srel.r_id.clone(),
                )?;
            }
        }
        Ok(())
    }
}

fn lookup<'a>(parts: &'a HashMap<PackURI, PartRef>, partname: &PackURI) -> Result<&'a PartRef> {
    parts
        .get(partname)
        .ok_or_else(|| OpcError::PartNotFound(partname.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::part::{BlobPart, Part, part_ref};
    use crate::opc::pkgreader::{SerializedPart, SerializedRelationship};
    use crate::opc::rel::Relationships;
    use std::cell::RefCell;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory reader fed directly with serialized records.
    #[derive(Default)]
    struct MemReader {
        sparts: Vec<SerializedPart>,
        srels: Vec<(PackURI, SerializedRelationship)>,
    }

    impl MemReader {
        fn part(mut self, partname: &str, content_type: &str, blob: &[u8]) -> Self {
            self.sparts.push(SerializedPart {
                partname: uri(partname),
                content_type: content_type.to_string(),
                blob: blob.to_vec(),
            });
            self
        }

        fn rel(mut self, source: &str, r_id: &str, reltype: &str, target: SrelTarget) -> Self {
            self.srels.push((
                uri(source),
                SerializedRelationship {
                    r_id: r_id.to_string(),
                    reltype: reltype.to_string(),
                    target,
                },
            ));
            self
        }
    }

    impl PackageReader for MemReader {
        fn iter_sparts(&mut self) -> impl Iterator<Item = Result<SerializedPart>> + '_ {
            self.sparts.drain(..).map(Ok)
        }

        fn iter_srels(&self) -> impl Iterator<Item = (&PackURI, &SerializedRelationship)> + '_ {
            self.srels.iter().map(|(source, srel)| (source, srel))
        }
    }

    fn uri(s: &str) -> PackURI {
        PackURI::new(s).unwrap()
    }

    fn internal(s: &str) -> SrelTarget {
        SrelTarget::Internal(uri(s))
    }

    fn blob_factory(partname: PackURI, content_type: String, blob: Vec<u8>) -> Result<PartRef> {
        Ok(part_ref(BlobPart::new(partname, content_type, blob)))
    }

    /// Part whose hook records how many relationships it already has.
    #[derive(Debug)]
    struct HookPart {
        inner: BlobPart,
        calls: Arc<AtomicUsize>,
        rels_seen: Arc<AtomicUsize>,
    }

    impl Part for HookPart {
        fn partname(&self) -> &PackURI {
            self.inner.partname()
        }

        fn content_type(&self) -> &str {
            self.inner.content_type()
        }

        fn blob(&self) -> &[u8] {
            self.inner.blob()
        }

        fn rels(&self) -> &Relationships {
            self.inner.rels()
        }

        fn rels_mut(&mut self) -> &mut Relationships {
            self.inner.rels_mut()
        }

        fn after_unmarshal(&mut self) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.rels_seen.fetch_add(self.inner.rels().len(), Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_unmarshal_parts_calls_factory_in_order() {
        let mut reader = MemReader::default()
            .part("/part/name1.xml", "app/vnd.contentType_A", b"<Part_1/>")
            .part("/part/name2.xml", "app/vnd.contentType_B", b"<Part_2/>")
            .part("/part/name3.xml", "app/vnd.contentType_C", b"<Part_3/>");

        let calls = RefCell::new(Vec::new());
        let factory = |partname: PackURI, content_type: String, blob: Vec<u8>| -> Result<PartRef> {
            calls
                .borrow_mut()
                .push((partname.to_string(), content_type.clone(), blob.clone()));
            blob_factory(partname, content_type, blob)
        };
        let parts = Unmarshaller::unmarshal_parts(&mut reader, &factory).unwrap();

        let calls = calls.into_inner();
        let names: Vec<&str> = calls.iter().map(|(name, _, _)| name.as_str()).collect();
        assert_eq!(names, vec!["/part/name1.xml", "/part/name2.xml", "/part/name3.xml"]);
        assert_eq!(calls[1].1, "app/vnd.contentType_B");
        assert_eq!(calls[2].2, b"<Part_3/>");
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[&uri("/part/name2.xml")].read().blob(), b"<Part_2/>");
    }

    #[test]
    fn test_unmarshal_relationships_routes_to_sources() {
        let reltype = "http://reltype";
        let reader = MemReader::default()
            .rel("/", "rId1", reltype, internal("/partname1.xml"))
            .rel("/", "rId2", reltype, SrelTarget::External("target_ref_1".to_string()))
            .rel("/partname1.xml", "rId3", reltype, internal("/partname2.xml"))
            .rel("/partname2.xml", "rId4", reltype, SrelTarget::External("target_ref_2".to_string()));

        let mut parts = HashMap::new();
        for name in ["/partname1.xml", "/partname2.xml"] {
            parts.insert(uri(name), blob_factory(uri(name), "app/x".into(), Vec::new()).unwrap());
        }
        let mut package = OpcPackage::new();

        Unmarshaller::unmarshal_relationships(&reader, &mut package, &parts).unwrap();

        let pkg_rels = package.rels();
        assert_eq!(pkg_rels.len(), 2);
        assert!(Arc::ptr_eq(
            &pkg_rels.related_part("rId1").unwrap(),
            &parts[&uri("/partname1.xml")]
        ));
        assert!(pkg_rels.by_id("rId2").unwrap().is_external());
        assert_eq!(pkg_rels.target_ref("rId2").unwrap(), "target_ref_1");

        let part1 = parts[&uri("/partname1.xml")].read();
        assert!(Arc::ptr_eq(
            &part1.related_part("rId3").unwrap(),
            &parts[&uri("/partname2.xml")]
        ));
        let part2 = parts[&uri("/partname2.xml")].read();
        assert_eq!(part2.target_ref("rId4").unwrap(), "target_ref_2");
    }

    #[test]
    fn test_unmarshal_wires_graph_and_runs_hooks_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let rels_seen = Arc::new(AtomicUsize::new(0));
        let factory = {
            let calls = Arc::clone(&calls);
            let rels_seen = Arc::clone(&rels_seen);
            move |partname: PackURI, content_type: String, blob: Vec<u8>| -> Result<PartRef> {
                Ok(part_ref(HookPart {
                    inner: BlobPart::new(partname, content_type, blob),
                    calls: Arc::clone(&calls),
                    rels_seen: Arc::clone(&rels_seen),
                }))
            }
        };

        let mut reader = MemReader::default()
            .part("/a.xml", "app/a", b"A")
            .part("/b.xml", "app/b", b"B")
            .rel("/", "rId1", "T", internal("/a.xml"))
            .rel("/a.xml", "rId1", "T", internal("/b.xml"))
            .rel("/b.xml", "rId1", "T", internal("/a.xml"))
            .rel("/b.xml", "rId2", "T", internal("/b.xml"));

        let mut package = OpcPackage::new();
        Unmarshaller::unmarshal(&mut reader, &mut package, &factory).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(rels_seen.load(Ordering::SeqCst), 3);
        assert_eq!(package.part_count(), 2);

        let a = package.get_part(&uri("/a.xml")).unwrap();
        let b = package.get_part(&uri("/b.xml")).unwrap();
        assert!(Arc::ptr_eq(&package.rels().related_part("rId1").unwrap(), &a));
        assert_eq!(a.read().rels().len(), 1);
        assert!(Arc::ptr_eq(&a.read().related_part("rId1").unwrap(), &b));
        assert!(Arc::ptr_eq(&b.read().related_part("rId1").unwrap(), &a));
        assert!(Arc::ptr_eq(&b.read().related_part("rId2").unwrap(), &b));
        assert_eq!(b.read().target_ref("rId2").unwrap(), "b.xml");
    }

    #[test]
    fn test_missing_target_aborts() {
        let mut reader = MemReader::default()
            .part("/a.xml", "app/a", b"A")
            .rel("/a.xml", "rId1", "T", internal("/nowhere.xml"));

        let mut package = OpcPackage::new();
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &blob_factory).unwrap_err();
        assert!(matches!(err, OpcError::PartNotFound(name) if name == "/nowhere.xml"));
        assert_eq!(package.part_count(), 0);
    }

    #[test]
    fn test_factory_error_propagates_unchanged() {
        let mut reader = MemReader::default().part("/a.xml", "app/a", b"A");
        let failing = |_: PackURI, _: String, _: Vec<u8>| -> Result<PartRef> {
            Err(OpcError::InvalidOperation("factory refused".to_string()))
        };

        let mut package = OpcPackage::new();
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &failing).unwrap_err();
        assert!(matches!(err, OpcError::InvalidOperation(msg) if msg == "factory refused"));
    }

    #[test]
    fn test_duplicate_r_id_aborts() {
        let mut reader = MemReader::default()
            .part("/a.xml", "app/a", b"A")
            .rel("/", "rId1", "T", internal("/a.xml"))
            .rel("/", "rId1", "T", SrelTarget::External("http://x".into()));

        let mut package = OpcPackage::new();
        let err = Unmarshaller::unmarshal(&mut reader, &mut package, &blob_factory).unwrap_err();
        assert!(matches!(err, OpcError::DuplicateRelationshipId(id) if id == "rId1"));
    }
}
