//! Slicing the master PDF into one standalone document per range.
//!
//! Each slice starts from a fresh parse of the master bytes, drops every page
//! outside its range, and drops whole-book navigation (outline, page labels).
//! Links into other slices are left pointing at nothing. Serialization is a
//! single deterministic pass, so re-running on the same master yields the
//! same bytes.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use lopdf::{Document as LopdfDocument, Object, ObjectId};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::naming::ArtifactName;
use crate::range::{ChapterRange, Partition};

/// Catalog entries describing the whole book rather than a slice.
const BOOK_LEVEL_CATALOG_KEYS: &[&[u8]] = &[b"Outlines", b"PageLabels"];

/// Trailer entries tied to the master file's byte layout.
const STALE_TRAILER_KEYS: &[&[u8]] = &[b"Prev", b"XRefStm"];

/// A PDF slice written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPdf {
    /// Output name.
    pub name: ArtifactName,
    /// Range the slice was cut from.
    pub range: ChapterRange,
    /// Location of the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: usize,
}

/// Result of slicing every range of a partition.
#[derive(Debug, Default)]
pub struct PartitionReport {
    /// Slices written, in range order.
    pub written: Vec<WrittenPdf>,
    /// One `Partition` error per slice that could not be produced.
    pub failures: Vec<Error>,
}

impl PartitionReport {
    /// Check if every slice was written.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Copies page ranges of a master PDF into standalone documents.
pub struct PdfPartitioner<'a> {
    master: &'a [u8],
    parallel: bool,
}

impl<'a> PdfPartitioner<'a> {
    /// Create a partitioner over the master document's bytes.
    pub fn new(master: &'a [u8]) -> Self {
        Self {
            master,
            parallel: true,
        }
    }

    /// Enable or disable parallel slicing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Produce one slice as bytes.
    pub fn extract(&self, range: &ChapterRange) -> Result<Vec<u8>> {
        let fail = |reason: String| Error::Partition {
            title: range.title.clone(),
            start: range.start_page,
            end: range.end_page,
            reason,
        };

        if range.start_page == 0 || range.end_page < range.start_page {
            return Err(fail("empty or inverted page span".to_string()));
        }

        let mut doc = LopdfDocument::load_mem(self.master).map_err(|e| fail(e.to_string()))?;
        let total = doc.get_pages().len() as u32;
        if range.end_page > total {
            return Err(fail(format!("document has only {} pages", total)));
        }

        let outside: Vec<u32> = (1..=total).filter(|p| !range.contains(*p)).collect();
        doc.delete_pages(&outside);
        null_missing_references(&mut doc);
        strip_book_navigation(&mut doc).map_err(|e| fail(e.to_string()))?;

        doc.prune_objects();
        doc.renumber_objects();
        doc.compress();

        let kept = doc.get_pages().len() as u32;
        if kept != range.page_count() {
            return Err(fail(format!(
                "slice has {} pages, expected {}",
                kept,
                range.page_count()
            )));
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).map_err(|e| fail(e.to_string()))?;
        log::debug!(
            "Extracted \"{}\" (pages {}-{}, {} bytes)",
            range.title,
            range.start_page,
            range.end_page,
            bytes.len()
        );
        Ok(bytes)
    }

    /// Slice every range of `partition` into `dir`.
    ///
    /// A failing slice is recorded and the remaining ranges are still
    /// attempted. Results come back in range order whether or not the work
    /// ran in parallel.
    pub fn write_all(&self, partition: &Partition, dir: &Path) -> Result<PartitionReport> {
        std::fs::create_dir_all(dir)?;

        let work = |range: &ChapterRange| -> Result<WrittenPdf> {
            let name = ArtifactName::of(range);
            let bytes = self.extract(range)?;
            let path = dir.join(name.pdf_file());
            std::fs::write(&path, &bytes).map_err(|e| Error::Partition {
                title: range.title.clone(),
                start: range.start_page,
                end: range.end_page,
                reason: format!("cannot write {}: {}", path.display(), e),
            })?;
            Ok(WrittenPdf {
                name,
                range: range.clone(),
                path,
                size: bytes.len(),
            })
        };

        let results: Vec<Result<WrittenPdf>> = if self.parallel {
            partition.ranges().par_iter().map(work).collect()
        } else {
            partition.ranges().iter().map(work).collect()
        };

        let mut report = PartitionReport::default();
        for result in results {
            match result {
                Ok(written) => report.written.push(written),
                Err(err) => {
                    log::error!("{}", err);
                    report.failures.push(err);
                }
            }
        }

        log::info!(
            "Wrote {} PDF slices to {} ({} failed)",
            report.written.len(),
            dir.display(),
            report.failures.len()
        );
        Ok(report)
    }
}

/// Replace references to objects that no longer exist with `null`.
///
/// Page deletion leaves destinations and annotations on kept pages pointing
/// at removed pages; after renumbering those ids would alias live objects.
fn null_missing_references(doc: &mut LopdfDocument) {
    let live: HashSet<ObjectId> = doc.objects.keys().copied().collect();
    for object in doc.objects.values_mut() {
        scrub(object, &live);
    }
    for (_, value) in doc.trailer.iter_mut() {
        scrub(value, &live);
    }
}

fn scrub(object: &mut Object, live: &HashSet<ObjectId>) {
    match object {
        Object::Reference(id) if !live.contains(id) => *object = Object::Null,
        Object::Array(items) => {
            for item in items.iter_mut() {
                scrub(item, live);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                scrub(value, live);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                scrub(value, live);
            }
        }
        _ => {}
    }
}

fn strip_book_navigation(doc: &mut LopdfDocument) -> Result<()> {
    for key in STALE_TRAILER_KEYS {
        doc.trailer.remove(key);
    }

    let root = doc.trailer.get(b"Root")?.as_reference()?;
    let catalog = doc.get_object_mut(root)?.as_dict_mut()?;
    for key in BOOK_LEVEL_CATALOG_KEYS {
        catalog.remove(key);
    }
    // Page mode "use outlines" would open an empty panel.
    if matches!(catalog.get(b"PageMode"), Ok(Object::Name(mode)) if mode == b"UseOutlines") {
        catalog.remove(b"PageMode");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangeKind;

    fn range(start: u32, end: u32) -> ChapterRange {
        ChapterRange {
            title: "Test".to_string(),
            start_page: start,
            end_page: end,
            kind: RangeKind::Chapter,
            ordinal: 1,
            aliases: Vec::new(),
        }
    }

    #[test]
    fn test_invalid_span_is_partition_error() {
        let partitioner = PdfPartitioner::new(b"%PDF-1.5\n");
        let err = partitioner.extract(&range(5, 4)).unwrap_err();
        assert!(matches!(err, Error::Partition { start: 5, end: 4, .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unparseable_master_is_partition_error() {
        let partitioner = PdfPartitioner::new(b"not a pdf at all");
        assert!(matches!(
            partitioner.extract(&range(1, 1)),
            Err(Error::Partition { .. })
        ));
    }

    #[test]
    fn test_scrub_missing_references() {
        let live: HashSet<ObjectId> = [(1, 0)].into_iter().collect();
        let mut object = Object::Array(vec![
            Object::Reference((1, 0)),
            Object::Reference((9, 0)),
            Object::Name(b"XYZ".to_vec()),
        ]);
        scrub(&mut object, &live);
        assert_eq!(
            object,
            Object::Array(vec![
                Object::Reference((1, 0)),
                Object::Null,
                Object::Name(b"XYZ".to_vec()),
            ])
        );
    }
}
