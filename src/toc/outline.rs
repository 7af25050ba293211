//! Reader for the master document's bookmarks.
//!
//! hyperref mirrors the TOC into `/Outlines`; every bookmark points at a
//! physical page, so no label resolution is needed. Depth in the tree is the
//! level, with top-level bookmarks at level 1.

use std::collections::HashSet;

use lopdf::{Dictionary, ObjectId};

use super::dests::{resolve_destination, NamedDestinations, PageLookup};
use super::{deref, Anchor, RawTocEntry};
use crate::error::{Error, Result};
use crate::source::{decode_pdf_string, LopdfBackend};

/// Read the outline of a loaded document in reading order.
///
/// A document without bookmarks yields no entries. A bookmark whose target
/// cannot be placed on a page is a malformed TOC.
pub fn read_outline(backend: &LopdfBackend, named: &NamedDestinations) -> Result<Vec<RawTocEntry>> {
    let doc = backend.raw_doc();
    let mut reader = OutlineReader {
        backend,
        lookup: PageLookup::new(backend.page_ids()),
        named,
        visited: HashSet::new(),
        entries: Vec::new(),
    };

    let first = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_dict().ok())
        .and_then(|outlines| outlines.get(b"First").ok())
        .and_then(|o| o.as_reference().ok());

    match first {
        Some(first) => reader.read_items(first, 1)?,
        None => log::warn!("Master document has no outline"),
    }

    log::debug!("Read {} outline entries", reader.entries.len());
    Ok(reader.entries)
}

struct OutlineReader<'a> {
    backend: &'a LopdfBackend,
    lookup: PageLookup,
    named: &'a NamedDestinations,
    visited: HashSet<ObjectId>,
    entries: Vec<RawTocEntry>,
}

impl OutlineReader<'_> {
    /// Walk one sibling chain, descending into children before moving on.
    fn read_items(&mut self, first: ObjectId, level: u8) -> Result<()> {
        let doc = self.backend.raw_doc();
        let mut current = Some(first);

        while let Some(item_ref) = current {
            // A bookmark revisited means a Next/First cycle.
            if !self.visited.insert(item_ref) {
                log::warn!("Outline cycle at object {:?}; stopping", item_ref);
                break;
            }
            let Ok(item) = doc.get_dictionary(item_ref) else {
                break;
            };

            let title = match item.get(b"Title") {
                Ok(lopdf::Object::String(bytes, _)) => decode_pdf_string(bytes).trim().to_string(),
                _ => String::new(),
            };
            let page = self.destination_page(item).ok_or_else(|| Error::MalformedToc {
                entry: self.entries.len() + 1,
                detail: format!("bookmark \"{}\" does not point at a page", title),
            })?;

            self.entries.push(RawTocEntry {
                numbered: looks_numbered(&title),
                title,
                level,
                anchor: Anchor::Physical(page),
                dest: None,
            });

            if let Ok(child) = item.get(b"First").and_then(|o| o.as_reference()) {
                self.read_items(child, level.saturating_add(1))?;
            }

            current = item.get(b"Next").and_then(|o| o.as_reference()).ok();
        }

        Ok(())
    }

    fn destination_page(&self, item: &Dictionary) -> Option<u32> {
        let doc = self.backend.raw_doc();

        if let Ok(dest) = item.get(b"Dest") {
            return resolve_destination(doc, dest, &self.lookup, self.named);
        }

        // GoTo action
        let action = item
            .get(b"A")
            .ok()
            .and_then(|a| deref(doc, a))
            .and_then(|a| a.as_dict().ok())?;
        let dest = action.get(b"D").ok()?;
        resolve_destination(doc, dest, &self.lookup, self.named)
    }
}

/// Bookmarks carry the rendered number ("3 Wave Optics", "Chapter 3").
fn looks_numbered(title: &str) -> bool {
    let title = title.trim_start();
    title.starts_with(|c: char| c.is_ascii_digit())
        || title
            .strip_prefix("Chapter ")
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_numbered() {
        assert!(looks_numbered("3 Wave Optics"));
        assert!(looks_numbered("Chapter 12: Lasers"));
        assert!(!looks_numbered("Preface"));
        assert!(!looks_numbered("Chapter Zero"));
    }
}
