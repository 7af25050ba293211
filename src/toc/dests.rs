//! Named destinations.
//!
//! hyperref writes one named destination per sectioning command
//! (`chapter.3`, `section.3.2`) and records the name as the fourth argument of
//! each `.toc` line. The name resolves straight to a physical page, which makes
//! it the most reliable anchor a TOC entry can carry.

use std::collections::{BTreeMap, HashMap};

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::deref;
use crate::source::decode_pdf_string;

/// Destination name → physical page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedDestinations {
    map: BTreeMap<String, u32>,
}

impl NamedDestinations {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every named destination of a document.
    ///
    /// Reads the `/Names → /Dests` name tree and the legacy catalog `/Dests`
    /// dictionary. On a name present in both, the name tree wins.
    pub fn from_document(doc: &LopdfDocument, pages: &BTreeMap<u32, ObjectId>) -> Self {
        let lookup = PageLookup::new(pages);
        let mut dests = Self::new();

        let Ok(catalog) = doc.catalog() else {
            return dests;
        };

        if let Some(tree) = catalog
            .get(b"Names")
            .ok()
            .and_then(|o| deref(doc, o))
            .and_then(|o| o.as_dict().ok())
            .and_then(|names| names.get(b"Dests").ok())
            .and_then(|o| deref(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            collect_name_tree(doc, tree, &lookup, &mut dests.map, 0);
        }

        if let Some(legacy) = catalog
            .get(b"Dests")
            .ok()
            .and_then(|o| deref(doc, o))
            .and_then(|o| o.as_dict().ok())
        {
            for (key, value) in legacy.iter() {
                let name = String::from_utf8_lossy(key).to_string();
                if dests.map.contains_key(&name) {
                    continue;
                }
                if let Some(page) = explicit_page(doc, value, &lookup) {
                    dests.map.insert(name, page);
                }
            }
        }

        log::debug!("Collected {} named destinations", dests.len());
        dests
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, page: u32) -> Self {
        self.map.insert(name.into(), page);
        self
    }

    /// Physical page of a destination name.
    pub fn get(&self, name: &str) -> Option<u32> {
        self.map.get(name).copied()
    }

    /// Number of destinations.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Check if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Page object id → physical page number.
pub(crate) struct PageLookup {
    by_id: HashMap<ObjectId, u32>,
}

impl PageLookup {
    pub(crate) fn new(pages: &BTreeMap<u32, ObjectId>) -> Self {
        Self {
            by_id: pages.iter().map(|(num, id)| (*id, *num)).collect(),
        }
    }

    pub(crate) fn page(&self, id: ObjectId) -> Option<u32> {
        self.by_id.get(&id).copied()
    }
}

/// Resolve a destination object to a physical page.
///
/// Explicit destinations (`[page /XYZ ...]`, or a dictionary with `/D`) are
/// resolved directly; string and name destinations go through `named`.
pub(crate) fn resolve_destination(
    doc: &LopdfDocument,
    dest: &Object,
    lookup: &PageLookup,
    named: &NamedDestinations,
) -> Option<u32> {
    match deref(doc, dest)? {
        Object::String(bytes, _) => named.get(&decode_pdf_string(bytes)),
        Object::Name(name) => named.get(&String::from_utf8_lossy(name)),
        other => explicit_page(doc, other, lookup),
    }
}

fn explicit_page(doc: &LopdfDocument, value: &Object, lookup: &PageLookup) -> Option<u32> {
    match deref(doc, value)? {
        Object::Array(arr) => arr
            .first()
            .and_then(|first| first.as_reference().ok())
            .and_then(|id| lookup.page(id)),
        Object::Dictionary(dict) => dict
            .get(b"D")
            .ok()
            .and_then(|d| explicit_page(doc, d, lookup)),
        _ => None,
    }
}

fn collect_name_tree(
    doc: &LopdfDocument,
    node: &Dictionary,
    lookup: &PageLookup,
    out: &mut BTreeMap<String, u32>,
    depth: usize,
) {
    if depth > 32 {
        return;
    }

    if let Some(names) = node
        .get(b"Names")
        .ok()
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_array().ok())
    {
        // [key1 value1 key2 value2 ...]
        for pair in names.chunks_exact(2) {
            let Some(Object::String(key, _)) = deref(doc, &pair[0]) else {
                continue;
            };
            if let Some(page) = explicit_page(doc, &pair[1], lookup) {
                out.entry(decode_pdf_string(key)).or_insert(page);
            }
        }
    }

    if let Some(kids) = node
        .get(b"Kids")
        .ok()
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_array().ok())
    {
        for kid in kids {
            if let Some(kid) = deref(doc, kid).and_then(|o| o.as_dict().ok()) {
                collect_name_tree(doc, kid, lookup, out, depth + 1);
            }
        }
    }
}
