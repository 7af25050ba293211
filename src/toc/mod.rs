//! Table-of-contents model.
//!
//! Every TOC source (LaTeX `.toc`, JSON export, PDF bookmarks) is first read
//! into [`RawTocEntry`] values whose anchors may still be printed labels or
//! destination names. [`TocModel::resolve`] then places every anchor on a
//! physical page, producing the ordered [`TocEntry`] sequence the range
//! resolver consumes.

mod dests;
mod json;
mod labels;
mod latex;
mod outline;

pub use dests::NamedDestinations;
pub use json::parse_json_toc;
pub use labels::{LabelRange, LabelStyle, PageLabels};
pub use latex::{clean_title, parse_latex_toc, unit_level};
pub use outline::read_outline;

use lopdf::{Document as LopdfDocument, Object};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::{LopdfBackend, PageSource};

/// Level of `\chapter` entries.
pub const CHAPTER_LEVEL: u8 = 1;

pub(crate) fn deref<'a>(doc: &'a LopdfDocument, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Where a TOC entry points before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Already a 1-based physical page.
    Physical(u32),
    /// A printed page label ("v", "27", "A-3").
    Label(String),
}

impl std::fmt::Display for Anchor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Anchor::Physical(page) => write!(f, "physical page {}", page),
            Anchor::Label(label) => write!(f, "page label \"{}\"", label),
        }
    }
}

/// A TOC entry as read from its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTocEntry {
    /// Heading text.
    pub title: String,
    /// Depth (part 0, chapter 1, section 2, ...).
    pub level: u8,
    /// Page anchor.
    pub anchor: Anchor,
    /// Named destination, preferred over the anchor when it resolves.
    pub dest: Option<String>,
    /// Whether the heading carries a number.
    pub numbered: bool,
}

impl RawTocEntry {
    /// Numbered entry anchored at a physical page.
    pub fn physical(title: impl Into<String>, level: u8, page: u32) -> Self {
        Self {
            title: title.into(),
            level,
            anchor: Anchor::Physical(page),
            dest: None,
            numbered: true,
        }
    }

    /// Numbered entry anchored at a printed label.
    pub fn labelled(title: impl Into<String>, level: u8, label: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            level,
            anchor: Anchor::Label(label.into()),
            dest: None,
            numbered: true,
        }
    }

    /// Set the named destination.
    pub fn with_dest(mut self, dest: impl Into<String>) -> Self {
        self.dest = Some(dest.into());
        self
    }

    /// Mark the entry as unnumbered.
    pub fn unnumbered(mut self) -> Self {
        self.numbered = false;
        self
    }
}

/// A TOC entry placed on a physical page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading text.
    pub title: String,
    /// Depth.
    pub level: u8,
    /// 1-based physical page.
    pub anchor_page: u32,
    /// Whether the heading carries a number.
    pub numbered: bool,
}

/// Maps anchors into physical page space.
///
/// Lookup order: named destination, `/PageLabels` table, integer label plus
/// offset.
#[derive(Debug, Clone)]
pub struct AnchorResolver {
    total_pages: u32,
    labels: Option<PageLabels>,
    dests: NamedDestinations,
    offset: i64,
}

impl AnchorResolver {
    /// Resolver for a document of `total_pages` pages with no label metadata.
    pub fn new(total_pages: u32) -> Self {
        Self {
            total_pages,
            labels: None,
            dests: NamedDestinations::new(),
            offset: 0,
        }
    }

    /// Resolver using the page labels and destinations of a loaded document.
    pub fn from_backend(backend: &LopdfBackend) -> Self {
        let total_pages = backend.page_count();
        let doc = backend.raw_doc();
        Self {
            total_pages,
            labels: PageLabels::from_document(doc, total_pages),
            dests: NamedDestinations::from_document(doc, backend.page_ids()),
            offset: 0,
        }
    }

    /// Use an explicit label table.
    pub fn with_labels(mut self, labels: PageLabels) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Use an explicit destination table.
    pub fn with_destinations(mut self, dests: NamedDestinations) -> Self {
        self.dests = dests;
        self
    }

    /// Offset added to integer labels when no label table exists.
    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }

    /// Number of physical pages.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Named destinations known to this resolver.
    pub fn destinations(&self) -> &NamedDestinations {
        &self.dests
    }

    /// Physical page of an entry, searching labels from page `from` on.
    ///
    /// The result may lie outside the document; range checks belong to the
    /// caller so the error can name the entry.
    pub fn resolve(&self, entry: &RawTocEntry, from: u32) -> Option<i64> {
        if let Some(page) = entry.dest.as_deref().and_then(|d| self.dests.get(d)) {
            return Some(page as i64);
        }

        match &entry.anchor {
            Anchor::Physical(page) => Some(*page as i64),
            Anchor::Label(label) => match &self.labels {
                Some(labels) => labels.physical_page(label, from).map(i64::from),
                None => label.trim().parse::<i64>().ok().map(|n| n + self.offset),
            },
        }
    }
}

/// Ordered, resolved table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocModel {
    entries: Vec<TocEntry>,
    total_pages: u32,
}

impl TocModel {
    /// Place every raw entry on a physical page.
    ///
    /// Fails with `MalformedToc` when an anchor resolves nowhere, lands
    /// outside `[1, total_pages]`, or precedes the previous entry's anchor.
    pub fn resolve(raw: Vec<RawTocEntry>, resolver: &AnchorResolver) -> Result<Self> {
        let total_pages = resolver.total_pages();
        if raw.is_empty() {
            return Err(Error::MalformedToc {
                entry: 0,
                detail: "table of contents has no entries".to_string(),
            });
        }

        let mut entries = Vec::with_capacity(raw.len());
        let mut previous = 1u32;

        for (idx, entry) in raw.into_iter().enumerate() {
            let number = idx + 1;
            let page = resolver
                .resolve(&entry, previous)
                .ok_or_else(|| Error::MalformedToc {
                    entry: number,
                    detail: format!(
                        "\"{}\": {} does not match any page",
                        entry.title, entry.anchor
                    ),
                })?;

            if page < 1 || page > total_pages as i64 {
                return Err(Error::MalformedToc {
                    entry: number,
                    detail: format!(
                        "\"{}\": {} resolves to page {}, outside 1-{}",
                        entry.title, entry.anchor, page, total_pages
                    ),
                });
            }
            let page = page as u32;

            if page < previous {
                return Err(Error::MalformedToc {
                    entry: number,
                    detail: format!(
                        "\"{}\": anchor page {} precedes previous anchor page {}",
                        entry.title, page, previous
                    ),
                });
            }
            previous = page;

            entries.push(TocEntry {
                title: entry.title,
                level: entry.level,
                anchor_page: page,
                numbered: entry.numbered,
            });
        }

        log::info!(
            "Resolved {} TOC entries over {} pages",
            entries.len(),
            total_pages
        );
        Ok(Self {
            entries,
            total_pages,
        })
    }

    /// Build from entries that are already physical.
    pub fn from_physical(entries: Vec<TocEntry>, total_pages: u32) -> Result<Self> {
        let raw = entries
            .into_iter()
            .map(|e| RawTocEntry {
                title: e.title,
                level: e.level,
                anchor: Anchor::Physical(e.anchor_page),
                dest: None,
                numbered: e.numbered,
            })
            .collect();
        Self::resolve(raw, &AnchorResolver::new(total_pages))
    }

    /// Entries in document order.
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Physical page count the model was resolved against.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Level treated as top level: chapters when present, else the
    /// shallowest level in the model.
    pub fn top_level(&self) -> u8 {
        if self.entries.iter().any(|e| e.level == CHAPTER_LEVEL) {
            CHAPTER_LEVEL
        } else {
            self.entries
                .iter()
                .map(|e| e.level)
                .min()
                .unwrap_or(CHAPTER_LEVEL)
        }
    }
}
