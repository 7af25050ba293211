//! Master document access layer.
//!
//! Provides a trait-based interface for reading rendered page text, isolating
//! the concrete PDF library (lopdf) from the boundary heuristics. The
//! partitioner works on the raw bytes, so the backend keeps them alongside the
//! parsed document.

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Document as LopdfDocument, ObjectId};

use crate::detect::parse_header;
use crate::error::{Error, Result};

/// Page-addressable text access.
///
/// Pages are 1-based physical indices. Implementations must be deterministic:
/// the same page always yields the same text.
pub trait PageSource {
    /// Number of physical pages.
    fn page_count(&self) -> u32;

    /// Rendered text of one physical page.
    fn page_text(&self, page: u32) -> Result<String>;
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8, or Latin-1).
pub fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = body
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Concrete [`PageSource`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
    bytes: Vec<u8>,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::load_bytes(bytes)
    }

    /// Load from an owned byte buffer.
    pub fn load_bytes(bytes: Vec<u8>) -> Result<Self> {
        let header = parse_header(&bytes)?;
        let doc = LopdfDocument::load_mem(&bytes)?;
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        let pages = doc.get_pages();
        log::debug!("Loaded master document ({}, {} pages)", header, pages.len());
        Ok(Self {
            doc,
            bytes,
            pages,
        })
    }

    /// Direct access to the underlying `lopdf::Document`.
    ///
    /// Escape hatch for catalog-level lookups (outline, page labels, named
    /// destinations) that the TOC layer performs.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// The bytes the document was loaded from.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Physical page number → page object id.
    pub fn page_ids(&self) -> &BTreeMap<u32, ObjectId> {
        &self.pages
    }
}

impl PageSource for LopdfBackend {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        if !self.pages.contains_key(&page) {
            return Err(Error::PdfParse(format!(
                "page {} is out of range (document has {} pages)",
                page,
                self.pages.len()
            )));
        }
        self.doc
            .extract_text(&[page])
            .map_err(|e| Error::PdfParse(format!("page {}: {}", page, e)))
    }
}

/// In-memory page texts, for callers that already hold extracted text.
#[derive(Debug, Clone, Default)]
pub struct TextPages {
    pages: Vec<String>,
}

impl TextPages {
    /// Wrap page texts; index 0 is physical page 1.
    pub fn new(pages: Vec<String>) -> Self {
        Self { pages }
    }

    /// `count` empty pages.
    pub fn blank(count: u32) -> Self {
        Self::new(vec![String::new(); count as usize])
    }

    /// Replace the text of one physical page.
    pub fn with_page(mut self, page: u32, text: impl Into<String>) -> Self {
        if let Some(slot) = page
            .checked_sub(1)
            .and_then(|idx| self.pages.get_mut(idx as usize))
        {
            *slot = text.into();
        }
        self
    }
}

impl PageSource for TextPages {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String> {
        page.checked_sub(1)
            .and_then(|idx| self.pages.get(idx as usize))
            .cloned()
            .ok_or_else(|| Error::PdfParse(format!("page {} is out of range", page)))
    }
}
