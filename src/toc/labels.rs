//! Printed page labels.
//!
//! LaTeX books number front matter in roman numerals and restart arabic
//! numbering at the first chapter, so the page printed in the TOC is not the
//! physical page. hyperref records the printed numbering in the catalog's
//! `/PageLabels` number tree; this module expands that tree into one label per
//! physical page.

use lopdf::{Dictionary, Document as LopdfDocument, Object};

use super::deref;
use crate::source::decode_pdf_string;

/// Largest label counter accepted from `/St`.
pub const MAX_COUNTER: u32 = 100_000;

/// Numbering style of a label range (`/S` entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelStyle {
    /// 1, 2, 3
    #[default]
    Decimal,
    /// I, II, III
    UpperRoman,
    /// i, ii, iii
    LowerRoman,
    /// A, B, ..., Z, AA, BB
    UpperAlpha,
    /// a, b, ..., z, aa, bb
    LowerAlpha,
    /// Prefix only, no number
    None,
}

impl LabelStyle {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"D" => LabelStyle::Decimal,
            b"R" => LabelStyle::UpperRoman,
            b"r" => LabelStyle::LowerRoman,
            b"A" => LabelStyle::UpperAlpha,
            b"a" => LabelStyle::LowerAlpha,
            _ => LabelStyle::None,
        }
    }

    /// Format a counter value in this style.
    ///
    /// Letter styles grow with the value, so counters past
    /// [`MAX_COUNTER`] are written as decimals.
    pub fn format(self, value: u32) -> String {
        if value > MAX_COUNTER && self != LabelStyle::None {
            return value.to_string();
        }
        match self {
            LabelStyle::Decimal => value.to_string(),
            LabelStyle::UpperRoman => to_roman(value),
            LabelStyle::LowerRoman => to_roman(value).to_lowercase(),
            LabelStyle::UpperAlpha => to_alpha(value),
            LabelStyle::LowerAlpha => to_alpha(value).to_lowercase(),
            LabelStyle::None => String::new(),
        }
    }
}

/// One entry of the number tree: pages from `first_index` on use this style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRange {
    /// 0-based physical page index where the range begins.
    pub first_index: u32,
    /// Numbering style.
    pub style: LabelStyle,
    /// Label prefix (`/P`).
    pub prefix: String,
    /// Counter value of the first page (`/St`).
    pub start: u32,
}

impl LabelRange {
    /// Create a range with no prefix starting at counter 1.
    pub fn new(first_index: u32, style: LabelStyle) -> Self {
        Self {
            first_index,
            style,
            prefix: String::new(),
            start: 1,
        }
    }
}

/// Printed label of every physical page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLabels {
    labels: Vec<String>,
}

impl PageLabels {
    /// Expand label ranges over `total_pages` pages.
    ///
    /// Pages before the first range are labelled with their physical number,
    /// which is what viewers display when no range covers them.
    pub fn from_ranges(total_pages: u32, mut ranges: Vec<LabelRange>) -> Self {
        ranges.sort_by_key(|r| r.first_index);
        let labels = (0..total_pages)
            .map(|idx| {
                match ranges.iter().rev().find(|r| r.first_index <= idx) {
                    Some(range) => {
                        let counter = range.start.saturating_add(idx - range.first_index);
                        format!("{}{}", range.prefix, range.style.format(counter))
                    }
                    None => (idx + 1).to_string(),
                }
            })
            .collect();
        Self { labels }
    }

    /// Read `/PageLabels` from the document catalog, if present.
    pub fn from_document(doc: &LopdfDocument, total_pages: u32) -> Option<Self> {
        let catalog = doc.catalog().ok()?;
        let tree = deref(doc, catalog.get(b"PageLabels").ok()?)?.as_dict().ok()?;

        let mut ranges = Vec::new();
        collect_number_tree(doc, tree, &mut ranges, 0);
        if ranges.is_empty() {
            return None;
        }
        log::debug!("Found {} page label ranges", ranges.len());
        Some(Self::from_ranges(total_pages, ranges))
    }

    /// Label of a physical page (1-based).
    pub fn label(&self, page: u32) -> Option<&str> {
        page.checked_sub(1)
            .and_then(|idx| self.labels.get(idx as usize))
            .map(String::as_str)
    }

    /// Physical page carrying `label`, searching from page `from` forward.
    ///
    /// Labels repeat when numbering restarts; the first occurrence at or after
    /// `from` keeps TOC anchors in document order. If there is none, the first
    /// occurrence anywhere is returned so the caller can report the ordering
    /// problem.
    pub fn physical_page(&self, label: &str, from: u32) -> Option<u32> {
        let label = label.trim();
        let position = |skip: usize| {
            self.labels
                .iter()
                .enumerate()
                .skip(skip)
                .find(|(_, l)| l.as_str() == label)
                .map(|(idx, _)| idx as u32 + 1)
        };
        position(from.saturating_sub(1) as usize).or_else(|| position(0))
    }

    /// Number of labelled pages.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Check if no pages are labelled.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn collect_number_tree(
    doc: &LopdfDocument,
    node: &Dictionary,
    ranges: &mut Vec<LabelRange>,
    depth: usize,
) {
    // Guard against reference cycles in malformed trees.
    if depth > 32 {
        return;
    }

    if let Some(nums) = node
        .get(b"Nums")
        .ok()
        .and_then(|o| deref(doc, o))
        .and_then(|o| o.as_array().ok())
    {
        for pair in nums.chunks_exact(2) {
            let Ok(first_index) = pair[0].as_i64() else {
                continue;
            };
            let Some(dict) = deref(doc, &pair[1]).and_then(|o| o.as_dict().ok()) else {
                continue;
            };
            ranges.push(label_range(first_index.max(0) as u32, dict));
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
                collect_number_tree(doc, kid, ranges, depth + 1);
            }
        }
    }
}

fn label_range(first_index: u32, dict: &Dictionary) -> LabelRange {
    let style = dict
        .get(b"S")
        .ok()
        .and_then(|o| o.as_name().ok())
        .map(LabelStyle::from_name)
        .unwrap_or(LabelStyle::None);
    let prefix = match dict.get(b"P") {
        Ok(Object::String(bytes, _)) => decode_pdf_string(bytes),
        _ => String::new(),
    };
    let start = match dict.get(b"St").ok().and_then(|o| o.as_i64().ok()) {
        Some(st) if st > 0 && st <= MAX_COUNTER as i64 => st as u32,
        Some(st) => {
            log::warn!("Ignoring page label start {} at page index {}", st, first_index);
            1
        }
        None => 1,
    };

    LabelRange {
        first_index,
        style,
        prefix,
        start,
    }
}

fn to_roman(mut value: u32) -> String {
    const NUMERALS: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (n, s) in NUMERALS {
        while value >= n {
            out.push_str(s);
            value -= n;
        }
    }
    out
}

fn to_alpha(value: u32) -> String {
    if value == 0 {
        return String::new();
    }
    let letter = (b'A' + ((value - 1) % 26) as u8) as char;
    let repeat = ((value - 1) / 26 + 1) as usize;
    std::iter::repeat(letter).take(repeat).collect()
}
