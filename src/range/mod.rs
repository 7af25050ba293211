//! Physical page ranges and the book partition.

mod resolver;

pub use resolver::PageRangeResolver;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// What a range holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    /// A numbered chapter, or any top-level entry after the first numbered one.
    Chapter,
    /// Unnumbered top-level matter before the first numbered chapter.
    Preface,
    /// The carved-out bibliography.
    Bibliography,
}

impl std::fmt::Display for RangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RangeKind::Chapter => "chapter",
            RangeKind::Preface => "preface",
            RangeKind::Bibliography => "bibliography",
        };
        f.write_str(name)
    }
}

/// Inclusive physical page span owned by one logical unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRange {
    /// Title of the owning TOC entry.
    pub title: String,
    /// First page (1-based).
    pub start_page: u32,
    /// Last page, inclusive.
    pub end_page: u32,
    /// Range kind.
    pub kind: RangeKind,
    /// Position in TOC order, starting at 1.
    pub ordinal: u32,
    /// Titles of entries collapsed into this range because they shared its
    /// anchor page.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl ChapterRange {
    /// Number of pages in the range.
    pub fn page_count(&self) -> u32 {
        self.end_page + 1 - self.start_page
    }

    /// Check if a physical page belongs to the range.
    pub fn contains(&self, page: u32) -> bool {
        (self.start_page..=self.end_page).contains(&page)
    }

    /// Check if this is the bibliography range.
    pub fn is_bibliography(&self) -> bool {
        self.kind == RangeKind::Bibliography
    }
}

/// Page window of the bibliography.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BibliographyWindow {
    /// First bibliography page.
    pub start_page: u32,
    /// Last bibliography page, inclusive.
    pub end_page: u32,
}

impl BibliographyWindow {
    /// Window from `start_page` to the end of the document.
    pub fn to_end(start_page: u32, total_pages: u32) -> Self {
        Self {
            start_page,
            end_page: total_pages,
        }
    }

    /// Number of pages in the window.
    pub fn page_count(&self) -> u32 {
        self.end_page + 1 - self.start_page
    }
}

impl std::fmt::Display for BibliographyWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_page, self.end_page)
    }
}

/// The final split of `[1, total_pages]` shared by every later stage.
///
/// The bibliography window lives here and nowhere else, so the PDF slices
/// and the HTML site are cut at the same page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    total_pages: u32,
    ranges: Vec<ChapterRange>,
    bibliography: Option<BibliographyWindow>,
    toc_hint: Option<u32>,
}

impl Partition {
    pub(crate) fn new(total_pages: u32, ranges: Vec<ChapterRange>, toc_hint: Option<u32>) -> Self {
        Self {
            total_pages,
            ranges,
            bibliography: None,
            toc_hint,
        }
    }

    /// Physical page count of the master document.
    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// All ranges in page order, the bibliography last.
    pub fn ranges(&self) -> &[ChapterRange] {
        &self.ranges
    }

    /// Ranges other than the bibliography, in TOC order.
    pub fn chapters(&self) -> impl Iterator<Item = &ChapterRange> {
        self.ranges.iter().filter(|r| !r.is_bibliography())
    }

    /// The carved bibliography window, if one was found.
    pub fn bibliography(&self) -> Option<BibliographyWindow> {
        self.bibliography
    }

    /// The bibliography range, if one was carved.
    pub fn bibliography_range(&self) -> Option<&ChapterRange> {
        self.ranges.iter().find(|r| r.is_bibliography())
    }

    /// Anchor of a "Bibliography" TOC entry, when the TOC had one.
    pub fn toc_hint(&self) -> Option<u32> {
        self.toc_hint
    }

    /// First page the bibliography may start on: one past the last
    /// chapter's anchor.
    pub fn lower_bound(&self) -> u32 {
        self.chapters()
            .last()
            .map(|r| r.start_page + 1)
            .unwrap_or(1)
    }

    /// Range owning a physical page.
    pub fn owner_of(&self, page: u32) -> Option<&ChapterRange> {
        let idx = self
            .ranges
            .partition_point(|r| r.end_page < page);
        self.ranges.get(idx).filter(|r| r.contains(page))
    }

    /// Cut the bibliography out of the last chapter.
    ///
    /// The window must start after the last chapter's anchor and run to the
    /// end of the document, so that the truncated chapter keeps at least its
    /// first page and no page is left unclaimed.
    pub fn carve_bibliography(&mut self, window: BibliographyWindow) -> Result<()> {
        if self.bibliography.is_some() {
            return Err(Error::Other(
                "bibliography window is already carved".to_string(),
            ));
        }
        let lower_bound = self.lower_bound();
        if window.start_page < lower_bound
            || window.start_page > window.end_page
            || window.end_page != self.total_pages
        {
            return Err(Error::UnresolvableRange {
                title: "Bibliography".to_string(),
                start: window.start_page,
                end: window.end_page,
            });
        }

        let Some(last) = self.ranges.last_mut() else {
            return Err(Error::Other("partition has no ranges".to_string()));
        };
        last.end_page = window.start_page - 1;
        let ordinal = last.ordinal + 1;

        self.ranges.push(ChapterRange {
            title: "Bibliography".to_string(),
            start_page: window.start_page,
            end_page: window.end_page,
            kind: RangeKind::Bibliography,
            ordinal,
            aliases: Vec::new(),
        });
        self.bibliography = Some(window);
        log::info!("Bibliography occupies pages {}", window);
        Ok(())
    }

    /// Pages claimed more than once and pages claimed by nobody.
    pub fn coverage(&self) -> Coverage {
        Coverage::of(&self.ranges, self.total_pages)
    }
}

/// Page ownership audit of a set of ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Pages owned by two or more ranges.
    pub overlapping: Vec<u32>,
    /// Pages of `[1, total_pages]` owned by no range.
    pub unclaimed: Vec<u32>,
}

impl Coverage {
    /// Audit `ranges` against `[1, total_pages]`.
    pub fn of(ranges: &[ChapterRange], total_pages: u32) -> Self {
        let mut claims = vec![0u32; total_pages as usize];
        let mut coverage = Coverage::default();

        for range in ranges {
            for page in range.start_page..=range.end_page {
                match page.checked_sub(1).and_then(|i| claims.get_mut(i as usize)) {
                    Some(count) => *count += 1,
                    // Out-of-document pages count as double claims.
                    None => coverage.overlapping.push(page),
                }
            }
        }

        for (idx, count) in claims.iter().enumerate() {
            let page = idx as u32 + 1;
            match count {
                0 => coverage.unclaimed.push(page),
                1 => {}
                _ => coverage.overlapping.push(page),
            }
        }
        coverage.overlapping.sort_unstable();
        coverage.overlapping.dedup();
        coverage
    }

    /// Check if every page is claimed exactly once.
    pub fn is_partition(&self) -> bool {
        self.overlapping.is_empty() && self.unclaimed.is_empty()
    }
}

/// Format page numbers as compact spans ("3-5, 9").
pub fn format_pages(pages: &[u32]) -> String {
    let mut spans: Vec<String> = Vec::new();
    let mut iter = pages.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            spans.push(start.to_string());
        } else {
            spans.push(format!("{}-{}", start, end));
        }
    }
    spans.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(title: &str, start: u32, end: u32, ordinal: u32) -> ChapterRange {
        ChapterRange {
            title: title.to_string(),
            start_page: start,
            end_page: end,
            kind: RangeKind::Chapter,
            ordinal,
            aliases: Vec::new(),
        }
    }

    fn sample() -> Partition {
        Partition::new(
            100,
            vec![
                range("A", 1, 11, 1),
                range("B", 12, 29, 2),
                range("C", 30, 54, 3),
                range("D", 55, 79, 4),
                range("E", 80, 100, 5),
            ],
            None,
        )
    }

    #[test]
    fn test_owner_of() {
        let partition = sample();
        assert_eq!(partition.owner_of(1).unwrap().title, "A");
        assert_eq!(partition.owner_of(11).unwrap().title, "A");
        assert_eq!(partition.owner_of(12).unwrap().title, "B");
        assert_eq!(partition.owner_of(100).unwrap().title, "E");
        assert!(partition.owner_of(0).is_none());
        assert!(partition.owner_of(101).is_none());
    }

    #[test]
    fn test_carve_bibliography() {
        let mut partition = sample();
        assert_eq!(partition.lower_bound(), 81);
        partition
            .carve_bibliography(BibliographyWindow::to_end(92, 100))
            .unwrap();

        let last_chapter = partition.chapters().last().unwrap();
        assert_eq!((last_chapter.start_page, last_chapter.end_page), (80, 91));
        let bib = partition.bibliography_range().unwrap();
        assert_eq!((bib.start_page, bib.end_page), (92, 100));
        assert_eq!(bib.kind, RangeKind::Bibliography);
        assert!(partition.coverage().is_partition());
        assert_eq!(partition.owner_of(95).unwrap().kind, RangeKind::Bibliography);
    }

    #[test]
    fn test_carve_rejects_window_inside_chapter_anchor() {
        let mut partition = sample();
        let err = partition
            .carve_bibliography(BibliographyWindow::to_end(80, 100))
            .unwrap_err();
        assert!(matches!(err, Error::UnresolvableRange { start: 80, .. }));
        assert!(partition.bibliography().is_none());
    }

    #[test]
    fn test_coverage_reports_gaps_and_overlaps() {
        let ranges = vec![range("A", 1, 5, 1), range("B", 5, 8, 2)];
        let coverage = Coverage::of(&ranges, 10);
        assert_eq!(coverage.overlapping, vec![5]);
        assert_eq!(coverage.unclaimed, vec![9, 10]);
        assert!(!coverage.is_partition());
    }

    #[test]
    fn test_format_pages() {
        assert_eq!(format_pages(&[3, 4, 5, 9]), "3-5, 9");
        assert_eq!(format_pages(&[]), "");
    }

    #[test]
    fn test_range_kind_serde() {
        let json = serde_json::to_string(&RangeKind::Preface).unwrap();
        assert_eq!(json, "\"preface\"");
    }
}
