//! TOC entries to page ranges.

use super::{ChapterRange, Partition, RangeKind};
use crate::bibliography::{is_bibliography_title, DEFAULT_HEADING_WORDS};
use crate::error::{Error, Result};
use crate::toc::{TocEntry, TocModel};

/// Converts a [`TocModel`] into a [`Partition`] of physical pages.
///
/// Each top-level entry owns the pages from its anchor up to the next
/// top-level anchor; the last one runs to the end of the document. Pages
/// before the first anchor join the first range.
#[derive(Debug, Clone)]
pub struct PageRangeResolver {
    top_level: Option<u8>,
    heading_words: Vec<String>,
}

impl Default for PageRangeResolver {
    fn default() -> Self {
        Self {
            top_level: None,
            heading_words: DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl PageRangeResolver {
    /// Create a resolver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the level treated as top level.
    pub fn with_top_level(mut self, level: u8) -> Self {
        self.top_level = Some(level);
        self
    }

    /// Titles that mark a TOC entry as the bibliography.
    pub fn with_heading_words(mut self, words: Vec<String>) -> Self {
        self.heading_words = words;
        self
    }

    /// Compute the partition before the bibliography carve-out.
    pub fn resolve(&self, toc: &TocModel) -> Result<Partition> {
        let level = self.top_level.unwrap_or_else(|| toc.top_level());
        let total_pages = toc.total_pages();

        let candidates: Vec<&TocEntry> = toc.entries().iter().filter(|e| e.level == level).collect();
        let is_bibliography = |e: &TocEntry| is_bibliography_title(&e.title, &self.heading_words);
        // Only a bibliography entry after every chapter can mark the bibliography.
        let last_chapter = candidates
            .iter()
            .filter(|e| !is_bibliography(e))
            .map(|e| e.anchor_page)
            .max()
            .unwrap_or(0);

        let mut toc_hint = None;
        let mut top: Vec<&TocEntry> = Vec::new();
        for entry in candidates {
            if is_bibliography(entry) {
                if entry.anchor_page > last_chapter {
                    log::debug!(
                        "TOC entry \"{}\" on page {} taken as bibliography hint",
                        entry.title,
                        entry.anchor_page
                    );
                    if toc_hint.is_none() {
                        toc_hint = Some(entry.anchor_page);
                    }
                    continue;
                }
                log::warn!(
                    "TOC entry \"{}\" on page {} precedes the last chapter; kept as a range",
                    entry.title,
                    entry.anchor_page
                );
            }
            top.push(entry);
        }

        if top.is_empty() {
            return Err(Error::MalformedToc {
                entry: 0,
                detail: format!("no chapter entries at level {}", level),
            });
        }

        let groups = collapse_shared_anchors(&top);
        let first_numbered = groups.iter().position(|g| g.owner.numbered);

        let mut ranges = Vec::with_capacity(groups.len());
        for (idx, group) in groups.iter().enumerate() {
            let start_page = if idx == 0 { 1 } else { group.owner.anchor_page };
            let end_page = match groups.get(idx + 1) {
                Some(next) => next.owner.anchor_page.saturating_sub(1),
                None => total_pages,
            };
            if end_page < start_page {
                return Err(Error::UnresolvableRange {
                    title: group.owner.title.clone(),
                    start: start_page,
                    end: end_page,
                });
            }

            let kind = match first_numbered {
                Some(first) if idx < first && !group.owner.numbered => RangeKind::Preface,
                _ => RangeKind::Chapter,
            };

            ranges.push(ChapterRange {
                title: group.owner.title.clone(),
                start_page,
                end_page,
                kind,
                ordinal: idx as u32 + 1,
                aliases: group.aliases.iter().map(|e| e.title.clone()).collect(),
            });
        }

        if let Some(first) = ranges.first() {
            if top[0].anchor_page > 1 {
                log::debug!(
                    "Front matter pages 1-{} merged into \"{}\"",
                    top[0].anchor_page - 1,
                    first.title
                );
            }
        }
        log::info!(
            "Resolved {} ranges at level {} over {} pages",
            ranges.len(),
            level,
            total_pages
        );

        Ok(Partition::new(total_pages, ranges, toc_hint))
    }
}

struct AnchorGroup<'a> {
    owner: &'a TocEntry,
    aliases: Vec<&'a TocEntry>,
}

/// Group consecutive entries sharing an anchor page under the earliest one.
fn collapse_shared_anchors<'a>(entries: &[&'a TocEntry]) -> Vec<AnchorGroup<'a>> {
    let mut groups: Vec<AnchorGroup<'a>> = Vec::new();
    for &entry in entries {
        match groups.last_mut() {
            Some(group) if group.owner.anchor_page == entry.anchor_page => {
                log::warn!(
                    "\"{}\" shares page {} with \"{}\"; collapsed into the earlier entry",
                    entry.title,
                    entry.anchor_page,
                    group.owner.title
                );
                group.aliases.push(entry);
            }
            _ => groups.push(AnchorGroup {
                owner: entry,
                aliases: Vec::new(),
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toc::{AnchorResolver, RawTocEntry};

    fn model(entries: Vec<RawTocEntry>, total: u32) -> TocModel {
        TocModel::resolve(entries, &AnchorResolver::new(total)).unwrap()
    }

    fn spans(partition: &Partition) -> Vec<(u32, u32)> {
        partition
            .ranges()
            .iter()
            .map(|r| (r.start_page, r.end_page))
            .collect()
    }

    #[test]
    fn test_five_chapters() {
        let toc = model(
            [1, 12, 30, 55, 80]
                .iter()
                .enumerate()
                .map(|(i, &p)| RawTocEntry::physical(format!("Chapter {}", i + 1), 1, p))
                .collect(),
            100,
        );
        let partition = PageRangeResolver::new().resolve(&toc).unwrap();
        assert_eq!(
            spans(&partition),
            vec![(1, 11), (12, 29), (30, 54), (55, 79), (80, 100)]
        );
        assert!(partition.coverage().is_partition());
        assert_eq!(partition.lower_bound(), 81);
    }

    #[test]
    fn test_front_matter_merges_into_first_range() {
        let toc = model(
            vec![
                RawTocEntry::physical("One", 1, 5),
                RawTocEntry::physical("Two", 1, 9),
            ],
            12,
        );
        let partition = PageRangeResolver::new().resolve(&toc).unwrap();
        assert_eq!(spans(&partition), vec![(1, 8), (9, 12)]);
    }

    #[test]
    fn test_shared_anchor_collapses_to_earlier_entry() {
        let toc = model(
            vec![
                RawTocEntry::physical("One", 1, 1),
                RawTocEntry::physical("Two", 1, 10),
                RawTocEntry::physical("Two bis", 1, 10),
                RawTocEntry::physical("Three", 1, 15),
            ],
            20,
        );
        let partition = PageRangeResolver::new().resolve(&toc).unwrap();
        assert_eq!(spans(&partition), vec![(1, 9), (10, 14), (15, 20)]);
        assert_eq!(partition.ranges()[1].title, "Two");
        assert_eq!(partition.ranges()[1].aliases, vec!["Two bis".to_string()]);
        assert_eq!(partition.ranges()[2].ordinal, 3);
    }

    #[test]
    fn test_shared_last_page_never_produces_empty_range() {
        let toc = model(
            vec![
                RawTocEntry::physical("One", 1, 1),
                RawTocEntry::physical("Last", 1, 6),
                RawTocEntry::physical("Also last", 1, 6),
            ],
            6,
        );
        let partition = PageRangeResolver::new().resolve(&toc).unwrap();
        assert_eq!(spans(&partition), vec![(1, 5), (6, 6)]);
    }

    #[test]
    fn test_preface_and_sections_ignored() {
        let toc = model(
            vec![
                RawTocEntry::physical("Preface", 1, 3).unnumbered(),
                RawTocEntry::physical("Intro", 1, 7),
                RawTocEntry::physical("Intro section", 2, 8),
                RawTocEntry::physical("Epilogue", 1, 20).unnumbered(),
            ],
            25,
        );
        let partition = PageRangeResolver::new().resolve(&toc).unwrap();
        let kinds: Vec<RangeKind> = partition.ranges().iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RangeKind::Preface, RangeKind::Chapter, RangeKind::Chapter]
        );
        assert_eq!(spans(&partition), vec![(1, 6), (7, 19), (20, 25)]);
    }

    #[test]
    fn test_bibliography_entry_becomes_hint() {
        let toc = model(
            vec![
                RawTocEntry::physical("One", 1, 1),
                RawTocEntry::physical("Two", 1, 10),
                RawTocEntry::physical("Bibliography", 1, 18).unnumbered(),
            ],
            22,
        );
        let partition = PageRangeResolver::new().resolve(&toc).unwrap();
        assert_eq!(spans(&partition), vec![(1, 9), (10, 22)]);
        assert_eq!(partition.toc_hint(), Some(18));
    }

    #[test]
    fn test_mid_book_references_entry_stays_a_range() {
        let toc = model(
            vec![
                RawTocEntry::physical("One", 1, 1),
                RawTocEntry::physical("References", 1, 8).unnumbered(),
                RawTocEntry::physical("Two", 1, 10),
                RawTocEntry::physical("Bibliography", 1, 18).unnumbered(),
            ],
            22,
        );
        let partition = PageRangeResolver::new().resolve(&toc).unwrap();
        assert_eq!(spans(&partition), vec![(1, 7), (8, 9), (10, 22)]);
        assert_eq!(partition.ranges()[1].title, "References");
        assert_eq!(partition.toc_hint(), Some(18));
    }

    #[test]
    fn test_top_level_override() {
        let toc = model(
            vec![
                RawTocEntry::physical("Part I", 0, 1),
                RawTocEntry::physical("One", 1, 2),
                RawTocEntry::physical("Part II", 0, 10),
                RawTocEntry::physical("Two", 1, 11),
            ],
            15,
        );
        let partition = PageRangeResolver::new().with_top_level(0).resolve(&toc).unwrap();
        assert_eq!(spans(&partition), vec![(1, 9), (10, 15)]);
    }

    #[test]
    fn test_no_top_level_entries() {
        let toc = model(vec![RawTocEntry::physical("Deep", 3, 1)], 5);
        let err = PageRangeResolver::new().with_top_level(1).resolve(&toc).unwrap_err();
        assert!(matches!(err, Error::MalformedToc { .. }));
    }
}
