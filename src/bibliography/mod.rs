//! Bibliography boundary detection.
//!
//! The bibliography has no TOC entry of its own (or one that cannot be
//! trusted), so its first page is found from page content. Detection sits
//! behind the [`BoundaryLocator`] trait: given the document and the first page
//! the bibliography may start on, return a window or nothing. The finder
//! picks a locator, runs it once, and the result is stored in the
//! [`Partition`] that every later stage reads.

mod signature;

pub use signature::{
    is_bibliography_title, Signature, SignatureSettings, DEFAULT_HEADING_WINDOW,
    DEFAULT_HEADING_WORDS, DEFAULT_MIN_ENTRY_MARKERS,
};

pub use crate::range::BibliographyWindow;

use crate::error::{Error, Result};
use crate::range::Partition;
use crate::source::PageSource;

/// Pages before the TOC hint included in the hinted scan.
pub const HINT_PAGES_BEFORE: u32 = 12;

/// Pages after the TOC hint included in the hinted scan.
pub const HINT_PAGES_AFTER: u32 = 60;

/// Strategy for locating the bibliography.
///
/// Implementations must be deterministic: the same document and lower bound
/// always give the same answer.
pub trait BoundaryLocator: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    /// Find the bibliography window at or after `lower_bound`.
    fn locate(&self, source: &dyn PageSource, lower_bound: u32) -> Result<Option<BibliographyWindow>>;
}

/// First page in `pages` whose text matches the signature.
fn scan(
    signature: &Signature,
    source: &dyn PageSource,
    pages: std::ops::RangeInclusive<u32>,
) -> Result<Option<u32>> {
    for page in pages {
        let text = source.page_text(page)?;
        if signature.matches(&text) {
            log::debug!("Bibliography signature matched on page {}", page);
            return Ok(Some(page));
        }
    }
    Ok(None)
}

/// Scan forward from the lower bound for the signature.
#[derive(Debug, Clone, Default)]
pub struct SignatureLocator {
    signature: Signature,
}

impl SignatureLocator {
    /// Create a locator using the given signature.
    pub fn new(signature: Signature) -> Self {
        Self { signature }
    }
}

impl BoundaryLocator for SignatureLocator {
    fn name(&self) -> &str {
        "signature"
    }

    fn locate(&self, source: &dyn PageSource, lower_bound: u32) -> Result<Option<BibliographyWindow>> {
        let total = source.page_count();
        let start = scan(&self.signature, source, lower_bound.max(1)..=total)?;
        Ok(start.map(|page| BibliographyWindow::to_end(page, total)))
    }
}

/// Scan a window around a TOC hint first, then fall back to a full scan.
#[derive(Debug, Clone)]
pub struct TocHintLocator {
    hint: u32,
    signature: Signature,
}

impl TocHintLocator {
    /// Create a locator around the hinted page.
    pub fn new(hint: u32, signature: Signature) -> Self {
        Self { hint, signature }
    }
}

impl BoundaryLocator for TocHintLocator {
    fn name(&self) -> &str {
        "toc-hint"
    }

    fn locate(&self, source: &dyn PageSource, lower_bound: u32) -> Result<Option<BibliographyWindow>> {
        let total = source.page_count();
        let lower_bound = lower_bound.max(1);
        let from = self.hint.saturating_sub(HINT_PAGES_BEFORE).max(lower_bound);
        let to = self.hint.saturating_add(HINT_PAGES_AFTER).min(total);

        if let Some(page) = scan(&self.signature, source, from..=to)? {
            return Ok(Some(BibliographyWindow::to_end(page, total)));
        }

        log::debug!(
            "No match within pages {}-{} around hint {}; scanning from {}",
            from,
            to,
            self.hint,
            lower_bound
        );
        let start = scan(&self.signature, source, lower_bound..=total)?;
        Ok(start.map(|page| BibliographyWindow::to_end(page, total)))
    }
}

/// The last `pages` pages are the bibliography.
#[derive(Debug, Clone, Copy)]
pub struct FixedOffsetLocator {
    pages: u32,
}

impl FixedOffsetLocator {
    /// Create a locator for a bibliography of `pages` pages.
    pub fn new(pages: u32) -> Self {
        Self { pages }
    }
}

impl BoundaryLocator for FixedOffsetLocator {
    fn name(&self) -> &str {
        "fixed-offset"
    }

    fn locate(&self, source: &dyn PageSource, lower_bound: u32) -> Result<Option<BibliographyWindow>> {
        let total = source.page_count();
        if self.pages == 0 || self.pages > total {
            return Ok(None);
        }
        let start = total - self.pages + 1;
        if start < lower_bound {
            log::warn!(
                "Fixed bibliography length {} reaches into the last chapter (page {} < {})",
                self.pages,
                start,
                lower_bound
            );
            return Ok(None);
        }
        Ok(Some(BibliographyWindow::to_end(start, total)))
    }
}

/// Which locator the finder uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryStrategy {
    /// Content signature scan (default).
    #[default]
    Signature,
    /// Signature scan around the TOC's bibliography entry, falling back to
    /// a full scan when the TOC has none.
    TocHint,
    /// The last N pages.
    FixedOffset(u32),
}

impl std::str::FromStr for BoundaryStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "signature" => Ok(BoundaryStrategy::Signature),
            "toc-hint" | "toc" => Ok(BoundaryStrategy::TocHint),
            other => other
                .strip_prefix("last:")
                .and_then(|n| n.parse().ok())
                .map(BoundaryStrategy::FixedOffset)
                .ok_or_else(|| {
                    Error::Other(format!(
                        "unknown boundary strategy '{}' (expected signature, toc-hint or last:N)",
                        other
                    ))
                }),
        }
    }
}

/// Locates the bibliography window for a partition.
pub struct BibliographyBoundaryFinder {
    strategy: BoundaryStrategy,
    signature: Signature,
    custom: Option<Box<dyn BoundaryLocator>>,
}

impl Default for BibliographyBoundaryFinder {
    fn default() -> Self {
        Self::new(BoundaryStrategy::default(), Signature::default())
    }
}

impl BibliographyBoundaryFinder {
    /// Create a finder for a built-in strategy.
    pub fn new(strategy: BoundaryStrategy, signature: Signature) -> Self {
        Self {
            strategy,
            signature,
            custom: None,
        }
    }

    /// Use a caller-supplied locator instead of the built-in strategies.
    pub fn with_locator(locator: Box<dyn BoundaryLocator>) -> Self {
        Self {
            strategy: BoundaryStrategy::default(),
            signature: Signature::default(),
            custom: Some(locator),
        }
    }

    fn locator_for(&self, partition: &Partition) -> Box<dyn BoundaryLocator> {
        match (self.strategy, partition.toc_hint()) {
            (BoundaryStrategy::FixedOffset(pages), _) => Box::new(FixedOffsetLocator::new(pages)),
            (BoundaryStrategy::TocHint, Some(hint)) => {
                Box::new(TocHintLocator::new(hint, self.signature.clone()))
            }
            _ => Box::new(SignatureLocator::new(self.signature.clone())),
        }
    }

    /// Find the bibliography window of `partition`.
    ///
    /// Scanning starts one page past the last chapter's anchor. Returns
    /// `BibliographyNotFound` (recoverable) when the locator finds nothing.
    pub fn find(&self, source: &dyn PageSource, partition: &Partition) -> Result<BibliographyWindow> {
        let lower_bound = partition.lower_bound();
        let total_pages = partition.total_pages();
        if source.page_count() != total_pages {
            return Err(Error::Other(format!(
                "page source has {} pages but the partition covers {}",
                source.page_count(),
                total_pages
            )));
        }

        let built;
        let locator: &dyn BoundaryLocator = match &self.custom {
            Some(custom) => custom.as_ref(),
            None => {
                built = self.locator_for(partition);
                built.as_ref()
            }
        };

        log::debug!(
            "Locating bibliography with '{}' from page {}",
            locator.name(),
            lower_bound
        );
        if lower_bound > total_pages {
            return Err(Error::BibliographyNotFound {
                lower_bound,
                total_pages,
            });
        }

        match locator.locate(source, lower_bound)? {
            Some(window) if window.start_page >= lower_bound && window.end_page == total_pages => {
                Ok(window)
            }
            Some(window) => Err(Error::UnresolvableRange {
                title: "Bibliography".to_string(),
                start: window.start_page,
                end: window.end_page,
            }),
            None => Err(Error::BibliographyNotFound {
                lower_bound,
                total_pages,
            }),
        }
    }
}
