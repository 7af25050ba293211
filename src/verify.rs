//! Strict consistency gate over a finished build.
//!
//! Every rule runs; nothing is repaired. Violations are reported in the
//! order the rules are evaluated.

use std::path::{Path, PathBuf};

use lopdf::Document as LopdfDocument;
use serde::{Deserialize, Serialize};

use crate::bibliography::DEFAULT_HEADING_WORDS;
use crate::error::Result;
use crate::manifest::{Manifest, ManifestRange};
use crate::naming::{ArtifactName, CONTENTS_FILE, INDEX_FILE};
use crate::range::{format_pages, Coverage};
use crate::site::{content_region, page_span, BibliographyHeading};

/// Verification rules, identified by stable ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    /// The manifest contradicts itself or the naming contract.
    ManifestInvalid,
    /// A range has no PDF file.
    MissingPdf,
    /// A PDF file is empty or unreadable.
    EmptyPdf,
    /// A PDF file's page count differs from its range.
    PdfPageCount,
    /// A range has no HTML file.
    MissingHtml,
    /// An HTML file has no content.
    EmptyHtml,
    /// `index.html` or `contents.html` is missing.
    MissingSitePage,
    /// A navigation link names a file that does not exist.
    DanglingLink,
    /// The bibliography PDF, HTML page and window disagree.
    BibliographySpanMismatch,
    /// A chapter page still contains the bibliography heading.
    BibliographyLeak,
    /// A page is claimed by more than one range.
    PageOverlap,
    /// A page is claimed by no range.
    PageUnclaimed,
}

impl Rule {
    /// Stable identifier.
    pub fn id(self) -> &'static str {
        match self {
            Rule::ManifestInvalid => "manifest-invalid",
            Rule::MissingPdf => "missing-pdf",
            Rule::EmptyPdf => "empty-pdf",
            Rule::PdfPageCount => "pdf-page-count",
            Rule::MissingHtml => "missing-html",
            Rule::EmptyHtml => "empty-html",
            Rule::MissingSitePage => "missing-site-page",
            Rule::DanglingLink => "dangling-link",
            Rule::BibliographySpanMismatch => "bibliography-span-mismatch",
            Rule::BibliographyLeak => "bibliography-leak",
            Rule::PageOverlap => "page-overlap",
            Rule::PageUnclaimed => "page-unclaimed",
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// One failed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule that failed.
    pub rule: Rule,
    /// What was found.
    pub detail: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.rule, self.detail)
    }
}

/// Outcome of a verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Violations in evaluation order.
    pub violations: Vec<Violation>,
}

impl VerificationReport {
    /// Check if there are no violations.
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations of one rule.
    pub fn of_rule(&self, rule: Rule) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.rule == rule)
    }

    fn push(&mut self, rule: Rule, detail: impl Into<String>) {
        self.violations.push(Violation {
            rule,
            detail: detail.into(),
        });
    }
}

/// Read-only checks over a site directory and its downloads.
#[derive(Debug, Clone)]
pub struct StrictVerifier {
    heading_words: Vec<String>,
}

impl Default for StrictVerifier {
    fn default() -> Self {
        Self {
            heading_words: DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl StrictVerifier {
    /// Create a verifier with default heading words.
    pub fn new() -> Self {
        Self::default()
    }

    /// Heading words used by the leak check.
    pub fn with_heading_words(mut self, words: Vec<String>) -> Self {
        self.heading_words = words;
        self
    }

    /// Verify the build described by `manifest`, whose pages live in
    /// `site_dir`.
    ///
    /// Only configuration errors are returned as `Err`; every finding about
    /// the output is a violation in the report.
    pub fn verify(&self, manifest: &Manifest, site_dir: &Path) -> Result<VerificationReport> {
        let heading = BibliographyHeading::new(&self.heading_words)?;
        let downloads_dir = site_dir.join(&manifest.downloads_href);
        let mut report = VerificationReport::default();

        self.check_manifest(manifest, &mut report);

        let mut pdf_pages = Vec::with_capacity(manifest.ranges.len());
        for entry in &manifest.ranges {
            pdf_pages.push(check_pdf(entry, &downloads_dir, &mut report));
            check_html(entry, site_dir, &mut report);
        }

        for hub in [INDEX_FILE, CONTENTS_FILE] {
            if !site_dir.join(hub).is_file() {
                report.push(Rule::MissingSitePage, format!("{} not found", hub));
            }
        }

        for link in &manifest.links {
            let target = link.target.split('#').next().unwrap_or_default();
            if target.is_empty() || !site_dir.join(target).is_file() {
                report.push(
                    Rule::DanglingLink,
                    format!(
                        "{} -> {} ({:?}) does not resolve",
                        link.source, link.target, link.relation
                    ),
                );
            }
        }

        self.check_bibliography_span(manifest, site_dir, &pdf_pages, &mut report);
        self.check_leaks(manifest, site_dir, &heading, &mut report);

        let ranges: Vec<_> = manifest.ranges.iter().map(|r| r.range.clone()).collect();
        let coverage = Coverage::of(&ranges, manifest.total_pages);
        if !coverage.overlapping.is_empty() {
            report.push(
                Rule::PageOverlap,
                format!(
                    "pages {} are claimed by more than one range",
                    format_pages(&coverage.overlapping)
                ),
            );
        }
        if !coverage.unclaimed.is_empty() {
            report.push(
                Rule::PageUnclaimed,
                format!(
                    "pages {} are claimed by no range",
                    format_pages(&coverage.unclaimed)
                ),
            );
        }

        if report.passed() {
            log::info!("Verification passed ({} ranges)", manifest.ranges.len());
        } else {
            log::warn!(
                "Verification found {} violation(s)",
                report.violations.len()
            );
        }
        Ok(report)
    }

    fn check_manifest(&self, manifest: &Manifest, report: &mut VerificationReport) {
        if manifest.total_pages == 0 {
            report.push(Rule::ManifestInvalid, "document has no pages");
        }
        if manifest.chapters().next().is_none() {
            report.push(Rule::ManifestInvalid, "no chapter ranges");
        }
        for entry in &manifest.ranges {
            let range = &entry.range;
            if range.start_page == 0 || range.end_page < range.start_page {
                report.push(
                    Rule::ManifestInvalid,
                    format!(
                        "\"{}\" has an invalid span {}-{}",
                        range.title, range.start_page, range.end_page
                    ),
                );
            }
            let name = ArtifactName::of(range);
            if entry.pdf != name.pdf_file() || entry.html != name.html_file() {
                report.push(
                    Rule::ManifestInvalid,
                    format!(
                        "\"{}\" is recorded as {} / {}, expected {} / {}",
                        range.title,
                        entry.pdf,
                        entry.html,
                        name.pdf_file(),
                        name.html_file()
                    ),
                );
            }
        }
        if manifest.bibliography.is_some() != manifest.bibliography_range().is_some() {
            report.push(
                Rule::ManifestInvalid,
                "bibliography window and bibliography range do not agree on existence",
            );
        }
    }

    fn check_bibliography_span(
        &self,
        manifest: &Manifest,
        site_dir: &Path,
        pdf_pages: &[Option<u32>],
        report: &mut VerificationReport,
    ) {
        let Some(window) = manifest.bibliography else {
            return;
        };
        let Some((idx, entry)) = manifest
            .ranges
            .iter()
            .enumerate()
            .find(|(_, r)| r.range.is_bibliography())
        else {
            return;
        };

        if (entry.range.start_page, entry.range.end_page) != (window.start_page, window.end_page) {
            report.push(
                Rule::BibliographySpanMismatch,
                format!(
                    "range covers {}-{} but the window is {}",
                    entry.range.start_page, entry.range.end_page, window
                ),
            );
        }
        if let Some(Some(pages)) = pdf_pages.get(idx) {
            if *pages != window.page_count() {
                report.push(
                    Rule::BibliographySpanMismatch,
                    format!(
                        "{} has {} pages but the window {} has {}",
                        entry.pdf,
                        pages,
                        window,
                        window.page_count()
                    ),
                );
            }
        }
        if let Ok(html) = std::fs::read_to_string(site_dir.join(&entry.html)) {
            match page_span(&html) {
                Some(span) if span == (window.start_page, window.end_page) => {}
                Some((first, last)) => report.push(
                    Rule::BibliographySpanMismatch,
                    format!(
                        "{} describes pages {}-{} but the window is {}",
                        entry.html, first, last, window
                    ),
                ),
                None => report.push(
                    Rule::BibliographySpanMismatch,
                    format!("{} does not record its page span", entry.html),
                ),
            }
        }
    }

    fn check_leaks(
        &self,
        manifest: &Manifest,
        site_dir: &Path,
        heading: &BibliographyHeading,
        report: &mut VerificationReport,
    ) {
        if manifest.bibliography.is_none() {
            return;
        }
        for entry in manifest.chapters() {
            let Ok(html) = std::fs::read_to_string(site_dir.join(&entry.html)) else {
                continue;
            };
            if content_region(&html).is_some_and(|content| heading.is_match(content)) {
                report.push(
                    Rule::BibliographyLeak,
                    format!(
                        "{} (pages {}-{}) contains a bibliography heading",
                        entry.html, entry.range.start_page, entry.range.end_page
                    ),
                );
            }
        }
    }
}

/// Check one PDF artifact; returns its page count when readable.
fn check_pdf(entry: &ManifestRange, downloads_dir: &Path, report: &mut VerificationReport) -> Option<u32> {
    let path: PathBuf = downloads_dir.join(&entry.pdf);
    let range = &entry.range;

    let size = match std::fs::metadata(&path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => {
            report.push(
                Rule::MissingPdf,
                format!(
                    "\"{}\" (pages {}-{}): {} not found",
                    range.title,
                    range.start_page,
                    range.end_page,
                    path.display()
                ),
            );
            return None;
        }
    };
    if size == 0 {
        report.push(Rule::EmptyPdf, format!("{} is empty", path.display()));
        return None;
    }

    let pages = match LopdfDocument::load(&path) {
        Ok(doc) => doc.get_pages().len() as u32,
        Err(e) => {
            report.push(
                Rule::EmptyPdf,
                format!("{} cannot be read: {}", path.display(), e),
            );
            return None;
        }
    };
    if pages == 0 {
        report.push(Rule::EmptyPdf, format!("{} has no pages", path.display()));
    } else if range.end_page >= range.start_page && pages != range.page_count() {
        report.push(
            Rule::PdfPageCount,
            format!(
                "{} has {} pages, range {}-{} has {}",
                entry.pdf,
                pages,
                range.start_page,
                range.end_page,
                range.page_count()
            ),
        );
    }
    Some(pages)
}

fn check_html(entry: &ManifestRange, site_dir: &Path, report: &mut VerificationReport) {
    let path = site_dir.join(&entry.html);
    let range = &entry.range;
    let html = match std::fs::read_to_string(&path) {
        Ok(html) => html,
        Err(_) => {
            report.push(
                Rule::MissingHtml,
                format!(
                    "\"{}\" (pages {}-{}): {} not found",
                    range.title,
                    range.start_page,
                    range.end_page,
                    path.display()
                ),
            );
            return;
        }
    };
    if content_region(&html).map_or(true, |c| c.trim().is_empty()) {
        report.push(
            Rule::EmptyHtml,
            format!("{} has no content (pages {}-{})", entry.html, range.start_page, range.end_page),
        );
    }
}
