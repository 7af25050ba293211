//! HTML site assembly.
//!
//! Per-page fragments are grouped by the same [`Partition`] the PDF slices
//! come from, so a chapter page and its download always cover the same
//! physical pages. Where the bibliography starts mid-page, the fragment is
//! split at the bibliography heading rather than moved whole.

mod html;
mod nav;
mod shell;

pub use html::{
    content_region, escape_html, local_headings, page_span, BibliographyHeading, LocalHeading,
    CONTENT_END, CONTENT_START,
};
pub use nav::{build_links, NavLink, Relation};

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::bibliography::DEFAULT_HEADING_WORDS;
use crate::error::{Error, Result};
use crate::naming::{ArtifactName, CONTENTS_FILE, INDEX_FILE};
use crate::range::{ChapterRange, Partition};
use crate::source::FragmentSet;
use shell::{contents_body, index_body, render_page, wrap_fragment, PageView, SidebarEntry};

/// One generated HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePage {
    /// File name inside the site directory.
    pub file_name: String,
    /// Page title.
    pub title: String,
    /// Complete document.
    pub html: String,
    /// Physical pages covered, for range pages.
    pub span: Option<(u32, u32)>,
}

/// The assembled site, not yet written.
#[derive(Debug, Clone, Default)]
pub struct Site {
    pages: Vec<SitePage>,
    links: Vec<NavLink>,
}

impl Site {
    /// Pages: landing, contents, then one per range in page order.
    pub fn pages(&self) -> &[SitePage] {
        &self.pages
    }

    /// Every navigation link.
    pub fn links(&self) -> &[NavLink] {
        &self.links
    }

    /// Page by file name.
    pub fn page(&self, file_name: &str) -> Option<&SitePage> {
        self.pages.iter().find(|p| p.file_name == file_name)
    }

    /// Write every page into `dir`.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let path = dir.join(&page.file_name);
            std::fs::write(&path, &page.html)?;
            written.push(path);
        }
        log::info!("Wrote {} HTML pages to {}", written.len(), dir.display());
        Ok(written)
    }
}

/// Builds chapter documents and navigation pages from HTML fragments.
#[derive(Debug, Clone)]
pub struct NavigationAssembler {
    book_title: String,
    downloads_href: String,
    heading_words: Vec<String>,
    parallel: bool,
}

impl NavigationAssembler {
    /// Create an assembler for a book.
    pub fn new(book_title: impl Into<String>) -> Self {
        Self {
            book_title: book_title.into(),
            downloads_href: String::new(),
            heading_words: DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect(),
            parallel: true,
        }
    }

    /// Href of the downloads directory relative to the site directory.
    pub fn with_downloads_href(mut self, href: impl Into<String>) -> Self {
        self.downloads_href = href.into();
        self
    }

    /// Heading words that open the bibliography.
    pub fn with_heading_words(mut self, words: Vec<String>) -> Self {
        self.heading_words = words;
        self
    }

    /// Enable or disable parallel rendering.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Assemble the site.
    ///
    /// Fails with `AssemblyError` when a fragment addresses a page that no
    /// range owns; the partition covers every page, so that means the
    /// fragments and the master document disagree.
    pub fn assemble(&self, partition: &Partition, fragments: &FragmentSet) -> Result<Site> {
        let heading = BibliographyHeading::new(&self.heading_words)?;
        let ranges = partition.ranges();
        let bibliography_start = partition.bibliography().map(|w| w.start_page);
        let mut bodies = vec![String::new(); ranges.len()];

        for (page, fragment) in fragments.iter() {
            let idx = owner_index(partition, page)?;

            match bibliography_start {
                // Last chapter page: bibliography may begin below its text.
                Some(start) if page + 1 == start => match heading.split(fragment)? {
                    Some((head, tail)) => {
                        if let Some(head) = head {
                            bodies[idx].push_str(&wrap_fragment(page, &head));
                        }
                        log::debug!("Page {}: bibliography heading moved out of chapter", page);
                        bodies[idx + 1].push_str(&wrap_fragment(page, &tail));
                    }
                    None => bodies[idx].push_str(&wrap_fragment(page, fragment)),
                },
                // First bibliography page: chapter text may precede the heading.
                Some(start) if page == start && idx > 0 => match heading.split(fragment)? {
                    Some((Some(head), tail)) => {
                        log::debug!("Page {}: text above bibliography kept in chapter", page);
                        bodies[idx - 1].push_str(&wrap_fragment(page, &head));
                        bodies[idx].push_str(&wrap_fragment(page, &tail));
                    }
                    _ => bodies[idx].push_str(&wrap_fragment(page, fragment)),
                },
                _ => bodies[idx].push_str(&wrap_fragment(page, fragment)),
            }
        }

        for (range, body) in ranges.iter().zip(&bodies) {
            if body.is_empty() {
                log::warn!(
                    "No HTML fragments for \"{}\" (pages {}-{})",
                    range.title,
                    range.start_page,
                    range.end_page
                );
            }
        }

        let headings: Vec<Vec<LocalHeading>> = bodies.iter().map(|b| local_headings(b)).collect();
        let links = build_links(partition, &self.downloads_href);
        let sidebar: Vec<SidebarEntry> = ranges.iter().map(SidebarEntry::of).collect();

        let render = |(idx, range): (usize, &ChapterRange)| -> SitePage {
            let file_name = ArtifactName::of(range).html_file();
            let html = render_page(&PageView {
                book_title: &self.book_title,
                file: &file_name,
                title: &range.title,
                span: Some((range.start_page, range.end_page)),
                sidebar: &sidebar,
                links: &links,
                local_toc: &headings[idx],
                body: &bodies[idx],
            });
            SitePage {
                file_name,
                title: range.title.clone(),
                html,
                span: Some((range.start_page, range.end_page)),
            }
        };
        let range_pages: Vec<SitePage> = if self.parallel {
            ranges.par_iter().enumerate().map(render).collect()
        } else {
            ranges.iter().enumerate().map(render).collect()
        };

        let contents_entries: Vec<(&ChapterRange, Vec<LocalHeading>)> =
            ranges.iter().zip(headings.iter().cloned()).collect();
        let range_refs: Vec<&ChapterRange> = ranges.iter().collect();

        let mut pages = Vec::with_capacity(range_pages.len() + 2);
        pages.push(self.hub_page(
            INDEX_FILE,
            &self.book_title,
            &index_body(partition.total_pages(), &range_refs, &links),
            &sidebar,
            &links,
        ));
        pages.push(self.hub_page(
            CONTENTS_FILE,
            "Contents",
            &contents_body(&contents_entries),
            &sidebar,
            &links,
        ));
        pages.extend(range_pages);

        log::info!(
            "Assembled {} HTML pages from {} fragments",
            pages.len(),
            fragments.len()
        );
        Ok(Site { pages, links })
    }

    fn hub_page(
        &self,
        file_name: &str,
        title: &str,
        body: &str,
        sidebar: &[SidebarEntry],
        links: &[NavLink],
    ) -> SitePage {
        let html = render_page(&PageView {
            book_title: &self.book_title,
            file: file_name,
            title,
            span: None,
            sidebar,
            links,
            local_toc: &[],
            body,
        });
        SitePage {
            file_name: file_name.to_string(),
            title: title.to_string(),
            html,
            span: None,
        }
    }
}

fn owner_index(partition: &Partition, page: u32) -> Result<usize> {
    if page > partition.total_pages() {
        return Err(Error::Assembly {
            page,
            detail: format!(
                "fragment addresses a page past the end of the document ({} pages)",
                partition.total_pages()
            ),
        });
    }
    let owner = partition.owner_of(page).ok_or_else(|| Error::Assembly {
        page,
        detail: "no range owns this page".to_string(),
    })?;
    partition
        .ranges()
        .iter()
        .position(|r| std::ptr::eq(r, owner))
        .ok_or_else(|| Error::Assembly {
            page,
            detail: "owning range is not part of the partition".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::{BibliographyWindow, PageRangeResolver};
    use crate::toc::{AnchorResolver, RawTocEntry, TocModel};

    fn partition(bibliography_at: Option<u32>) -> Partition {
        let raw = vec![
            RawTocEntry::physical("Intro", 1, 1),
            RawTocEntry::physical("Waves & Rays", 1, 3),
        ];
        let toc = TocModel::resolve(raw, &AnchorResolver::new(6)).unwrap();
        let mut partition = PageRangeResolver::new().resolve(&toc).unwrap();
        if let Some(start) = bibliography_at {
            partition
                .carve_bibliography(BibliographyWindow::to_end(start, 6))
                .unwrap();
        }
        partition
    }

    fn fragments() -> FragmentSet {
        FragmentSet::new()
            .with_page(1, "<p>one</p>")
            .with_page(2, "<h2 id=\"s1\">Start</h2><p>two</p>")
            .with_page(3, "<p>three</p>")
            .with_page(4, "<p>four</p>")
            .with_page(5, "<p>end of text</p><h1>Bibliography</h1><p>[1] A.</p>")
            .with_page(6, "<p>[2] B.</p>")
    }

    fn content<'a>(site: &'a Site, file: &str) -> &'a str {
        content_region(&site.page(file).unwrap().html).unwrap()
    }

    #[test]
    fn test_groups_fragments_by_range() {
        let site = NavigationAssembler::new("Optics")
            .assemble(&partition(None), &fragments())
            .unwrap();
        let names: Vec<&str> = site.pages().iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["index.html", "contents.html", "01-intro.html", "02-waves-rays.html"]
        );
        let intro = content(&site, "01-intro.html");
        assert!(intro.contains("one") && intro.contains("two"));
        assert!(!intro.contains("three"));
        assert!(site.page("01-intro.html").unwrap().html.contains("href=\"#s1\""));
    }

    #[test]
    fn test_mid_page_bibliography_is_split() {
        let site = NavigationAssembler::new("Optics")
            .assemble(&partition(Some(5)), &fragments())
            .unwrap();
        let chapter = content(&site, "02-waves-rays.html");
        let bibliography = content(&site, "bibliography.html");

        assert!(chapter.contains("end of text"));
        assert!(!chapter.contains("Bibliography"));
        assert!(bibliography.starts_with("\n<div class=\"pdf-page\" id=\"page-5\""));
        assert!(bibliography.contains("<h1>Bibliography</h1>"));
        assert!(bibliography.contains("[2] B."));
        assert_eq!(site.page("bibliography.html").unwrap().span, Some((5, 6)));
    }

    #[test]
    fn test_wrapped_bibliography_heading_keeps_pages_well_formed() {
        let frags = FragmentSet::new()
            .with_page(4, "<p>four</p>")
            .with_page(
                5,
                "<section class=\"page\"><p>end of text</p><h1>Bibliography</h1><p>[1] A.</p></section>",
            )
            .with_page(6, "<p>[2] B.</p>");
        let site = NavigationAssembler::new("Optics")
            .assemble(&partition(Some(5)), &frags)
            .unwrap();

        for file in ["02-waves-rays.html", "bibliography.html"] {
            let page = &site.page(file).unwrap().html;
            assert_eq!(
                page.matches("<section").count(),
                page.matches("</section>").count(),
                "{}",
                file
            );
        }
        let chapter = content(&site, "02-waves-rays.html");
        assert!(chapter.contains("<section class=\"page\"><p>end of text</p></section>"));
        let bibliography = content(&site, "bibliography.html");
        assert!(bibliography.contains("<section class=\"page\"><h1>Bibliography</h1>"));
    }

    #[test]
    fn test_heading_on_page_before_window_is_moved() {
        let frags = FragmentSet::new()
            .with_page(3, "<p>three</p>")
            .with_page(4, "<p>last words</p><h2>References</h2><p>[1] A.</p>")
            .with_page(5, "<p>[2] B.</p>");
        let site = NavigationAssembler::new("Optics")
            .assemble(&partition(Some(5)), &frags)
            .unwrap();
        let chapter = content(&site, "02-waves-rays.html");
        assert!(chapter.contains("last words"));
        assert!(!chapter.contains("References"));
        let bibliography = content(&site, "bibliography.html");
        assert!(bibliography.find("References").unwrap() < bibliography.find("[2] B.").unwrap());
    }

    #[test]
    fn test_fragment_past_end_is_assembly_error() {
        let frags = FragmentSet::new().with_page(7, "<p>?</p>");
        let err = NavigationAssembler::new("Optics")
            .assemble(&partition(None), &frags)
            .unwrap_err();
        assert!(matches!(err, Error::Assembly { page: 7, .. }));
    }

    #[test]
    fn test_titles_escaped_and_links_present() {
        let site = NavigationAssembler::new("Optics")
            .with_downloads_href("../downloads")
            .assemble(&partition(Some(5)), &fragments())
            .unwrap();
        let page = &site.page("02-waves-rays.html").unwrap().html;
        assert!(page.contains("<h1>Waves &amp; Rays</h1>"));
        assert!(page.contains("href=\"../downloads/02-waves-rays.pdf\""));
        assert!(page.contains("href=\"bibliography.html\""));
        let index = &site.page("index.html").unwrap().html;
        assert!(index.contains("<title>Optics</title>"));
    }

    #[test]
    fn test_sequential_and_parallel_agree() {
        let partition = partition(Some(5));
        let parallel = NavigationAssembler::new("Optics")
            .assemble(&partition, &fragments())
            .unwrap();
        let sequential = NavigationAssembler::new("Optics")
            .with_parallel(false)
            .assemble(&partition, &fragments())
            .unwrap();
        assert_eq!(parallel.pages(), sequential.pages());
    }

    #[test]
    fn test_write_site() {
        let dir = tempfile::tempdir().unwrap();
        let site = NavigationAssembler::new("Optics")
            .assemble(&partition(None), &fragments())
            .unwrap();
        let written = site.write(dir.path()).unwrap();
        assert_eq!(written.len(), 4);
        assert!(dir.path().join("contents.html").exists());
    }
}
