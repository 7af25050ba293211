//! Navigation graph between generated pages.

use serde::{Deserialize, Serialize};

use crate::naming::{join_href, ArtifactName, CONTENTS_FILE, INDEX_FILE};
use crate::range::{ChapterRange, Partition};

/// Kind of a navigation link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// Preceding chapter in TOC order.
    Previous,
    /// Following chapter in TOC order.
    Next,
    /// The table of contents page.
    Toc,
    /// The bibliography page.
    Bibliography,
    /// From the landing or contents page to a chapter.
    Chapter,
    /// From a page to its PDF download.
    Download,
}

impl Relation {
    /// Label shown in the top bar.
    pub fn label(self) -> &'static str {
        match self {
            Relation::Previous => "Previous",
            Relation::Next => "Next",
            Relation::Toc => "Contents",
            Relation::Bibliography => "Bibliography",
            Relation::Chapter => "Chapter",
            Relation::Download => "Download PDF",
        }
    }
}

/// A link from one site page to another file.
///
/// `source` is a site file name; `target` is an href relative to the site
/// directory, possibly pointing into the downloads directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavLink {
    /// Site page carrying the link.
    pub source: String,
    /// Relative href.
    pub target: String,
    /// Link kind.
    pub relation: Relation,
}

impl NavLink {
    fn new(source: &str, target: impl Into<String>, relation: Relation) -> Self {
        Self {
            source: source.to_string(),
            target: target.into(),
            relation,
        }
    }
}

/// Build every link of the site from the final partition.
///
/// Chapters form a linear previous/next chain in TOC order; the bibliography
/// stands outside the chain and is reached through `bibliography` links.
pub fn build_links(partition: &Partition, downloads_href: &str) -> Vec<NavLink> {
    let chapters: Vec<&ChapterRange> = partition.chapters().collect();
    let bibliography = partition.bibliography_range().map(ArtifactName::of);
    let mut links = Vec::new();

    for (idx, range) in chapters.iter().enumerate() {
        let name = ArtifactName::of(range);
        let source = name.html_file();

        if idx > 0 {
            let prev = ArtifactName::of(chapters[idx - 1]);
            links.push(NavLink::new(&source, prev.html_file(), Relation::Previous));
        }
        if let Some(next) = chapters.get(idx + 1) {
            links.push(NavLink::new(
                &source,
                ArtifactName::of(next).html_file(),
                Relation::Next,
            ));
        }
        links.push(NavLink::new(&source, CONTENTS_FILE, Relation::Toc));
        if let Some(bib) = &bibliography {
            links.push(NavLink::new(&source, bib.html_file(), Relation::Bibliography));
        }
        links.push(NavLink::new(
            &source,
            join_href(downloads_href, &name.pdf_file()),
            Relation::Download,
        ));
    }

    if let Some(bib) = &bibliography {
        let source = bib.html_file();
        links.push(NavLink::new(&source, CONTENTS_FILE, Relation::Toc));
        links.push(NavLink::new(
            &source,
            join_href(downloads_href, &bib.pdf_file()),
            Relation::Download,
        ));
    }

    for hub in [INDEX_FILE, CONTENTS_FILE] {
        if hub == INDEX_FILE {
            links.push(NavLink::new(hub, CONTENTS_FILE, Relation::Toc));
        }
        for range in &chapters {
            links.push(NavLink::new(
                hub,
                ArtifactName::of(range).html_file(),
                Relation::Chapter,
            ));
        }
        if let Some(bib) = &bibliography {
            links.push(NavLink::new(hub, bib.html_file(), Relation::Bibliography));
        }
    }

    links
}
