//! Build manifest.
//!
//! Written next to the site pages after every build. It records what the
//! build produced so the strict verifier can re-check an output directory
//! later without the master document.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::naming::ArtifactName;
use crate::range::{BibliographyWindow, ChapterRange, Partition};
use crate::site::NavLink;

/// A range together with the files produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRange {
    /// The range.
    #[serde(flatten)]
    pub range: ChapterRange,
    /// PDF file name inside the downloads directory.
    pub pdf: String,
    /// HTML file name inside the site directory.
    pub html: String,
}

impl ManifestRange {
    /// Entry for a range, naming its files by the shared naming contract.
    pub fn of(range: &ChapterRange) -> Self {
        let name = ArtifactName::of(range);
        Self {
            range: range.clone(),
            pdf: name.pdf_file(),
            html: name.html_file(),
        }
    }
}

/// Everything one build produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Book title.
    pub title: String,
    /// Physical pages of the master document.
    pub total_pages: u32,
    /// Downloads directory relative to the site directory.
    pub downloads_href: String,
    /// Ranges in page order.
    pub ranges: Vec<ManifestRange>,
    /// Bibliography window, when one was found.
    pub bibliography: Option<BibliographyWindow>,
    /// Every navigation link of the site.
    pub links: Vec<NavLink>,
}

impl Manifest {
    /// Describe a build.
    pub fn new(
        title: impl Into<String>,
        partition: &Partition,
        downloads_href: impl Into<String>,
        links: Vec<NavLink>,
    ) -> Self {
        Self {
            title: title.into(),
            total_pages: partition.total_pages(),
            downloads_href: downloads_href.into(),
            ranges: partition.ranges().iter().map(ManifestRange::of).collect(),
            bibliography: partition.bibliography(),
            links,
        }
    }

    /// Read a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Ranges other than the bibliography.
    pub fn chapters(&self) -> impl Iterator<Item = &ManifestRange> {
        self.ranges.iter().filter(|r| !r.range.is_bibliography())
    }

    /// The bibliography entry, if any.
    pub fn bibliography_range(&self) -> Option<&ManifestRange> {
        self.ranges.iter().find(|r| r.range.is_bibliography())
    }
}
