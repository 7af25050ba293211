//! # bookcut
//!
//! Splits a compiled LaTeX book into per-chapter PDFs, a bibliography PDF and
//! a cross-linked HTML site.
//!
//! ## Quick Start
//!
//! ```no_run
//! use bookcut::{BuildInputs, BuildOptions, Pipeline, TocSource};
//!
//! fn main() -> bookcut::Result<()> {
//!     let inputs = BuildInputs::new(
//!         "main.pdf",
//!         TocSource::from_path("main.toc"),
//!         "fragments",
//!     );
//!     let options = BuildOptions::new().with_title("Optics");
//!
//!     let summary = Pipeline::new(options).run(&inputs)?;
//!     summary.check()?;
//!     println!("{} ranges", summary.manifest.ranges.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Stages
//!
//! - **TOC**: LaTeX `.toc`, JSON or the PDF outline, anchors placed on
//!   physical pages through named destinations and page labels
//! - **Ranges**: one contiguous page range per top-level entry
//! - **Bibliography**: a pluggable locator carves the trailing window
//! - **Partition**: one standalone PDF per range, byte-for-byte reproducible
//! - **Site**: chapter pages, a contents page and a landing page
//! - **Verify**: strict read-only checks over the written output

pub mod bibliography;
pub mod detect;
pub mod error;
pub mod manifest;
pub mod naming;
pub mod options;
pub mod partition;
pub mod pipeline;
pub mod range;
pub mod site;
pub mod source;
pub mod toc;
pub mod verify;

// Re-export commonly used types
pub use bibliography::{
    BibliographyBoundaryFinder, BibliographyWindow, BoundaryLocator, BoundaryStrategy,
    SignatureSettings,
};
pub use detect::{parse_header, PdfHeader};
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestRange};
pub use options::BuildOptions;
pub use partition::{PartitionReport, PdfPartitioner, WrittenPdf};
pub use pipeline::{BuildInputs, Pipeline, Plan, RunSummary, Stage, TocSource};
pub use range::{ChapterRange, PageRangeResolver, Partition, RangeKind};
pub use site::{NavLink, NavigationAssembler, Relation, Site, SitePage};
pub use source::{FragmentSet, LopdfBackend, PageSource, TextPages};
pub use toc::{AnchorResolver, RawTocEntry, TocEntry, TocModel};
pub use verify::{Rule, StrictVerifier, VerificationReport, Violation};

use std::path::Path;

/// Run a full build with default options for everything but the output
/// directories.
///
/// # Example
///
/// ```no_run
/// use bookcut::{build, TocSource};
/// use std::path::Path;
///
/// let summary = build("main.pdf", TocSource::Outline, "fragments", Path::new("out")).unwrap();
/// assert!(summary.is_success());
/// ```
pub fn build<P, Q>(master: P, toc: TocSource, fragments_dir: Q, output_root: &Path) -> Result<RunSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let inputs = BuildInputs::new(master.as_ref(), toc, fragments_dir.as_ref());
    Pipeline::new(BuildOptions::new().with_output_root(output_root)).run(&inputs)
}

/// Resolve the ranges of a book without writing anything.
pub fn resolve_ranges<P: AsRef<Path>>(master: P, toc: &TocSource) -> Result<Partition> {
    let backend = LopdfBackend::load_file(master)?;
    Ok(Pipeline::default().plan(&backend, toc)?.partition)
}

/// Re-run the strict verifier over a finished site directory.
///
/// The manifest is read from `site_dir/manifest.json`.
pub fn verify_site<P: AsRef<Path>>(site_dir: P) -> Result<VerificationReport> {
    let site_dir = site_dir.as_ref();
    let manifest = Manifest::load(&site_dir.join(naming::MANIFEST_FILE))?;
    StrictVerifier::new().verify(&manifest, site_dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_ranges_missing_master() {
        let result = resolve_ranges("/nonexistent/book.pdf", &TocSource::Outline);
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_verify_site_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(verify_site(dir.path()), Err(Error::Io(_))));
    }

    #[test]
    fn test_parse_header_rejects_html() {
        let result = parse_header(b"<!DOCTYPE html><html></html>");
        assert!(matches!(result, Err(Error::UnknownFormat)));
    }
}
