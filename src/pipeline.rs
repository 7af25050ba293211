//! Staged build: master document and TOC in, PDF slices and site out.
//!
//! Each stage finishes before the next starts because everything after range
//! resolution reads the finished partition.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::bibliography::{BibliographyBoundaryFinder, Signature};
use crate::error::{Error, Result};
use crate::manifest::Manifest;
use crate::naming::{relative_dir, MANIFEST_FILE};
use crate::options::BuildOptions;
use crate::partition::{PartitionReport, PdfPartitioner};
use crate::range::{PageRangeResolver, Partition};
use crate::site::NavigationAssembler;
use crate::source::{FragmentSet, LopdfBackend};
use crate::toc::{parse_json_toc, parse_latex_toc, read_outline, AnchorResolver, RawTocEntry, TocModel};
use crate::verify::{StrictVerifier, VerificationReport};

/// Where the table of contents comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocSource {
    /// A LaTeX `.toc` file.
    Latex(PathBuf),
    /// A JSON entry list.
    Json(PathBuf),
    /// The master document's own outline.
    Outline,
}

impl TocSource {
    /// Pick the format from the file extension (`.json` or LaTeX).
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            TocSource::Json(path)
        } else {
            TocSource::Latex(path)
        }
    }

    fn read(&self, backend: &LopdfBackend, resolver: &AnchorResolver) -> Result<Vec<RawTocEntry>> {
        match self {
            TocSource::Latex(path) => parse_latex_toc(&std::fs::read_to_string(path)?),
            TocSource::Json(path) => parse_json_toc(&std::fs::read_to_string(path)?),
            TocSource::Outline => read_outline(backend, resolver.destinations()),
        }
    }
}

/// Inputs of one build.
#[derive(Debug, Clone)]
pub struct BuildInputs {
    /// Compiled master PDF.
    pub master: PathBuf,
    /// Table of contents.
    pub toc: TocSource,
    /// Directory of per-page HTML fragments.
    pub fragments_dir: PathBuf,
}

impl BuildInputs {
    /// Create inputs.
    pub fn new(master: impl Into<PathBuf>, toc: TocSource, fragments_dir: impl Into<PathBuf>) -> Self {
        Self {
            master: master.into(),
            toc,
            fragments_dir: fragments_dir.into(),
        }
    }
}

/// Build stages, reported in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadMaster,
    ReadToc,
    ResolveRanges,
    FindBibliography,
    LoadFragments,
    Partition,
    Assemble,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Stage::LoadMaster => "Loading master document...",
            Stage::ReadToc => "Reading table of contents...",
            Stage::ResolveRanges => "Resolving page ranges...",
            Stage::FindBibliography => "Locating bibliography...",
            Stage::LoadFragments => "Loading HTML fragments...",
            Stage::Partition => "Writing PDF slices...",
            Stage::Assemble => "Assembling site...",
            Stage::Verify => "Verifying output...",
        };
        f.write_str(msg)
    }
}

/// Resolved ranges before anything is written.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Final partition, bibliography carved out when found.
    pub partition: Partition,
    /// Recoverable conditions met while planning.
    pub warnings: Vec<String>,
}

/// Outcome of a build.
#[derive(Debug)]
pub struct RunSummary {
    /// Manifest written next to the site.
    pub manifest: Manifest,
    /// Location of the manifest.
    pub manifest_path: PathBuf,
    /// PDF slices written and failed.
    pub partition: PartitionReport,
    /// HTML files written.
    pub pages: Vec<PathBuf>,
    /// Verifier result, when verification ran.
    pub verification: Option<VerificationReport>,
    /// Recoverable conditions met during the run.
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Check if the build produced everything and passed verification.
    pub fn is_success(&self) -> bool {
        self.partition.is_complete()
            && self.verification.as_ref().map_or(true, |r| r.passed())
    }

    /// Turn a failed summary into an error.
    pub fn check(&self) -> Result<()> {
        if !self.partition.is_complete() {
            return Err(Error::Other(format!(
                "{} PDF slice(s) could not be written",
                self.partition.failures.len()
            )));
        }
        match &self.verification {
            Some(report) if !report.passed() => Err(Error::Verification(report.violations.len())),
            _ => Ok(()),
        }
    }
}

/// Runs the build stages with one set of options.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    options: BuildOptions,
}

impl Pipeline {
    /// Create a pipeline.
    pub fn new(options: BuildOptions) -> Self {
        Self { options }
    }

    /// Options in use.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Resolve the partition without writing anything.
    pub fn plan(&self, backend: &LopdfBackend, toc: &TocSource) -> Result<Plan> {
        self.plan_with(backend, toc, &mut |_| {})
    }

    fn plan_with(
        &self,
        backend: &LopdfBackend,
        toc: &TocSource,
        progress: &mut dyn FnMut(Stage),
    ) -> Result<Plan> {
        let opts = &self.options;
        let mut warnings = Vec::new();

        progress(Stage::ReadToc);
        let anchors = AnchorResolver::from_backend(backend).with_offset(opts.page_offset);
        let raw = toc.read(backend, &anchors)?;
        let model = TocModel::resolve(raw, &anchors)?;
        log::info!(
            "Read {} TOC entries for {} pages",
            model.len(),
            model.total_pages()
        );

        progress(Stage::ResolveRanges);
        let mut resolver =
            PageRangeResolver::new().with_heading_words(opts.signature.heading_words.clone());
        if let Some(level) = opts.top_level {
            resolver = resolver.with_top_level(level);
        }
        let mut partition = resolver.resolve(&model)?;

        progress(Stage::FindBibliography);
        let finder = BibliographyBoundaryFinder::new(opts.strategy, Signature::new(&opts.signature)?);
        match finder.find(backend, &partition) {
            Ok(window) => partition.carve_bibliography(window)?,
            Err(err @ Error::BibliographyNotFound { .. }) if !opts.require_bibliography => {
                log::warn!("{}; the last chapter keeps its trailing pages", err);
                warnings.push(err.to_string());
            }
            Err(err) => return Err(err),
        }

        Ok(Plan {
            partition,
            warnings,
        })
    }

    /// Run every stage.
    pub fn run(&self, inputs: &BuildInputs) -> Result<RunSummary> {
        self.run_with(inputs, |_| {})
    }

    /// Run every stage, reporting each one before it starts.
    pub fn run_with<F>(&self, inputs: &BuildInputs, mut progress: F) -> Result<RunSummary>
    where
        F: FnMut(Stage),
    {
        let opts = &self.options;

        progress(Stage::LoadMaster);
        let backend = LopdfBackend::load_file(&inputs.master)?;
        let title = book_title(opts.title.as_deref(), &inputs.master);

        let Plan {
            partition,
            warnings,
        } = self.plan_with(&backend, &inputs.toc, &mut progress)?;

        progress(Stage::LoadFragments);
        let fragments = FragmentSet::load_dir(&inputs.fragments_dir)?;
        log::info!("Loaded {} HTML fragments", fragments.len());

        std::fs::create_dir_all(&opts.site_dir)?;
        std::fs::create_dir_all(&opts.downloads_dir)?;
        let downloads_href = relative_dir(&opts.site_dir, &opts.downloads_dir)?;

        progress(Stage::Partition);
        let report = PdfPartitioner::new(backend.bytes())
            .with_parallel(opts.parallel)
            .write_all(&partition, &opts.downloads_dir)?;

        progress(Stage::Assemble);
        let site = NavigationAssembler::new(title.clone())
            .with_downloads_href(downloads_href.clone())
            .with_heading_words(opts.signature.heading_words.clone())
            .with_parallel(opts.parallel)
            .assemble(&partition, &fragments)?;
        let pages = site.write(&opts.site_dir)?;

        let manifest = Manifest::new(title, &partition, downloads_href, site.links().to_vec());
        let manifest_path = opts.site_dir.join(MANIFEST_FILE);
        manifest.save(&manifest_path)?;

        let verification = if opts.verify {
            progress(Stage::Verify);
            let verifier =
                StrictVerifier::new().with_heading_words(opts.signature.heading_words.clone());
            Some(verifier.verify(&manifest, &opts.site_dir)?)
        } else {
            None
        };

        Ok(RunSummary {
            manifest,
            manifest_path,
            partition: report,
            pages,
            verification,
            warnings,
        })
    }
}

/// Configured title, else the master file's stem.
fn book_title(configured: Option<&str>, master: &Path) -> String {
    match configured {
        Some(title) if !title.trim().is_empty() => title.trim().to_string(),
        _ => master
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled")
            .to_string(),
    }
}
