//! Build configuration.

use std::path::{Path, PathBuf};

use crate::bibliography::{BoundaryStrategy, SignatureSettings};

/// Default site directory.
pub const DEFAULT_SITE_DIR: &str = "site";

/// Default downloads directory.
pub const DEFAULT_DOWNLOADS_DIR: &str = "downloads";

/// Options for one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory receiving HTML pages and the manifest
    pub site_dir: PathBuf,

    /// Directory receiving PDF slices
    pub downloads_dir: PathBuf,

    /// Book title shown in every page shell (file stem of the master when unset)
    pub title: Option<String>,

    /// Whether to use parallel processing
    pub parallel: bool,

    /// How the bibliography window is located
    pub strategy: BoundaryStrategy,

    /// Bibliography signature parameters
    pub signature: SignatureSettings,

    /// Added to integer printed labels when the document has no label table
    pub page_offset: i64,

    /// TOC level treated as top level (detected when unset)
    pub top_level: Option<u8>,

    /// Fail the build when no bibliography is found
    pub require_bibliography: bool,

    /// Run the strict verifier after writing
    pub verify: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            site_dir: PathBuf::from(DEFAULT_SITE_DIR),
            downloads_dir: PathBuf::from(DEFAULT_DOWNLOADS_DIR),
            title: None,
            parallel: true,
            strategy: BoundaryStrategy::default(),
            signature: SignatureSettings::default(),
            page_offset: 0,
            top_level: None,
            require_bibliography: false,
            verify: true,
        }
    }
}

impl BuildOptions {
    /// Create new build options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the site directory.
    pub fn with_site_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.site_dir = dir.into();
        self
    }

    /// Set the downloads directory.
    pub fn with_downloads_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.downloads_dir = dir.into();
        self
    }

    /// Put both output directories under one root (`site/`, `downloads/`).
    pub fn with_output_root(self, root: &Path) -> Self {
        self.with_site_dir(root.join(DEFAULT_SITE_DIR))
            .with_downloads_dir(root.join(DEFAULT_DOWNLOADS_DIR))
    }

    /// Set the book title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the boundary strategy.
    pub fn with_strategy(mut self, strategy: BoundaryStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the signature parameters.
    pub fn with_signature(mut self, signature: SignatureSettings) -> Self {
        self.signature = signature;
        self
    }

    /// Set the bibliography heading words.
    pub fn with_heading_words(mut self, words: Vec<String>) -> Self {
        self.signature.heading_words = words;
        self
    }

    /// Set the printed-to-physical page offset.
    pub fn with_page_offset(mut self, offset: i64) -> Self {
        self.page_offset = offset;
        self
    }

    /// Force the top TOC level.
    pub fn with_top_level(mut self, level: u8) -> Self {
        self.top_level = Some(level);
        self
    }

    /// Require a bibliography.
    pub fn with_require_bibliography(mut self, require: bool) -> Self {
        self.require_bibliography = require;
        self
    }

    /// Enable or disable verification.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Skip verification.
    pub fn skip_verify(mut self) -> Self {
        self.verify = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let opts = BuildOptions::default();
        assert_eq!(opts.site_dir, PathBuf::from("site"));
        assert!(opts.parallel);
        assert!(opts.verify);
        assert!(!opts.require_bibliography);
        assert_eq!(opts.strategy, BoundaryStrategy::Signature);
    }

    #[test]
    fn test_builder_pattern() {
        let opts = BuildOptions::new()
            .with_output_root(Path::new("/tmp/book"))
            .with_title("Optics")
            .sequential()
            .with_strategy(BoundaryStrategy::FixedOffset(6))
            .with_page_offset(10)
            .with_top_level(0)
            .with_require_bibliography(true)
            .skip_verify();

        assert_eq!(opts.site_dir, PathBuf::from("/tmp/book/site"));
        assert_eq!(opts.downloads_dir, PathBuf::from("/tmp/book/downloads"));
        assert_eq!(opts.title.as_deref(), Some("Optics"));
        assert!(!opts.parallel);
        assert_eq!(opts.strategy, BoundaryStrategy::FixedOffset(6));
        assert_eq!(opts.page_offset, 10);
        assert_eq!(opts.top_level, Some(0));
        assert!(opts.require_bibliography);
        assert!(!opts.verify);
    }
}
