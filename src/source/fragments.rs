//! Per-page HTML fragments produced by the markup-conversion toolchain.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn fragment_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^page[-_]?0*(\d+)\.html?$").unwrap())
}

/// HTML fragments keyed by physical page number.
#[derive(Debug, Clone, Default)]
pub struct FragmentSet {
    pages: BTreeMap<u32, String>,
}

impl FragmentSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `page-N.html` file from a directory.
    ///
    /// Unrelated files are ignored. Two files naming the same page are an
    /// assembly error since neither can be preferred.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        entries.sort();

        let mut set = Self::new();
        for path in entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(page) = page_number_from_name(name) else {
                log::debug!("Ignoring non-fragment file {}", path.display());
                continue;
            };
            let html = std::fs::read_to_string(&path)?;
            set.try_insert(page, html)?;
        }

        log::info!(
            "Loaded {} HTML fragments from {}",
            set.len(),
            dir.display()
        );
        Ok(set)
    }

    /// Add a fragment, failing if the page already has one.
    pub fn try_insert(&mut self, page: u32, html: impl Into<String>) -> Result<()> {
        if page == 0 {
            return Err(Error::Assembly {
                page,
                detail: "fragment addresses page 0; pages are 1-based".to_string(),
            });
        }
        if self.pages.contains_key(&page) {
            return Err(Error::Assembly {
                page,
                detail: "more than one fragment for this page".to_string(),
            });
        }
        self.pages.insert(page, html.into());
        Ok(())
    }

    /// Builder-style insert for in-memory construction.
    pub fn with_page(mut self, page: u32, html: impl Into<String>) -> Self {
        self.pages.insert(page, html.into());
        self
    }

    /// Fragment of one page.
    pub fn get(&self, page: u32) -> Option<&str> {
        self.pages.get(&page).map(String::as_str)
    }

    /// Iterate fragments in physical-page order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.pages.iter().map(|(page, html)| (*page, html.as_str()))
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Check if there are no fragments.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Physical page number encoded in a fragment file name.
pub fn page_number_from_name(name: &str) -> Option<u32> {
    fragment_name_regex()
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}
