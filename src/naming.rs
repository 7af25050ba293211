//! Output file naming shared by the PDF partitioner and the site assembler.
//!
//! Both sides derive every file name from a [`ChapterRange`] through
//! [`ArtifactName`], so a link emitted by the site always names the file the
//! partitioner wrote.

use std::path::{Component, Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::range::{ChapterRange, RangeKind};

/// Landing page.
pub const INDEX_FILE: &str = "index.html";

/// Table of contents page.
pub const CONTENTS_FILE: &str = "contents.html";

/// Build manifest, written next to the site pages.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Stem of the bibliography artifacts.
pub const BIBLIOGRAPHY_STEM: &str = "bibliography";

/// Slug used when a title has no ASCII alphanumerics at all.
const FALLBACK_SLUG: &str = "section";

/// File stem of one range's artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactName {
    stem: String,
}

impl ArtifactName {
    /// Name for a range: `NN-slug`, or `bibliography`.
    pub fn of(range: &ChapterRange) -> Self {
        let stem = match range.kind {
            RangeKind::Bibliography => BIBLIOGRAPHY_STEM.to_string(),
            _ => format!("{:02}-{}", range.ordinal, slugify(&range.title)),
        };
        Self { stem }
    }

    /// The bare stem.
    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// PDF file name.
    pub fn pdf_file(&self) -> String {
        format!("{}.pdf", self.stem)
    }

    /// HTML file name.
    pub fn html_file(&self) -> String {
        format!("{}.html", self.stem)
    }
}

impl std::fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.stem)
    }
}

/// Lowercase ASCII slug of a title.
///
/// Accents are folded (`Résumé` → `resume`); every other run of
/// non-alphanumerics becomes a single hyphen.
pub fn slugify(text: &str) -> String {
    let slug = text
        .nfkd()
        .filter(|c| c.is_ascii())
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Relative URL path from directory `from` to directory `to`.
///
/// Returns an empty string when both name the same directory. Relative
/// inputs are taken against the current directory only when the other side
/// is absolute.
pub fn relative_dir(from: &Path, to: &Path) -> Result<String> {
    let from = normalized(&absolutize(from)?);
    let to = normalized(&absolutize(to)?);

    let common = from.iter().zip(&to).take_while(|(a, b)| a == b).count();
    let mut parts: Vec<String> = std::iter::repeat("..".to_string())
        .take(from.len() - common)
        .collect();
    parts.extend(to[common..].iter().cloned());
    Ok(parts.join("/"))
}

/// Join a directory href from [`relative_dir`] with a file name.
pub fn join_href(dir: &str, file: &str) -> String {
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), file)
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn normalized(path: &Path) -> Vec<String> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last().map(String::as_str) {
                // The parent of the root is the root.
                Some("/") => {}
                Some(last) if last != ".." => {
                    parts.pop();
                }
                _ => parts.push("..".to_string()),
            },
            Component::RootDir => parts.push("/".to_string()),
            Component::Prefix(prefix) => {
                parts.push(prefix.as_os_str().to_string_lossy().to_string())
            }
            Component::Normal(name) => parts.push(name.to_string_lossy().to_string()),
        }
    }
    parts
}
