//! Content signature of a bibliography's first page.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::error::{Error, Result};

/// Heading words recognized by default.
pub const DEFAULT_HEADING_WORDS: &[&str] = &["Bibliography", "References"];

/// Characters of a page searched for the heading.
pub const DEFAULT_HEADING_WINDOW: usize = 200;

/// `[n]` entry labels that identify a page of references on their own.
pub const DEFAULT_MIN_ENTRY_MARKERS: usize = 4;

/// Tunable parts of the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureSettings {
    /// Heading words, matched case-insensitively as whole words.
    pub heading_words: Vec<String>,
    /// Number of leading characters searched for a heading word.
    pub heading_window: usize,
    /// Line-leading `[n]` markers needed to match without a heading
    /// (0 disables the marker test).
    pub min_entry_markers: usize,
}

impl Default for SignatureSettings {
    fn default() -> Self {
        Self {
            heading_words: DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect(),
            heading_window: DEFAULT_HEADING_WINDOW,
            min_entry_markers: DEFAULT_MIN_ENTRY_MARKERS,
        }
    }
}

/// Compiled page test.
#[derive(Debug, Clone)]
pub struct Signature {
    heading_regex: Regex,
    marker_regex: Regex,
    heading_window: usize,
    min_entry_markers: usize,
}

impl Signature {
    /// Compile the settings into a page test.
    pub fn new(settings: &SignatureSettings) -> Result<Self> {
        let words: Vec<String> = settings
            .heading_words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();
        if words.is_empty() {
            return Err(Error::Other(
                "at least one bibliography heading word is required".to_string(),
            ));
        }

        let heading_regex = Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|")))
            .map_err(|e| Error::Other(format!("invalid heading pattern: {}", e)))?;
        let marker_regex = Regex::new(r"(?m)^\s*\[\d{1,4}\]").unwrap();

        Ok(Self {
            heading_regex,
            marker_regex,
            heading_window: settings.heading_window,
            min_entry_markers: settings.min_entry_markers,
        })
    }

    /// Check if a page's text opens a bibliography.
    pub fn matches(&self, page_text: &str) -> bool {
        let text: String = page_text.nfkc().collect();

        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        let head: String = collapsed.chars().take(self.heading_window).collect();
        if self.heading_regex.is_match(&head) {
            return true;
        }

        self.min_entry_markers > 0
            && self.marker_regex.find_iter(&text).count() >= self.min_entry_markers
    }
}

impl Default for Signature {
    fn default() -> Self {
        // Default words are plain ASCII and always compile.
        Self::new(&SignatureSettings::default()).unwrap()
    }
}

/// Check if a TOC title names the bibliography itself.
pub fn is_bibliography_title(title: &str, heading_words: &[String]) -> bool {
    let normalized: String = title.nfkc().collect();
    let normalized = normalized
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim();
    heading_words
        .iter()
        .any(|word| normalized.eq_ignore_ascii_case(word.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_match() {
        let sig = Signature::default();
        assert!(sig.matches("Bibliography\n[1] A. Author. A Title."));
        assert!(sig.matches("  REFERENCES  \nSmith, J. (2001)"));
        assert!(!sig.matches("Chapter 5\nWave Optics\nLight bends."));
    }

    #[test]
    fn test_heading_outside_window_ignored() {
        let sig = Signature::default();
        let body = "x ".repeat(150);
        let text = format!("{}Bibliography", body);
        assert!(!sig.matches(&text));
    }

    #[test]
    fn test_entry_markers_without_heading() {
        let sig = Signature::default();
        let page = "[12] A.\n[13] B.\n[14] C.\n[15] D.\n";
        assert!(sig.matches(page));
        // Inline citations do not start lines.
        assert!(!sig.matches("as shown in [1], [2], [3] and [4] the effect holds"));
    }

    #[test]
    fn test_ligature_folding() {
        // U+FB01 LATIN SMALL LIGATURE FI
        let sig = Signature::new(&SignatureSettings {
            heading_words: vec!["Works Cited in Fieldwork".into()],
            ..Default::default()
        })
        .unwrap();
        assert!(sig.matches("Works Cited in \u{FB01}eldwork"));
    }

    #[test]
    fn test_empty_heading_words_rejected() {
        let settings = SignatureSettings {
            heading_words: vec!["  ".into()],
            ..Default::default()
        };
        assert!(Signature::new(&settings).is_err());
    }

    #[test]
    fn test_is_bibliography_title() {
        let words: Vec<String> = DEFAULT_HEADING_WORDS.iter().map(|w| w.to_string()).collect();
        assert!(is_bibliography_title("Bibliography", &words));
        assert!(is_bibliography_title(" references: ", &words));
        assert!(!is_bibliography_title("Annotated Bibliography Notes", &words));
    }
}
