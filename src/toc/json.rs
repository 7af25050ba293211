//! Reader for JSON TOC exports.
//!
//! ```json
//! [
//!   {"title": "Preface", "level": 1, "page": "v", "numbered": false},
//!   {"title": "Introduction", "level": 1, "page": 9, "dest": "chapter.1"}
//! ]
//! ```
//!
//! An integer `page` is already physical; a string is a printed label.

use serde::Deserialize;

use super::{Anchor, RawTocEntry};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct JsonTocEntry {
    title: String,
    level: u8,
    page: JsonPage,
    #[serde(default)]
    dest: Option<String>,
    #[serde(default = "default_numbered")]
    numbered: bool,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JsonPage {
    Physical(u32),
    Label(String),
}

fn default_numbered() -> bool {
    true
}

/// Parse a JSON TOC array.
pub fn parse_json_toc(text: &str) -> Result<Vec<RawTocEntry>> {
    let raw: Vec<JsonTocEntry> = serde_json::from_str(text).map_err(|e| Error::MalformedToc {
        entry: e.line(),
        detail: e.to_string(),
    })?;

    Ok(raw
        .into_iter()
        .map(|entry| RawTocEntry {
            title: entry.title.trim().to_string(),
            level: entry.level,
            anchor: match entry.page {
                JsonPage::Physical(page) => Anchor::Physical(page),
                JsonPage::Label(label) => Anchor::Label(label.trim().to_string()),
            },
            dest: entry.dest.filter(|d| !d.trim().is_empty()),
            numbered: entry.numbered,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_toc() {
        let text = r#"[
            {"title": "Preface", "level": 1, "page": "v", "numbered": false},
            {"title": " Introduction ", "level": 1, "page": 9, "dest": "chapter.1"},
            {"title": "Scope", "level": 2, "page": "2"}
        ]"#;
        let entries = parse_json_toc(text).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].anchor, Anchor::Label("v".into()));
        assert!(!entries[0].numbered);
        assert_eq!(entries[1].title, "Introduction");
        assert_eq!(entries[1].anchor, Anchor::Physical(9));
        assert_eq!(entries[1].dest.as_deref(), Some("chapter.1"));
        assert!(entries[2].numbered);
    }

    #[test]
    fn test_invalid_json_is_malformed_toc() {
        let err = parse_json_toc(r#"[{"title": "X", "level": 1}]"#).unwrap_err();
        assert!(matches!(err, Error::MalformedToc { .. }));
    }
}
