//! Reader for LaTeX `.toc` files.
//!
//! Each entry is a `\contentsline` with three or four brace-delimited
//! arguments:
//!
//! ```text
//! \contentsline {chapter}{\numberline {3}Wave Optics}{27}{chapter.3}%
//! ```
//!
//! unit, title, printed page and (with hyperref) a destination name.

use super::{Anchor, RawTocEntry};
use crate::error::{Error, Result};

const CONTENTSLINE: &str = "\\contentsline";
const NUMBERLINE: &str = "\\numberline";

/// Depth of a sectioning unit; `None` for lists of figures and tables.
pub fn unit_level(unit: &str) -> Option<u8> {
    match unit.trim() {
        "part" => Some(0),
        "chapter" => Some(1),
        "section" => Some(2),
        "subsection" => Some(3),
        "subsubsection" => Some(4),
        "paragraph" => Some(5),
        "subparagraph" => Some(6),
        _ => None,
    }
}

/// Parse the text of a `.toc` file into raw entries in document order.
///
/// Errors carry the 1-based line on which the offending `\contentsline`
/// starts.
pub fn parse_latex_toc(text: &str) -> Result<Vec<RawTocEntry>> {
    let mut entries = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut line_counted_to = 0;

    while let Some(found) = text[pos..].find(CONTENTSLINE) {
        let start = pos + found;
        line += text[line_counted_to..start].matches('\n').count();
        line_counted_to = start;

        let mut cursor = start + CONTENTSLINE.len();
        let malformed = |detail: &str| Error::MalformedToc {
            entry: line,
            detail: detail.to_string(),
        };

        let unit = read_group(text, &mut cursor).ok_or_else(|| malformed("missing unit argument"))?;
        let title = read_group(text, &mut cursor).ok_or_else(|| malformed("missing title argument"))?;
        let page = read_group(text, &mut cursor).ok_or_else(|| malformed("missing page argument"))?;
        let dest = read_group(text, &mut cursor)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);
        pos = cursor;

        let Some(level) = unit_level(unit) else {
            log::debug!("line {}: skipping non-sectioning unit '{}'", line, unit.trim());
            continue;
        };

        let page = page.trim();
        if page.is_empty() {
            return Err(malformed("empty page argument"));
        }

        let (numbered, title) = strip_numberline(title);
        let title = clean_title(&title);
        if title.is_empty() {
            log::warn!("line {}: TOC entry has an empty title", line);
        }

        entries.push(RawTocEntry {
            title,
            level,
            anchor: Anchor::Label(clean_title(page)),
            dest,
            numbered,
        });
    }

    log::debug!("Parsed {} LaTeX TOC entries", entries.len());
    Ok(entries)
}

/// Read one `{...}` group starting at `cursor` (after optional whitespace).
///
/// Nested braces are balanced and `\{` / `\}` do not count. On success the
/// cursor is moved past the closing brace.
fn read_group<'a>(text: &'a str, cursor: &mut usize) -> Option<&'a str> {
    let rest = &text[*cursor..];
    let open = rest.len() - rest.trim_start().len();
    if !rest[open..].starts_with('{') {
        return None;
    }

    let body_start = open + 1;
    let mut depth = 1usize;
    let mut escaped = false;
    for (idx, ch) in rest[body_start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let body_end = body_start + idx;
                    *cursor += body_end + 1;
                    return Some(&rest[body_start..body_end]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove a `\numberline {n}` prefix, reporting whether one was present.
fn strip_numberline(title: &str) -> (bool, String) {
    let Some(at) = title.find(NUMBERLINE) else {
        return (false, title.to_string());
    };
    let mut cursor = at + NUMBERLINE.len();
    if read_group(title, &mut cursor).is_none() {
        return (true, title.replacen(NUMBERLINE, "", 1));
    }
    let mut out = String::with_capacity(title.len());
    out.push_str(&title[..at]);
    out.push_str(&title[cursor..]);
    (true, out)
}

/// Reduce TeX markup in a title to plain text.
///
/// Control words are dropped (their arguments survive as text), control
/// symbols become the symbol, spacing commands become a space.
pub fn clean_title(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some(n) if n.is_ascii_alphabetic() || n == '@' => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if n.is_ascii_alphabetic() || n == '@' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if chars.peek() == Some(&'*') {
                        chars.next();
                    }
                    while chars.peek().is_some_and(|c| c.is_whitespace()) {
                        chars.next();
                    }
                    match name.as_str() {
                        "nobreakspace" | "space" | "quad" | "qquad" | "enskip" => out.push(' '),
                        "ldots" | "dots" | "textellipsis" => out.push_str("..."),
                        "textendash" => out.push('-'),
                        "textemdash" => out.push_str("--"),
                        "ae" => out.push('æ'),
                        "ss" => out.push('ß'),
                        _ => {}
                    }
                }
                Some(n) => {
                    chars.next();
                    match n {
                        ',' | ';' | ':' | ' ' | '\\' => out.push(' '),
                        other => out.push(other),
                    }
                }
                None => {}
            },
            '{' | '}' | '$' => {}
            '~' => out.push(' '),
            other => out.push(other),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}
