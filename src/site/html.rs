//! Small HTML helpers shared by the assembler and the verifier.
//!
//! Fragments come from an external converter and are treated as opaque
//! markup; only headings and the shell's own markers are ever inspected.

use std::rc::Rc;
use std::sync::OnceLock;

use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use html5ever::tendril::TendrilSink;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};
use regex::Regex;

use crate::error::{Error, Result};

/// Marker opening the content region of a generated page.
pub const CONTENT_START: &str = "<!-- content-start -->";

/// Marker closing the content region of a generated page.
pub const CONTENT_END: &str = "<!-- content-end -->";

fn section_heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<h([2-4])\b([^>]*)>(.*?)</h[2-4]\s*>").unwrap())
}

fn id_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)\bid\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").unwrap())
}

fn span_attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"data-first-page="(\d+)"[^>]*data-last-page="(\d+)""#).unwrap()
    })
}

/// Escape text for use in element content and quoted attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A heading usable as a local TOC entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeading {
    /// Heading level (2-4).
    pub level: u8,
    /// Value of the `id` attribute.
    pub id: String,
    /// Heading text, markup removed, still HTML-escaped.
    pub text: String,
}

/// `h2`-`h4` headings that carry an `id`, in document order.
pub fn local_headings(html: &str) -> Vec<LocalHeading> {
    section_heading_regex()
        .captures_iter(html)
        .filter_map(|caps| {
            let level: u8 = caps[1].parse().ok()?;
            let id_caps = id_attr_regex().captures(&caps[2])?;
            let id = id_caps.get(1).or_else(|| id_caps.get(2))?.as_str().trim();
            if id.is_empty() {
                return None;
            }
            let text = tag_regex().replace_all(&caps[3], "");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            Some(LocalHeading {
                level,
                id: id.to_string(),
                text,
            })
        })
        .collect()
}

/// Matches an `h1`/`h2` whose text opens with a bibliography heading word.
#[derive(Debug, Clone)]
pub struct BibliographyHeading {
    regex: Regex,
    text_regex: Regex,
}

impl BibliographyHeading {
    /// Build a matcher for the given heading words.
    pub fn new(words: &[String]) -> Result<Self> {
        let alternatives: Vec<String> = words
            .iter()
            .map(|w| w.trim())
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect();
        if alternatives.is_empty() {
            return Err(Error::Other(
                "at least one bibliography heading word is required".to_string(),
            ));
        }
        let alternatives = alternatives.join("|");
        let invalid = |e: regex::Error| Error::Other(format!("invalid heading pattern: {}", e));
        let regex = Regex::new(&format!(
            r"(?is)<h[12]\b[^>]*>\s*(?:<[^>]*>\s*)*(?:{})\b",
            alternatives
        ))
        .map_err(invalid)?;
        let text_regex = Regex::new(&format!(r"(?i)^\s*(?:{})\b", alternatives)).map_err(invalid)?;
        Ok(Self { regex, text_regex })
    }

    /// Check if the markup contains a bibliography heading.
    pub fn is_match(&self, html: &str) -> bool {
        self.regex.is_match(html)
    }

    /// Split a fragment at the bibliography heading.
    ///
    /// Returns `None` when the fragment has no heading. Otherwise returns the
    /// chapter part (`None` when blank) and the part from the heading on.
    /// Elements enclosing the heading are closed at the end of the chapter
    /// part and reopened, with their attributes, at the start of the other,
    /// so both halves are well formed.
    pub fn split(&self, html: &str) -> Result<Option<(Option<String>, String)>> {
        if !self.is_match(html) {
            return Ok(None);
        }
        let dom = parse_fragment(html);
        let Some(body) = find_element(&dom.document, "body") else {
            return Ok(None);
        };
        let mut path = Vec::new();
        if !self.heading_path(&body, &mut path) {
            return Ok(None);
        }

        let mut head = String::new();
        let has_head = write_before(&body, &path, &mut head)?;
        let mut tail = String::new();
        write_from(&body, &path, &mut tail)?;
        Ok(Some((
            has_head.then(|| head.trim().to_string()),
            tail.trim().to_string(),
        )))
    }

    /// Elements from `node` down to the first bibliography heading.
    fn heading_path(&self, node: &Handle, path: &mut Vec<Handle>) -> bool {
        for child in node.children.borrow().iter() {
            let NodeData::Element { ref name, .. } = child.data else {
                continue;
            };
            path.push(child.clone());
            let local: &str = &name.local;
            if matches!(local, "h1" | "h2") && self.text_regex.is_match(&text_content(child)) {
                return true;
            }
            if self.heading_path(child, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

fn parse_fragment(html: &str) -> RcDom {
    let wrapped = format!(
        "<!DOCTYPE html><html><head></head><body>{}</body></html>",
        html
    );
    parse_document(RcDom::default(), ParseOpts::default())
        .from_utf8()
        .one(wrapped.as_bytes())
}

fn find_element(handle: &Handle, name: &str) -> Option<Handle> {
    for child in handle.children.borrow().iter() {
        if let NodeData::Element { name: ref qname, .. } = child.data {
            if &*qname.local == name {
                return Some(child.clone());
            }
        }
        if let Some(found) = find_element(child, name) {
            return Some(found);
        }
    }
    None
}

fn text_content(handle: &Handle) -> String {
    let mut text = String::new();
    collect_text(handle, &mut text);
    text
}

fn collect_text(handle: &Handle, text: &mut String) {
    if let NodeData::Text { ref contents } = handle.data {
        text.push_str(&contents.borrow());
    }
    for child in handle.children.borrow().iter() {
        collect_text(child, text);
    }
}

fn serialize_node(handle: &Handle) -> Result<String> {
    let mut bytes = Vec::new();
    let node: SerializableHandle = handle.clone().into();
    let opts = SerializeOpts {
        traversal_scope: TraversalScope::IncludeNode,
        ..Default::default()
    };
    serialize(&mut bytes, &node, opts)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn start_tag(handle: &Handle) -> String {
    let mut tag = String::new();
    if let NodeData::Element {
        ref name,
        ref attrs,
        ..
    } = handle.data
    {
        tag.push_str(&format!("<{}", &*name.local));
        for attr in attrs.borrow().iter() {
            tag.push_str(&format!(
                " {}=\"{}\"",
                &*attr.name.local,
                escape_html(&attr.value)
            ));
        }
        tag.push('>');
    }
    tag
}

fn end_tag(handle: &Handle) -> String {
    match handle.data {
        NodeData::Element { ref name, .. } => format!("</{}>", &*name.local),
        _ => String::new(),
    }
}

/// Write the children of `node` that precede `path`, closing every element
/// on the path. Returns whether anything but whitespace was written.
fn write_before(node: &Handle, path: &[Handle], out: &mut String) -> Result<bool> {
    let mut written = false;
    for child in node.children.borrow().iter() {
        if Rc::ptr_eq(child, &path[0]) {
            if path.len() > 1 {
                let mut inner = String::new();
                if write_before(child, &path[1..], &mut inner)? {
                    out.push_str(&start_tag(child));
                    out.push_str(&inner);
                    out.push_str(&end_tag(child));
                    written = true;
                }
            }
            break;
        }
        let html = serialize_node(child)?;
        written |= !html.trim().is_empty();
        out.push_str(&html);
    }
    Ok(written)
}

/// Write `path` and everything after it, reopening every element on the path.
fn write_from(node: &Handle, path: &[Handle], out: &mut String) -> Result<()> {
    let mut found = false;
    for child in node.children.borrow().iter() {
        if found {
            out.push_str(&serialize_node(child)?);
        } else if Rc::ptr_eq(child, &path[0]) {
            found = true;
            if path.len() == 1 {
                out.push_str(&serialize_node(child)?);
            } else {
                out.push_str(&start_tag(child));
                write_from(child, &path[1..], out)?;
                out.push_str(&end_tag(child));
            }
        }
    }
    Ok(())
}

/// Text between the content markers of a generated page.
pub fn content_region(page: &str) -> Option<&str> {
    let start = page.find(CONTENT_START)? + CONTENT_START.len();
    let end = start + page[start..].find(CONTENT_END)?;
    Some(&page[start..end])
}

/// Physical span recorded on a generated page.
pub fn page_span(page: &str) -> Option<(u32, u32)> {
    let caps = span_attr_regex().captures(page)?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}
