//! Page shell shared by every generated HTML document.

use super::html::{escape_html, LocalHeading, CONTENT_END, CONTENT_START};
use super::nav::{NavLink, Relation};
use crate::naming::{ArtifactName, INDEX_FILE};
use crate::range::{ChapterRange, RangeKind};

const STYLE: &str = "\
body{margin:0;font-family:Georgia,serif;line-height:1.5;color:#222}\
.sidebar{position:fixed;top:0;bottom:0;left:0;width:16rem;overflow-y:auto;padding:1rem;background:#f6f6f3;border-right:1px solid #ddd;font-size:.9rem}\
.sidebar ol{padding-left:1.2rem}\
.sidebar a.current{font-weight:bold}\
.main{margin-left:18rem;padding:1rem 2rem;max-width:48rem}\
.topbar{display:flex;gap:1rem;padding-bottom:.5rem;border-bottom:1px solid #ddd;font-family:sans-serif;font-size:.9rem}\
.topbar .download{margin-left:auto}\
.local-toc{font-size:.9rem;border-left:3px solid #ccc;padding-left:1rem}\
.local-toc .level-3{margin-left:1rem}\
.local-toc .level-4{margin-left:2rem}\
.pdf-page{margin:1rem 0}";

/// Sidebar entry: file name and title of every page in reading order.
#[derive(Debug, Clone)]
pub(crate) struct SidebarEntry {
    pub file: String,
    pub title: String,
}

impl SidebarEntry {
    pub(crate) fn of(range: &ChapterRange) -> Self {
        Self {
            file: ArtifactName::of(range).html_file(),
            title: range.title.clone(),
        }
    }
}

/// Everything the shell needs to render one page.
pub(crate) struct PageView<'a> {
    pub book_title: &'a str,
    pub file: &'a str,
    pub title: &'a str,
    pub span: Option<(u32, u32)>,
    pub sidebar: &'a [SidebarEntry],
    pub links: &'a [NavLink],
    pub local_toc: &'a [LocalHeading],
    pub body: &'a str,
}

/// Top bar order.
const TOPBAR_ORDER: [Relation; 5] = [
    Relation::Previous,
    Relation::Toc,
    Relation::Bibliography,
    Relation::Next,
    Relation::Download,
];

/// Render a complete HTML document.
pub(crate) fn render_page(view: &PageView<'_>) -> String {
    let mut out = String::with_capacity(view.body.len() + 4096);
    let book = escape_html(view.book_title);
    let title = escape_html(view.title);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    if view.file == INDEX_FILE {
        out.push_str(&format!("<title>{}</title>\n", book));
    } else {
        out.push_str(&format!("<title>{} | {}</title>\n", title, book));
    }
    out.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));

    // Sidebar
    out.push_str(&format!(
        "<nav class=\"sidebar\">\n<a class=\"book-title\" href=\"{}\">{}</a>\n<ol>\n",
        INDEX_FILE, book
    ));
    for entry in view.sidebar {
        let current = if entry.file == view.file {
            " class=\"current\""
        } else {
            ""
        };
        out.push_str(&format!(
            "<li><a href=\"{}\"{}>{}</a></li>\n",
            escape_html(&entry.file),
            current,
            escape_html(&entry.title)
        ));
    }
    out.push_str("</ol>\n</nav>\n<div class=\"main\">\n");

    // Top bar
    out.push_str("<header class=\"topbar\">\n");
    for relation in TOPBAR_ORDER {
        for link in view
            .links
            .iter()
            .filter(|l| l.source == view.file && l.relation == relation)
        {
            let rel = match relation {
                Relation::Previous => " rel=\"prev\"",
                Relation::Next => " rel=\"next\"",
                Relation::Download => " class=\"download\"",
                _ => "",
            };
            out.push_str(&format!(
                "<a href=\"{}\"{}>{}</a>\n",
                escape_html(&link.target),
                rel,
                relation.label()
            ));
        }
    }
    out.push_str("</header>\n");

    // Content card
    match view.span {
        Some((first, last)) => {
            out.push_str(&format!(
                "<article class=\"content\" data-first-page=\"{}\" data-last-page=\"{}\">\n",
                first, last
            ));
        }
        None => out.push_str("<article class=\"content\">\n"),
    }
    out.push_str(&format!("<h1>{}</h1>\n", title));
    if !view.local_toc.is_empty() {
        out.push_str("<nav class=\"local-toc\">\n<ul>\n");
        for heading in view.local_toc {
            out.push_str(&format!(
                "<li class=\"level-{}\"><a href=\"#{}\">{}</a></li>\n",
                heading.level,
                escape_html(&heading.id),
                heading.text
            ));
        }
        out.push_str("</ul>\n</nav>\n");
    }
    out.push_str(CONTENT_START);
    out.push('\n');
    out.push_str(view.body);
    if !view.body.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(CONTENT_END);
    out.push_str("\n</article>\n</div>\n</body>\n</html>\n");
    out
}

/// Wrap one page's fragment, recording its physical page.
pub(crate) fn wrap_fragment(page: u32, html: &str) -> String {
    format!(
        "<div class=\"pdf-page\" id=\"page-{}\" data-page=\"{}\">\n{}\n</div>\n",
        page,
        page,
        html.trim()
    )
}

/// Body of the contents page: every range with its span and local headings.
pub(crate) fn contents_body(entries: &[(&ChapterRange, Vec<LocalHeading>)]) -> String {
    let mut out = String::from("<ol class=\"contents\">\n");
    for (range, headings) in entries {
        let file = ArtifactName::of(range).html_file();
        let kind = match range.kind {
            RangeKind::Chapter => "",
            RangeKind::Preface => " class=\"preface\"",
            RangeKind::Bibliography => " class=\"bibliography\"",
        };
        out.push_str(&format!(
            "<li{}><a href=\"{}\">{}</a> <span class=\"pages\">pp. {}-{}</span>",
            kind,
            escape_html(&file),
            escape_html(&range.title),
            range.start_page,
            range.end_page
        ));
        if !headings.is_empty() {
            out.push_str("\n<ul>\n");
            for heading in headings {
                out.push_str(&format!(
                    "<li class=\"level-{}\"><a href=\"{}#{}\">{}</a></li>\n",
                    heading.level,
                    escape_html(&file),
                    escape_html(&heading.id),
                    heading.text
                ));
            }
            out.push_str("</ul>\n");
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ol>\n");
    out
}

/// Body of the landing page.
pub(crate) fn index_body(total_pages: u32, ranges: &[&ChapterRange], links: &[NavLink]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "<p class=\"summary\">{} chapters, {} pages.</p>\n",
        ranges.iter().filter(|r| !r.is_bibliography()).count(),
        total_pages
    ));
    out.push_str("<ul class=\"chapters\">\n");
    for range in ranges {
        let name = ArtifactName::of(range);
        let download = links
            .iter()
            .find(|l| l.source == name.html_file() && l.relation == Relation::Download);
        out.push_str(&format!(
            "<li><a href=\"{}\">{}</a>",
            escape_html(&name.html_file()),
            escape_html(&range.title)
        ));
        if let Some(download) = download {
            out.push_str(&format!(
                " <a class=\"download\" href=\"{}\">PDF</a>",
                escape_html(&download.target)
            ));
        }
        out.push_str("</li>\n");
    }
    out.push_str("</ul>\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_page_shell() {
        let sidebar = vec![
            SidebarEntry {
                file: "01-a.html".into(),
                title: "A & B".into(),
            },
            SidebarEntry {
                file: "02-c.html".into(),
                title: "C".into(),
            },
        ];
        let links = vec![
            NavLink {
                source: "01-a.html".into(),
                target: "02-c.html".into(),
                relation: Relation::Next,
            },
            NavLink {
                source: "02-c.html".into(),
                target: "01-a.html".into(),
                relation: Relation::Previous,
            },
        ];
        let view = PageView {
            book_title: "Optics <2nd ed.>",
            file: "01-a.html",
            title: "A & B",
            span: Some((1, 4)),
            sidebar: &sidebar,
            links: &links,
            local_toc: &[],
            body: "<p>text</p>",
        };
        let html = render_page(&view);
        assert!(html.contains("<title>A &amp; B | Optics &lt;2nd ed.&gt;</title>"));
        assert!(html.contains("<a href=\"01-a.html\" class=\"current\">A &amp; B</a>"));
        assert!(html.contains("<a href=\"02-c.html\" rel=\"next\">Next</a>"));
        assert!(!html.contains("rel=\"prev\""));
        assert!(html.contains("data-first-page=\"1\" data-last-page=\"4\""));
        assert!(html.contains("<!-- content-start -->\n<p>text</p>\n<!-- content-end -->"));
    }

    #[test]
    fn test_wrap_fragment() {
        assert_eq!(
            wrap_fragment(7, "  <p>x</p>\n"),
            "<div class=\"pdf-page\" id=\"page-7\" data-page=\"7\">\n<p>x</p>\n</div>\n"
        );
    }
}
