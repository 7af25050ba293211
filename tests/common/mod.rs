//! Synthetic books for integration tests.

#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

/// A master document with one line of text per page and optional bookmarks.
pub struct BookPdf {
    pages: Vec<String>,
    bookmarks: Vec<(String, u32)>,
    links: Vec<(u32, u32)>,
}

impl BookPdf {
    pub fn new(pages: Vec<String>) -> Self {
        Self {
            pages,
            bookmarks: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Link annotation on page `from` whose destination is page `to`.
    pub fn with_link(mut self, from: u32, to: u32) -> Self {
        self.links.push((from, to));
        self
    }

    /// Top-level bookmark pointing at a physical page.
    pub fn with_bookmark(mut self, title: &str, page: u32) -> Self {
        self.bookmarks.push((title.to_string(), page));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let page_ids: Vec<ObjectId> = self.pages.iter().map(|_| doc.new_object_id()).collect();
        let mut kids: Vec<Object> = Vec::new();
        for (idx, text) in self.pages.iter().enumerate() {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(text.as_str())]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };

            let page_number = idx as u32 + 1;
            let annots: Vec<Object> = self
                .links
                .iter()
                .filter(|(from, _)| *from == page_number)
                .map(|(_, to)| {
                    let target = page_ids[*to as usize - 1];
                    doc.add_object(dictionary! {
                        "Type" => "Annot",
                        "Subtype" => "Link",
                        "Rect" => vec![72.into(), 700.into(), 200.into(), 712.into()],
                        "Dest" => vec![target.into(), "Fit".into()],
                    })
                    .into()
                })
                .collect();
            if !annots.is_empty() {
                page.set("Annots", annots);
            }

            doc.objects.insert(page_ids[idx], Object::Dictionary(page));
            kids.push(page_ids[idx].into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );

        let mut catalog = dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        };
        if !self.bookmarks.is_empty() {
            catalog.set("Outlines", self.add_outline(&mut doc, &page_ids));
            catalog.set("PageMode", "UseOutlines");
        }
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    fn add_outline(&self, doc: &mut Document, page_ids: &[ObjectId]) -> ObjectId {
        let outlines_id = doc.new_object_id();
        let item_ids: Vec<ObjectId> = self.bookmarks.iter().map(|_| doc.new_object_id()).collect();

        for (idx, (title, page)) in self.bookmarks.iter().enumerate() {
            let page_id = page_ids[*page as usize - 1];
            let mut item = dictionary! {
                "Title" => Object::string_literal(title.as_str()),
                "Parent" => outlines_id,
                "Dest" => vec![page_id.into(), "Fit".into()],
            };
            if idx > 0 {
                item.set("Prev", item_ids[idx - 1]);
            }
            if let Some(next) = item_ids.get(idx + 1) {
                item.set("Next", *next);
            }
            doc.objects.insert(item_ids[idx], Object::Dictionary(item));
        }

        doc.objects.insert(
            outlines_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => item_ids[0],
                "Last" => item_ids[item_ids.len() - 1],
                "Count" => item_ids.len() as i64,
            }),
        );
        outlines_id
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, self.to_bytes()).unwrap();
    }
}

/// Chapter of a fixture book: title and first physical page.
pub struct Chapter {
    pub title: &'static str,
    pub start: u32,
}

/// A fixture book laid out on disk: master PDF, JSON TOC and fragments.
pub struct Fixture {
    pub master: std::path::PathBuf,
    pub toc: std::path::PathBuf,
    pub fragments: std::path::PathBuf,
}

/// Page texts for `chapters` in a `total`-page book whose bibliography
/// starts at `bibliography` (if any).
pub fn page_texts(chapters: &[Chapter], total: u32, bibliography: Option<u32>) -> Vec<String> {
    (1..=total)
        .map(|page| {
            if Some(page) == bibliography {
                return "Bibliography [1] A. Einstein. Zur Elektrodynamik bewegter Koerper. 1905."
                    .to_string();
            }
            if bibliography.is_some_and(|start| page > start) {
                return format!("[{}] Cited work number {}.", page * 3, page);
            }
            let owner = chapters
                .iter()
                .rev()
                .find(|c| c.start <= page)
                .map_or("Front matter", |c| c.title);
            format!("{} - page {}", owner, page)
        })
        .collect()
}

/// Write a fixture book into `dir`.
pub fn write_fixture(
    dir: &Path,
    chapters: &[Chapter],
    total: u32,
    bibliography: Option<u32>,
) -> Fixture {
    let master = dir.join("book.pdf");
    BookPdf::new(page_texts(chapters, total, bibliography)).write(&master);

    let toc = dir.join("toc.json");
    let entries: Vec<serde_json::Value> = chapters
        .iter()
        .map(|c| serde_json::json!({ "title": c.title, "level": 1, "page": c.start }))
        .collect();
    std::fs::write(&toc, serde_json::to_string_pretty(&entries).unwrap()).unwrap();

    let fragments = dir.join("fragments");
    std::fs::create_dir_all(&fragments).unwrap();
    for page in 1..=total {
        let html = if Some(page) == bibliography {
            "<h1>Bibliography</h1>\n<ol><li>A. Einstein, 1905.</li></ol>".to_string()
        } else if chapters.iter().any(|c| c.start == page) {
            format!(
                "<h2 id=\"sec-{}\">Overview</h2>\n<p>Text of page {}.</p>",
                page, page
            )
        } else {
            format!("<p>Text of page {}.</p>", page)
        };
        std::fs::write(fragments.join(format!("page-{}.html", page)), html).unwrap();
    }

    Fixture {
        master,
        toc,
        fragments,
    }
}

/// Number of pages of a PDF file.
pub fn pdf_page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}
