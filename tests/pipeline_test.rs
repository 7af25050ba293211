//! End-to-end builds over synthetic books.

mod common;

use std::path::Path;

use bookcut::{
    BuildInputs, BuildOptions, ChapterRange, Error, LopdfBackend, PdfPartitioner, Pipeline,
    RangeKind, TocSource,
};
use lopdf::{Document, Object};
use common::{pdf_page_count, write_fixture, BookPdf, Chapter};

const CHAPTERS: [Chapter; 5] = [
    Chapter {
        title: "Introduction",
        start: 1,
    },
    Chapter {
        title: "Wave Optics",
        start: 12,
    },
    Chapter {
        title: "Interference",
        start: 30,
    },
    Chapter {
        title: "Lasers",
        start: 55,
    },
    Chapter {
        title: "Quantum Optics",
        start: 80,
    },
];

fn build(fixture: &common::Fixture, out: &Path, options: BuildOptions) -> bookcut::Result<bookcut::RunSummary> {
    let inputs = BuildInputs::new(
        &fixture.master,
        TocSource::from_path(&fixture.toc),
        &fixture.fragments,
    );
    Pipeline::new(options.with_output_root(out).with_title("Optics")).run(&inputs)
}

#[test]
fn test_five_chapter_book() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), &CHAPTERS, 100, Some(92));
    let out = dir.path().join("out");

    let summary = build(&fixture, &out, BuildOptions::new()).unwrap();
    assert!(summary.is_success());
    assert!(summary.warnings.is_empty());
    let report = summary.verification.as_ref().unwrap();
    assert!(report.passed(), "{:?}", report.violations);

    let spans: Vec<(u32, u32)> = summary
        .manifest
        .ranges
        .iter()
        .map(|r| (r.range.start_page, r.range.end_page))
        .collect();
    assert_eq!(
        spans,
        vec![(1, 11), (12, 29), (30, 54), (55, 79), (80, 91), (92, 100)]
    );
    let window = summary.manifest.bibliography.unwrap();
    assert_eq!((window.start_page, window.end_page), (92, 100));

    let downloads = out.join("downloads");
    assert_eq!(pdf_page_count(&downloads.join("01-introduction.pdf")), 11);
    assert_eq!(pdf_page_count(&downloads.join("05-quantum-optics.pdf")), 12);
    assert_eq!(pdf_page_count(&downloads.join("bibliography.pdf")), 9);

    let site = out.join("site");
    for file in ["index.html", "contents.html", "manifest.json", "bibliography.html"] {
        assert!(site.join(file).is_file(), "{} missing", file);
    }
    let chapter = std::fs::read_to_string(site.join("02-wave-optics.html")).unwrap();
    assert!(chapter.contains("href=\"../downloads/02-wave-optics.pdf\""));
    assert!(chapter.contains("rel=\"prev\""));
    assert!(chapter.contains("href=\"#sec-12\""));
    assert!(!chapter.contains("<h1>Bibliography</h1>"));

    let bibliography = std::fs::read_to_string(site.join("bibliography.html")).unwrap();
    assert!(bibliography.contains("data-first-page=\"92\" data-last-page=\"100\""));
    assert!(bibliography.contains("A. Einstein, 1905."));
}

#[test]
fn test_slices_are_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), &CHAPTERS[..3], 40, Some(36));

    let first = dir.path().join("first");
    let second = dir.path().join("second");
    build(&fixture, &first, BuildOptions::new()).unwrap();
    build(&fixture, &second, BuildOptions::new().sequential()).unwrap();
    // Rebuilding over existing output gives the same files too.
    build(&fixture, &first, BuildOptions::new()).unwrap();

    for name in [
        "01-introduction.pdf",
        "02-wave-optics.pdf",
        "03-interference.pdf",
        "bibliography.pdf",
    ] {
        let a = std::fs::read(first.join("downloads").join(name)).unwrap();
        let b = std::fs::read(second.join("downloads").join(name)).unwrap();
        assert_eq!(a, b, "{} differs between runs", name);
    }
    let a = std::fs::read_to_string(first.join("site/manifest.json")).unwrap();
    let b = std::fs::read_to_string(second.join("site/manifest.json")).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_slices_drop_book_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("book.pdf");
    let texts = common::page_texts(&CHAPTERS[..2], 20, Some(18));
    BookPdf::new(texts)
        .with_bookmark("Introduction", 1)
        .with_bookmark("Wave Optics", 12)
        .write(&master);
    let fragments = dir.path().join("fragments");
    std::fs::create_dir_all(&fragments).unwrap();
    let inputs = BuildInputs::new(&master, TocSource::Outline, &fragments);
    let out = dir.path().join("out");

    let summary = Pipeline::new(BuildOptions::new().with_output_root(&out).skip_verify())
        .run(&inputs)
        .unwrap();
    assert!(summary.verification.is_none());
    assert_eq!(summary.manifest.ranges.len(), 3);
    assert_eq!(summary.manifest.title, "book");

    let slice = lopdf::Document::load(out.join("downloads/02-wave-optics.pdf")).unwrap();
    let catalog = slice.catalog().unwrap();
    assert!(catalog.get(b"Outlines").is_err());
    assert!(catalog.get(b"PageMode").is_err());
    assert_eq!(slice.get_pages().len(), 6);
}

fn assert_references_resolve(doc: &Document, object: &Object) {
    match object {
        Object::Reference(id) => assert!(doc.objects.contains_key(id), "{:?} is missing", id),
        Object::Array(items) => items.iter().for_each(|o| assert_references_resolve(doc, o)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, o)| assert_references_resolve(doc, o)),
        Object::Stream(stream) => stream
            .dict
            .iter()
            .for_each(|(_, o)| assert_references_resolve(doc, o)),
        _ => {}
    }
}

#[test]
fn test_links_within_slice_survive() {
    let texts = common::page_texts(&CHAPTERS[..2], 20, None);
    // Page 2 links to page 5 (same chapter) and to page 15 (next chapter).
    let master = BookPdf::new(texts).with_link(2, 5).with_link(2, 15).to_bytes();
    let range = ChapterRange {
        title: "Introduction".to_string(),
        start_page: 1,
        end_page: 11,
        kind: RangeKind::Chapter,
        ordinal: 1,
        aliases: Vec::new(),
    };

    let bytes = PdfPartitioner::new(&master).extract(&range).unwrap();
    let slice = Document::load_mem(&bytes).unwrap();
    let pages = slice.get_pages();
    assert_eq!(pages.len(), 11);
    for object in slice.objects.values() {
        assert_references_resolve(&slice, object);
    }

    let page = slice.get_dictionary(pages[&2]).unwrap();
    let annots = page.get(b"Annots").unwrap().as_array().unwrap();
    assert_eq!(annots.len(), 2);
    let dests: Vec<Vec<Object>> = annots
        .iter()
        .map(|annot| {
            let annot = slice.get_dictionary(annot.as_reference().unwrap()).unwrap();
            annot.get(b"Dest").unwrap().as_array().unwrap().clone()
        })
        .collect();

    assert_eq!(dests[0][0].as_reference().unwrap(), pages[&5]);
    // The link into the next chapter no longer points at any object.
    assert!(dests[1].iter().all(|o| o.as_reference().is_err()));
}

#[test]
fn test_missing_bibliography_keeps_trailing_pages() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), &CHAPTERS[..3], 40, None);
    let out = dir.path().join("out");

    let summary = build(&fixture, &out, BuildOptions::new()).unwrap();
    assert!(summary.is_success());
    assert_eq!(summary.warnings.len(), 1);
    assert!(summary.manifest.bibliography.is_none());
    let last = summary.manifest.ranges.last().unwrap();
    assert_eq!((last.range.start_page, last.range.end_page), (30, 40));
    assert!(!out.join("downloads/bibliography.pdf").exists());
    assert!(!out.join("site/bibliography.html").exists());
    let index = std::fs::read_to_string(out.join("site/index.html")).unwrap();
    assert!(!index.contains("bibliography.html"));
}

#[test]
fn test_required_bibliography_fails_build() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), &CHAPTERS[..3], 40, None);
    let out = dir.path().join("out");

    let err = build(
        &fixture,
        &out,
        BuildOptions::new().with_require_bibliography(true),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        Error::BibliographyNotFound {
            lower_bound: 31,
            total_pages: 40
        }
    ));
    assert!(!out.join("downloads").exists());
}

#[test]
fn test_fixed_offset_strategy() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), &CHAPTERS[..2], 30, None);
    let out = dir.path().join("out");

    let summary = build(
        &fixture,
        &out,
        BuildOptions::new().with_strategy(bookcut::BoundaryStrategy::FixedOffset(4)),
    )
    .unwrap();
    let bib = summary.manifest.bibliography.unwrap();
    assert_eq!((bib.start_page, bib.end_page), (27, 30));
    assert_eq!(
        pdf_page_count(&out.join("downloads/bibliography.pdf")),
        4
    );
}

#[test]
fn test_plan_with_latex_toc_and_offset() {
    let dir = tempfile::tempdir().unwrap();
    let master = dir.path().join("book.pdf");
    let mut texts: Vec<String> = vec!["Title page".into(), "Contents".into()];
    texts.extend((1..=18).map(|n| format!("Body page {}", n)));
    BookPdf::new(texts).write(&master);

    let toc = dir.path().join("book.toc");
    std::fs::write(
        &toc,
        "\\contentsline {chapter}{Preface}{1}{chapter*.1}%\n\
         \\contentsline {chapter}{\\numberline {1}Rays}{3}{chapter.1}%\n\
         \\contentsline {section}{\\numberline {1.1}Mirrors}{5}{section.1.1}%\n\
         \\contentsline {chapter}{\\numberline {2}Lenses}{10}{chapter.2}%\n",
    )
    .unwrap();

    let backend = LopdfBackend::load_file(&master).unwrap();
    let plan = Pipeline::new(BuildOptions::new().with_page_offset(2))
        .plan(&backend, &TocSource::from_path(&toc))
        .unwrap();

    let ranges = plan.partition.ranges();
    assert_eq!(ranges.len(), 3);
    assert_eq!(ranges[0].kind, RangeKind::Preface);
    assert_eq!((ranges[0].start_page, ranges[0].end_page), (1, 4));
    assert_eq!((ranges[1].start_page, ranges[1].end_page), (5, 11));
    assert_eq!((ranges[2].start_page, ranges[2].end_page), (12, 20));
    assert_eq!(plan.warnings.len(), 1);
}

#[test]
fn test_stages_reported_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), &CHAPTERS[..2], 20, Some(18));
    let inputs = BuildInputs::new(
        &fixture.master,
        TocSource::from_path(&fixture.toc),
        &fixture.fragments,
    );

    let mut stages = Vec::new();
    Pipeline::new(BuildOptions::new().with_output_root(&dir.path().join("out")))
        .run_with(&inputs, |stage| stages.push(stage))
        .unwrap();
    use bookcut::Stage::*;
    assert_eq!(
        stages,
        vec![
            LoadMaster,
            ReadToc,
            ResolveRanges,
            FindBibliography,
            LoadFragments,
            Partition,
            Assemble,
            Verify
        ]
    );
}

#[test]
fn test_non_pdf_master_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = write_fixture(dir.path(), &CHAPTERS[..2], 20, None);
    std::fs::write(&fixture.master, "<html>not a book</html>").unwrap();

    let err = build(&fixture, &dir.path().join("out"), BuildOptions::new()).unwrap_err();
    assert!(matches!(err, Error::UnknownFormat));
}
