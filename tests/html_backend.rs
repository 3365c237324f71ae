//! End-to-end conversions through the HTML backend.
//!
//! Rasterization is served by `FixedRenderer`, so no TeX installation is
//! needed.

use std::fs;
use std::path::Path;

use folio::render::{AssetKind, FixedRenderer};
use folio::{Error, HtmlConfig, convert_html};
use tempfile::TempDir;

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture(name: &str) -> String {
    fs::read_to_string(format!("{}/{}", FIXTURES_DIR, name)).expect("Failed to read fixture")
}

fn read_all(paths: &[impl AsRef<Path>]) -> Vec<String> {
    paths
        .iter()
        .map(|p| fs::read_to_string(p).expect("Failed to read chapter"))
        .collect()
}

fn count_headers(html: &str) -> usize {
    ["<h2", "<h3", "<h4", "<h5", "<h6"]
        .iter()
        .map(|tag| html.matches(tag).count())
        .sum()
}

#[test]
fn test_thesis_chapter_files() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("html");
    let renderer = FixedRenderer::svg();

    let report = convert_html(&fixture("thesis.xml"), &HtmlConfig::new(&out_dir), &renderer)
        .expect("conversion failed");

    assert_eq!(report.chapters.len(), 2);
    assert_eq!(report.chapters[0], out_dir.join("chapter01.html"));
    assert_eq!(report.chapters[1], out_dir.join("chapter02.html"));

    for path in &report.chapters {
        let html = fs::read_to_string(path).unwrap();
        assert!(html.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(html.contains("<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\""));
        assert!(html.contains("<html xmlns=\"http://www.w3.org/1999/xhtml\">"));
    }

    let chapters = read_all(&report.chapters);
    assert!(chapters[0].contains("<h1 id=\"ch:intro\">Chapter 1: Introduction</h1>"));
    assert!(chapters[1].contains("<title>Chapter 2: Results</title>"));
}

#[test]
fn test_section_count_matches_headers() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();
    let source = fixture("thesis.xml");

    let report = convert_html(&source, &HtmlConfig::new(tmp.path()), &renderer).unwrap();

    let sections = ["<section ", "<subsection ", "<subsubsection "]
        .iter()
        .map(|tag| source.matches(tag).count())
        .sum::<usize>();
    let headers: usize = read_all(&report.chapters)
        .iter()
        .map(|html| count_headers(html))
        .sum();
    assert_eq!(sections, 4);
    assert_eq!(headers, sections);
}

#[test]
fn test_math_styles_and_rasterization() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();

    let report =
        convert_html(&fixture("thesis.xml"), &HtmlConfig::new(tmp.path()), &renderer).unwrap();
    let chapter = &read_all(&report.chapters)[0];

    // Lossless math becomes styled text
    assert!(chapter.contains("<i>E</i>=<i>mc</i><sup>2</sup>"), "{chapter}");
    assert!(chapter.contains("<b>v</b><sub><i>i</i></sub>"));
    assert!(chapter.contains("\u{3b1}"));

    // Everything else goes through the renderer
    let kinds: Vec<_> = renderer.requests().iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![AssetKind::Equation, AssetKind::Math, AssetKind::Plot]
    );
    assert!(chapter.contains("<img class=\"math\" src=\"images/"));

    let images = fs::read_dir(tmp.path().join("images")).unwrap().count();
    assert_eq!(images, 3);
}

#[test]
fn test_labels_and_references() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();

    let report =
        convert_html(&fixture("thesis.xml"), &HtmlConfig::new(tmp.path()), &renderer).unwrap();
    let chapters = read_all(&report.chapters);

    assert!(chapters[0].contains("<p id=\"eq1\"><img src=\"images/"));
    assert!(chapters[0].contains("<a href=\"#eq1\">eq1</a>"));
    assert!(chapters[0].contains("<h2 id=\"sec:motivation\">Motivation</h2>"));
    assert!(chapters[0].contains("<div id=\"sec:Prior-work\">"));
    assert!(chapters[0].contains("<a href=\"bibliography.html#einstein1905\">[einstein1905]</a>"));
    assert!(chapters[1].contains("<div class=\"figure\" id=\"fig:setup\">"));
    assert!(chapters[1].contains("<p id=\"plot:decay\"><img src=\"images/"));
}

#[test]
fn test_tables_and_bold() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();

    let report =
        convert_html(&fixture("thesis.xml"), &HtmlConfig::new(tmp.path()), &renderer).unwrap();
    let chapter = &read_all(&report.chapters)[1];

    assert!(chapter.contains("<b>Summary</b>"));
    assert!(chapter.contains("<td>time &amp; cost</td>"));
    assert_eq!(chapter.matches("<tr>").count(), 2);
    assert!(chapter.contains("<p class=\"caption\">The apparatus</p>"));
}

#[test]
fn test_nested_chapter_rejected() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();

    let err = convert_html(
        &fixture("nested_chapters.xml"),
        &HtmlConfig::new(tmp.path()),
        &renderer,
    )
    .unwrap_err();

    assert!(matches!(
        err,
        Error::StructuralGrammar {
            construct: "chapter",
            context: "chapter"
        }
    ));
    assert!(!tmp.path().join("chapter01.html").exists());
}

#[test]
fn test_unnamed_section_rejected_before_output() {
    let tmp = TempDir::new().unwrap();
    let out_dir = tmp.path().join("html");
    let renderer = FixedRenderer::svg();

    let err = convert_html(
        &fixture("unnamed_section.xml"),
        &HtmlConfig::new(&out_dir),
        &renderer,
    )
    .unwrap_err();

    match err {
        Error::MissingAttribute { element, attribute } => {
            assert_eq!(element, "section");
            assert_eq!(attribute, "name");
        }
        other => panic!("expected MissingAttribute, got {other:?}"),
    }
    assert!(!out_dir.exists());
}

#[test]
fn test_bold_inside_math_rejected() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();

    let err = convert_html(
        &fixture("bold_in_math.xml"),
        &HtmlConfig::new(tmp.path()),
        &renderer,
    )
    .unwrap_err();

    assert_eq!(err.to_string(), "Cannot use bold inside math");
    assert!(renderer.requests().is_empty());
}

#[test]
fn test_unknown_element_rejected() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();
    let source = r#"<document><chapter name="A"><marquee>hi</marquee></chapter></document>"#;

    let err = convert_html(source, &HtmlConfig::new(tmp.path()), &renderer).unwrap_err();
    assert_eq!(err.to_string(), "Unknown element <marquee> found");
}

#[test]
fn test_chapter_numbering_ignores_names() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();
    let source = (1..=11)
        .rev()
        .map(|i| format!("<chapter name=\"Part {i}\"/>"))
        .collect::<String>();
    let source = format!("<document>{source}</document>");

    let report = convert_html(&source, &HtmlConfig::new(tmp.path()), &renderer).unwrap();

    let names: Vec<_> = report
        .chapters
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.first().map(String::as_str), Some("chapter01.html"));
    assert_eq!(names.last().map(String::as_str), Some("chapter11.html"));
    let first = fs::read_to_string(&report.chapters[0]).unwrap();
    assert!(first.contains("Chapter 1: Part 11"));
}

#[test]
fn test_text_at_document_root_rejected() {
    let tmp = TempDir::new().unwrap();
    let renderer = FixedRenderer::svg();
    let err = convert_html(
        "<document>stray words</document>",
        &HtmlConfig::new(tmp.path()),
        &renderer,
    )
    .unwrap_err();
    assert!(matches!(err, Error::StructuralGrammar { construct: "text", .. }));
}
