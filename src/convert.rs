//! One-call conversions from source text to a backend.

use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;
use crate::output::{HtmlConfig, HtmlOutput, LatexConfig, LatexOutput};
use crate::render::Renderer;
use crate::source::parse_document;
use crate::walk::walk_document;

/// Output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// One XHTML file per chapter.
    #[default]
    Html,
    /// A single LaTeX document.
    Latex,
}

/// What an HTML conversion produced.
#[derive(Debug, Clone, Default)]
pub struct HtmlReport {
    /// Chapter files in document order.
    pub chapters: Vec<PathBuf>,
}

/// Convert a source document into a chapter tree under
/// `config.output_dir`.
///
/// # Example
///
/// ```
/// use folio::{HtmlConfig, convert_html};
/// use folio::render::FixedRenderer;
///
/// let dir = tempfile::TempDir::new().unwrap();
/// let source = r#"<document><chapter name="Intro">Hello</chapter></document>"#;
/// let report = convert_html(source, &HtmlConfig::new(dir.path()), &FixedRenderer::svg()).unwrap();
/// assert!(report.chapters[0].ends_with("chapter01.html"));
/// ```
pub fn convert_html(
    source: &str,
    config: &HtmlConfig,
    renderer: &dyn Renderer,
) -> Result<HtmlReport> {
    let root = parse_document(source)?;
    let mut out = HtmlOutput::new(config.clone(), renderer);
    walk_document(&root, &mut out)?;
    Ok(HtmlReport {
        chapters: out.chapters().to_vec(),
    })
}

/// Convert a source document into LaTeX written to `writer`.
pub fn convert_latex<W: Write>(
    source: &str,
    writer: W,
    config: &LatexConfig,
    renderer: &dyn Renderer,
) -> Result<()> {
    let root = parse_document(source)?;
    let mut out = LatexOutput::new(writer, config.clone(), renderer);
    walk_document(&root, &mut out)
}
