//! LaTeX backend: a single document streamed to a writer.
//!
//! Output goes straight to the writer except inside table cells, whose
//! content is buffered until the enclosing table is complete.

use std::io::Write;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::render::{AssetKind, AssetStore, ImageFormat, Renderer, rasterize};

use super::{ContextKind, NO_CONTEXT, OutputState, is_blank};

/// Deepest supported section level (`\subsubsection`).
pub const MAX_SECTION_LEVEL: u32 = 2;

/// Document preamble written by the root context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Preamble {
    /// Book class with Unicode fonts and math, ready for `xelatex`.
    #[default]
    Full,
    /// The `minimal` class with just the font and graphics packages the body
    /// relies on.
    Minimal,
}

impl Preamble {
    fn text(self) -> &'static str {
        match self {
            Preamble::Full => concat!(
                "\\documentclass[a4paper,12pt]{book}\n",
                "\\usepackage{fontspec}\n",
                "\\usepackage{amsmath}\n",
                "\\usepackage{unicode-math}\n",
                "\\usepackage{graphicx}\n",
                "\\usepackage{fullpage}\n",
                "\\setmathfont{STIX Two Math}\n",
                "\\begin{document}\n",
            ),
            Preamble::Minimal => concat!(
                "\\documentclass{minimal}\n",
                "\\usepackage{fontspec}\n",
                "\\usepackage{unicode-math}\n",
                "\\usepackage{graphicx}\n",
                "\\setmathfont{STIX Two Math}\n",
                "\\begin{document}\n",
            ),
        }
    }
}

/// LaTeX backend configuration.
#[derive(Debug, Clone)]
pub struct LatexConfig {
    pub preamble: Preamble,
    /// Directory receiving rendered plot images.
    pub image_dir: PathBuf,
    /// How the document refers to `image_dir`.
    pub image_href: String,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            preamble: Preamble::Full,
            image_dir: PathBuf::from("images"),
            image_href: "images".to_string(),
        }
    }
}

#[derive(Debug)]
enum LatexContext {
    Root,
    Chapter,
    Section,
    Bold,
    Math { buf: String },
    Equation { buf: String, label: Option<String> },
    Plot { buf: String, label: Option<String> },
    Table { rows: Vec<Vec<String>> },
    Row { cells: Vec<String> },
    Cell { buf: String },
    Figure { label: Option<String> },
    Caption,
}

impl LatexContext {
    fn kind(&self) -> ContextKind {
        match self {
            LatexContext::Root => ContextKind::Root,
            LatexContext::Chapter => ContextKind::Chapter,
            LatexContext::Section => ContextKind::Section,
            LatexContext::Bold => ContextKind::Bold,
            LatexContext::Math { .. } => ContextKind::Math,
            LatexContext::Equation { .. } => ContextKind::Equation,
            LatexContext::Plot { .. } => ContextKind::Plot,
            LatexContext::Table { .. } => ContextKind::Table,
            LatexContext::Row { .. } => ContextKind::Row,
            LatexContext::Cell { .. } => ContextKind::Cell,
            LatexContext::Figure { .. } => ContextKind::Figure,
            LatexContext::Caption => ContextKind::Caption,
        }
    }

    /// Contexts accepting running text and inline constructs.
    fn is_flow(&self) -> bool {
        matches!(
            self,
            LatexContext::Chapter
                | LatexContext::Section
                | LatexContext::Bold
                | LatexContext::Cell { .. }
                | LatexContext::Caption
        )
    }

    /// Contexts that may hold chapters and sections.
    fn is_structural(&self) -> bool {
        matches!(
            self,
            LatexContext::Root | LatexContext::Chapter | LatexContext::Section
        )
    }
}

/// LaTeX output state writing to `W`.
pub struct LatexOutput<'r, W: Write> {
    out: W,
    config: LatexConfig,
    renderer: &'r dyn Renderer,
    assets: AssetStore,
    stack: Vec<LatexContext>,
}

impl<'r, W: Write> LatexOutput<'r, W> {
    pub fn new(out: W, config: LatexConfig, renderer: &'r dyn Renderer) -> Self {
        let assets = AssetStore::new(config.image_dir.clone(), config.image_href.clone());
        Self {
            out,
            config,
            renderer,
            assets,
            stack: Vec::new(),
        }
    }

    fn current(&self) -> Option<&LatexContext> {
        self.stack.last()
    }

    fn context_name(&self) -> &'static str {
        self.current().map_or(NO_CONTEXT, |c| c.kind().name())
    }

    /// Fail with a grammar error unless the current context takes inline
    /// content.
    fn require_flow(&self, construct: &'static str) -> Result<()> {
        match self.current() {
            Some(c) if c.is_flow() => Ok(()),
            _ => Err(Error::grammar(construct, self.context_name())),
        }
    }

    /// Write output, into the innermost table cell if there is one.
    fn emit(&mut self, text: &str) -> Result<()> {
        let cell = self.stack.iter_mut().rev().find_map(|c| match c {
            LatexContext::Cell { buf } => Some(buf),
            _ => None,
        });
        match cell {
            Some(buf) => buf.push_str(text),
            None => self.out.write_all(text.as_bytes())?,
        }
        Ok(())
    }

    fn in_cell(&self) -> bool {
        self.stack.iter().any(|c| matches!(c, LatexContext::Cell { .. }))
    }

    fn emit_label(&mut self, label: Option<&str>) -> Result<()> {
        if let Some(label) = label.filter(|l| !l.is_empty()) {
            self.emit(&format!("\\label{{{label}}}\n"))?;
        }
        Ok(())
    }

    fn finish_plot(&mut self, buf: &str, label: Option<String>) -> Result<()> {
        let href = rasterize(
            self.renderer,
            &self.assets,
            buf,
            AssetKind::Plot,
            ImageFormat::Pdf,
        )?;
        self.emit("\\begin{figure}[htbp]\n\\centering\n")?;
        self.emit(&format!("\\includegraphics[width=0.7\\textwidth]{{{href}}}\n"))?;
        self.emit_label(label.as_deref())?;
        self.emit("\\end{figure}\n")
    }

    fn finish_table(&mut self, rows: Vec<Vec<String>>) -> Result<()> {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0).max(1);
        let mut table = format!("\\begin{{tabular}}{{|{}}}\n\\hline\n", "l|".repeat(columns));
        for row in &rows {
            table.push_str(&row.join(" & "));
            table.push_str(" \\\\ \\hline\n");
        }
        table.push_str("\\end{tabular}\n");
        self.emit(&table)
    }

    fn warn_unfinished(&self, when: &str) {
        let unfinished = self.stack.len().saturating_sub(1);
        if unfinished > 0 {
            let innermost = self.context_name();
            warn!("{when} with {unfinished} unfinished context(s), innermost is {innermost}");
        }
    }
}

impl<W: Write> OutputState for LatexOutput<'_, W> {
    fn create_root(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            self.warn_unfinished("replacing document");
            self.stack.clear();
        }
        let preamble = self.config.preamble.text();
        self.out.write_all(preamble.as_bytes())?;
        self.stack.push(LatexContext::Root);
        Ok(())
    }

    fn put_text(&mut self, text: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(
                LatexContext::Math { buf }
                | LatexContext::Equation { buf, .. }
                | LatexContext::Plot { buf, .. },
            ) => {
                buf.push_str(text);
                Ok(())
            }
            Some(
                LatexContext::Root
                | LatexContext::Table { .. }
                | LatexContext::Row { .. }
                | LatexContext::Figure { .. },
            ) if is_blank(text) => Ok(()),
            _ => {
                self.require_flow("text")?;
                self.emit(&escape_latex(text))
            }
        }
    }

    fn newline(&mut self) -> Result<()> {
        self.require_flow("newline")?;
        // `\\` would end the tabular row.
        if self.in_cell() {
            return Err(Error::grammar("newline", ContextKind::Cell.name()));
        }
        self.emit("\\\\\n")
    }

    fn new_paragraph(&mut self) -> Result<()> {
        self.require_flow("new paragraph")?;
        self.emit("\n\n")
    }

    fn bold(&mut self) -> Result<()> {
        self.require_flow("bold")?;
        self.emit("\\textbf{")?;
        self.stack.push(LatexContext::Bold);
        Ok(())
    }

    fn math(&mut self) -> Result<()> {
        self.require_flow("math")?;
        self.stack.push(LatexContext::Math { buf: String::new() });
        Ok(())
    }

    fn equation(&mut self, label: Option<&str>) -> Result<()> {
        self.require_flow("equation")?;
        self.stack.push(LatexContext::Equation {
            buf: String::new(),
            label: label.map(str::to_string),
        });
        Ok(())
    }

    fn reference(&mut self, label: &str) -> Result<()> {
        self.require_flow("reference")?;
        self.emit(&format!("\\ref{{{label}}}"))
    }

    fn cite(&mut self, id: &str) -> Result<()> {
        self.require_flow("citation")?;
        self.emit(&format!("\\cite{{{id}}}"))
    }

    fn section(&mut self, name: &str, level: u32, label: Option<&str>) -> Result<()> {
        if !self.current().is_some_and(LatexContext::is_structural) {
            return Err(Error::grammar("section", self.context_name()));
        }
        if level > MAX_SECTION_LEVEL {
            return Err(Error::grammar(
                "a section deeper than subsubsection",
                self.context_name(),
            ));
        }
        let command = format!(
            "\\{}section{{{}}}\n",
            "sub".repeat(level as usize),
            escape_latex(name)
        );
        self.emit(&command)?;
        self.emit_label(label)?;
        self.stack.push(LatexContext::Section);
        Ok(())
    }

    fn chapter(&mut self, name: &str, label: Option<&str>) -> Result<()> {
        if !self.current().is_some_and(LatexContext::is_structural) {
            return Err(Error::grammar("chapter", self.context_name()));
        }
        self.emit(&format!("\\chapter{{{}}}\n", escape_latex(name)))?;
        self.emit_label(label)?;
        self.stack.push(LatexContext::Chapter);
        Ok(())
    }

    fn plot(&mut self, label: Option<&str>) -> Result<()> {
        self.require_flow("plot")?;
        self.stack.push(LatexContext::Plot {
            buf: String::new(),
            label: label.map(str::to_string),
        });
        Ok(())
    }

    fn table(&mut self) -> Result<()> {
        self.require_flow("table")?;
        self.stack.push(LatexContext::Table { rows: Vec::new() });
        Ok(())
    }

    fn table_row(&mut self) -> Result<()> {
        if !matches!(self.current(), Some(LatexContext::Table { .. })) {
            return Err(Error::grammar("table row", self.context_name()));
        }
        self.stack.push(LatexContext::Row { cells: Vec::new() });
        Ok(())
    }

    fn table_cell(&mut self) -> Result<()> {
        if !matches!(self.current(), Some(LatexContext::Row { .. })) {
            return Err(Error::grammar("table cell", self.context_name()));
        }
        self.stack.push(LatexContext::Cell { buf: String::new() });
        Ok(())
    }

    fn figure(&mut self, label: Option<&str>) -> Result<()> {
        self.require_flow("figure")?;
        self.emit("\\begin{figure}[htbp]\n\\centering\n")?;
        self.stack.push(LatexContext::Figure {
            label: label.map(str::to_string),
        });
        Ok(())
    }

    fn caption(&mut self) -> Result<()> {
        if !matches!(self.current(), Some(LatexContext::Figure { .. })) {
            return Err(Error::grammar("caption", self.context_name()));
        }
        self.emit("\\caption{")?;
        self.stack.push(LatexContext::Caption);
        Ok(())
    }

    fn image(&mut self, src: &str) -> Result<()> {
        if !matches!(self.current(), Some(LatexContext::Figure { .. })) {
            self.require_flow("image")?;
        }
        self.emit(&format!("\\includegraphics[width=0.7\\textwidth]{{{src}}}\n"))
    }

    fn finish(&mut self) -> Result<()> {
        let Some(context) = self.stack.pop() else {
            return Err(Error::grammar("finish", NO_CONTEXT));
        };
        match context {
            LatexContext::Root => {
                self.out.write_all(b"\\end{document}\n")?;
                self.out.flush()?;
                debug!("LaTeX document complete");
                Ok(())
            }
            LatexContext::Chapter | LatexContext::Section => Ok(()),
            LatexContext::Bold => self.emit("}"),
            LatexContext::Math { buf } => self.emit(&format!("${buf}$")),
            LatexContext::Equation { buf, label } => {
                self.emit("\\begin{equation}\n")?;
                self.emit_label(label.as_deref())?;
                self.emit(buf.replace('\n', " ").trim())?;
                self.emit("\n\\end{equation}\n")
            }
            LatexContext::Plot { buf, label } => self.finish_plot(&buf, label),
            LatexContext::Table { rows } => self.finish_table(rows),
            LatexContext::Row { cells } => match self.stack.last_mut() {
                Some(LatexContext::Table { rows }) => {
                    rows.push(cells);
                    Ok(())
                }
                _ => Err(Error::grammar("table row", self.context_name())),
            },
            LatexContext::Cell { buf } => match self.stack.last_mut() {
                Some(LatexContext::Row { cells }) => {
                    cells.push(buf.trim().to_string());
                    Ok(())
                }
                _ => Err(Error::grammar("table cell", self.context_name())),
            },
            LatexContext::Figure { label } => {
                self.emit_label(label.as_deref())?;
                self.emit("\\end{figure}\n")
            }
            LatexContext::Caption => self.emit("}\n"),
        }
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl<W: Write> Drop for LatexOutput<'_, W> {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            warn!(
                "LaTeX output dropped with {} open context(s), innermost is {}",
                self.stack.len(),
                self.context_name()
            );
        }
    }
}

/// Escape characters with special meaning in LaTeX text mode.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '$' | '&' | '#' | '%' | '_' => {
                out.push('\\');
                out.push(c);
            }
            '^' => out.push_str("\\^{}"),
            '~' => out.push_str("\\~{}"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::FixedRenderer;
    use tempfile::TempDir;

    fn minimal() -> LatexConfig {
        LatexConfig {
            preamble: Preamble::Minimal,
            ..LatexConfig::default()
        }
    }

    /// Run `build` against a fresh minimal document and return the output.
    fn render(build: impl FnOnce(&mut LatexOutput<'_, &mut Vec<u8>>)) -> String {
        let renderer = FixedRenderer::new(&b"%PDF-1.5"[..]);
        let mut buf = Vec::new();
        {
            let mut out = LatexOutput::new(&mut buf, minimal(), &renderer);
            out.create_root().unwrap();
            build(&mut out);
            out.finish().unwrap();
        }
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_minimal_document_frame() {
        let tex = render(|_| {});
        assert!(tex.starts_with("\\documentclass{minimal}\n\\usepackage{fontspec}\n"));
        assert!(tex.contains("\\usepackage{graphicx}\n"));
        assert!(tex.ends_with("\\setmathfont{STIX Two Math}\n\\begin{document}\n\\end{document}\n"));
    }

    #[test]
    fn test_full_preamble() {
        let renderer = FixedRenderer::svg();
        let mut buf = Vec::new();
        {
            let mut out = LatexOutput::new(&mut buf, LatexConfig::default(), &renderer);
            out.create_root().unwrap();
            out.finish().unwrap();
        }
        let tex = String::from_utf8(buf).unwrap();
        assert!(tex.starts_with("\\documentclass[a4paper,12pt]{book}\n"));
        assert!(tex.contains("\\usepackage{unicode-math}"));
        assert!(tex.contains("\\usepackage{graphicx}"));
    }

    #[test]
    fn test_sections_and_labels() {
        let tex = render(|out| {
            out.chapter("Intro", Some("ch1")).unwrap();
            out.section("A", 0, Some("s1")).unwrap();
            out.section("B", 1, None).unwrap();
            out.section("C", 2, None).unwrap();
            for _ in 0..4 {
                out.finish().unwrap();
            }
        });
        assert!(tex.contains("\\chapter{Intro}\n\\label{ch1}\n"));
        assert!(tex.contains("\\section{A}\n\\label{s1}\n"));
        assert!(tex.contains("\\subsection{B}\n"));
        assert!(tex.contains("\\subsubsection{C}\n"));
    }

    #[test]
    fn test_nested_chapters_allowed() {
        let tex = render(|out| {
            out.chapter("Outer", None).unwrap();
            out.chapter("Inner", None).unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
        });
        assert!(tex.contains("\\chapter{Outer}\n\\chapter{Inner}\n"));
    }

    #[test]
    fn test_section_too_deep() {
        render(|out| {
            out.chapter("C", None).unwrap();
            assert!(matches!(
                out.section("S", 3, None),
                Err(Error::StructuralGrammar { .. })
            ));
            out.finish().unwrap();
        });
    }

    #[test]
    fn test_inline_constructs() {
        let tex = render(|out| {
            out.chapter("C", None).unwrap();
            out.put_text("50% of a_b ").unwrap();
            out.bold().unwrap();
            out.put_text("strong").unwrap();
            out.finish().unwrap();
            out.newline().unwrap();
            out.math().unwrap();
            out.put_text("\\frac{1}{2}").unwrap();
            out.finish().unwrap();
            out.new_paragraph().unwrap();
            out.reference("eq1").unwrap();
            out.cite("knuth").unwrap();
            out.finish().unwrap();
        });
        assert!(tex.contains("50\\% of a\\_b \\textbf{strong}\\\\\n$\\frac{1}{2}$\n\n\\ref{eq1}\\cite{knuth}"));
    }

    #[test]
    fn test_equation_with_label() {
        let tex = render(|out| {
            out.chapter("C", None).unwrap();
            out.equation(Some("eq1")).unwrap();
            out.put_text("\n  a = b\n  + c\n").unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
        });
        assert!(tex.contains("\\begin{equation}\n\\label{eq1}\na = b   + c\n\\end{equation}\n"));
    }

    #[test]
    fn test_table_buffers_cells() {
        let tex = render(|out| {
            out.chapter("C", None).unwrap();
            out.table().unwrap();
            for row in [["a", "b"], ["c", "d"]] {
                out.table_row().unwrap();
                for cell in row {
                    out.table_cell().unwrap();
                    out.put_text(cell).unwrap();
                    out.finish().unwrap();
                }
                out.finish().unwrap();
            }
            out.finish().unwrap();
            out.finish().unwrap();
        });
        assert!(tex.contains(
            "\\begin{tabular}{|l|l|}\n\\hline\na & b \\\\ \\hline\nc & d \\\\ \\hline\n\\end{tabular}\n"
        ));
    }

    #[test]
    fn test_newline_inside_cell_rejected() {
        let tex = render(|out| {
            out.chapter("C", None).unwrap();
            out.table().unwrap();
            out.table_row().unwrap();
            out.table_cell().unwrap();
            out.put_text("a").unwrap();
            let err = out.newline().unwrap_err();
            assert!(matches!(
                err,
                Error::StructuralGrammar {
                    construct: "newline",
                    context: "table cell"
                }
            ));
            out.bold().unwrap();
            assert!(out.newline().is_err());
            out.put_text("b").unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
            out.table_cell().unwrap();
            out.put_text("c").unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
        });
        assert!(tex.contains("\\hline\na\\textbf{b} & c \\\\ \\hline\n\\end{tabular}"));
        assert!(!tex.contains("a\\\\"));
    }

    #[test]
    fn test_bold_inside_cell_stays_in_cell() {
        let tex = render(|out| {
            out.chapter("C", None).unwrap();
            out.table().unwrap();
            out.table_row().unwrap();
            out.table_cell().unwrap();
            out.bold().unwrap();
            out.put_text("x").unwrap();
            out.finish().unwrap();
            for _ in 0..4 {
                out.finish().unwrap();
            }
        });
        assert!(tex.contains("\\hline\n\\textbf{x} \\\\ \\hline\n"));
    }

    #[test]
    fn test_figure_label_follows_caption() {
        let tex = render(|out| {
            out.chapter("C", None).unwrap();
            out.figure(Some("fig1")).unwrap();
            out.image("cat.png").unwrap();
            out.caption().unwrap();
            out.put_text("A cat").unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
        });
        assert!(tex.contains(
            "\\begin{figure}[htbp]\n\\centering\n\\includegraphics[width=0.7\\textwidth]{cat.png}\n\\caption{A cat}\n\\label{fig1}\n\\end{figure}\n"
        ));
    }

    #[test]
    fn test_plot_rendered_as_pdf() {
        let tmp = TempDir::new().unwrap();
        let renderer = FixedRenderer::new(&b"%PDF-1.5"[..]);
        let config = LatexConfig {
            preamble: Preamble::Minimal,
            image_dir: tmp.path().join("images"),
            image_href: "images".to_string(),
        };
        let mut buf = Vec::new();
        {
            let mut out = LatexOutput::new(&mut buf, config, &renderer);
            out.create_root().unwrap();
            out.chapter("C", None).unwrap();
            out.plot(Some("p1")).unwrap();
            out.put_text("\\addplot {x};").unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
        }
        let tex = String::from_utf8(buf).unwrap();

        let requests = renderer.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].format, ImageFormat::Pdf);
        assert_eq!(requests[0].kind, AssetKind::Plot);
        assert!(tex.contains("\\includegraphics[width=0.7\\textwidth]{images/"));
        assert!(tex.contains(".pdf}\n\\label{p1}\n\\end{figure}"));
        assert_eq!(std::fs::read_dir(tmp.path().join("images")).unwrap().count(), 1);
    }

    #[test]
    fn test_grammar_violations() {
        render(|out| {
            assert!(matches!(
                out.bold(),
                Err(Error::StructuralGrammar {
                    construct: "bold",
                    context: "the document root"
                })
            ));
            out.chapter("C", None).unwrap();
            out.math().unwrap();
            assert!(out.bold().is_err());
            assert!(out.section("S", 0, None).is_err());
            out.finish().unwrap();
            out.table().unwrap();
            assert!(out.put_text("loose").is_err());
            out.put_text("  \n").unwrap();
            out.finish().unwrap();
            out.finish().unwrap();
        });
    }

    #[test]
    fn test_escape_latex() {
        assert_eq!(escape_latex("a & b"), "a \\& b");
        assert_eq!(escape_latex("{x}"), "\\{x\\}");
        assert_eq!(escape_latex("\\"), "\\textbackslash{}");
        assert_eq!(escape_latex("~^"), "\\~{}\\^{}");
        assert_eq!(escape_latex("plain"), "plain");
    }
}
