//! HTML backend: one XHTML file per chapter.
//!
//! Each chapter is built as a [`ChapterDom`] while its context is open and
//! written to `chapterNN.html` when the chapter finishes. Inline math that
//! resolves to styled text becomes `<i>`/`<b>`/`<sup>`/`<sub>` markup;
//! everything else is rasterized to SVG under `images/`.

mod dom;
mod normalize;

pub use dom::{ChapterDom, NodeData, NodeId, escape_xml};
pub use normalize::{Normalizer, XhtmlNormalizer};

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::math::{MathRun, Resolution, SymbolTable, resolve};
use crate::render::{AssetKind, AssetStore, ImageFormat, Renderer, rasterize};

use super::{ContextKind, NO_CONTEXT, OutputState, is_blank};

/// Directory under the output directory receiving rendered images.
pub const IMAGE_DIR: &str = "images";

/// Deepest supported section level (rendered as `h6`).
pub const MAX_SECTION_LEVEL: u32 = 4;

/// HTML backend configuration.
#[derive(Debug, Clone)]
pub struct HtmlConfig {
    /// Directory receiving chapter files and the `images/` directory.
    pub output_dir: PathBuf,
    /// Remove an existing output directory before writing.
    pub clean: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("html"),
            clean: false,
        }
    }
}

impl HtmlConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    /// Path of chapter file `number` (counted from 1).
    pub fn chapter_path(&self, number: u32) -> PathBuf {
        self.output_dir.join(format!("chapter{number:02}.html"))
    }
}

/// An open context together with the node its content goes into.
#[derive(Debug)]
enum HtmlContext {
    Root,
    Chapter { body: NodeId },
    Section { node: NodeId },
    Bold { node: NodeId },
    Table { node: NodeId },
    Row { node: NodeId },
    Cell { node: NodeId },
    Figure { node: NodeId },
    Caption { node: NodeId },
    Math { buf: String, anchor: NodeId },
    Equation { buf: String, label: Option<String>, anchor: NodeId },
    Plot { buf: String, label: Option<String>, anchor: NodeId },
}

impl HtmlContext {
    fn kind(&self) -> ContextKind {
        match self {
            HtmlContext::Root => ContextKind::Root,
            HtmlContext::Chapter { .. } => ContextKind::Chapter,
            HtmlContext::Section { .. } => ContextKind::Section,
            HtmlContext::Bold { .. } => ContextKind::Bold,
            HtmlContext::Table { .. } => ContextKind::Table,
            HtmlContext::Row { .. } => ContextKind::Row,
            HtmlContext::Cell { .. } => ContextKind::Cell,
            HtmlContext::Figure { .. } => ContextKind::Figure,
            HtmlContext::Caption { .. } => ContextKind::Caption,
            HtmlContext::Math { .. } => ContextKind::Math,
            HtmlContext::Equation { .. } => ContextKind::Equation,
            HtmlContext::Plot { .. } => ContextKind::Plot,
        }
    }

    /// Node receiving running text and inline constructs.
    fn flow_node(&self) -> Option<NodeId> {
        match self {
            HtmlContext::Chapter { body: node }
            | HtmlContext::Section { node }
            | HtmlContext::Bold { node }
            | HtmlContext::Cell { node }
            | HtmlContext::Caption { node } => Some(*node),
            _ => None,
        }
    }
}

/// The chapter currently being built.
#[derive(Debug)]
struct OpenChapter {
    dom: ChapterDom,
    path: PathBuf,
}

/// HTML output state.
pub struct HtmlOutput<'r> {
    config: HtmlConfig,
    renderer: &'r dyn Renderer,
    symbols: &'r SymbolTable,
    normalizer: Box<dyn Normalizer>,
    assets: AssetStore,
    stack: Vec<HtmlContext>,
    chapter: Option<OpenChapter>,
    chapter_count: u32,
    written: Vec<PathBuf>,
}

impl<'r> HtmlOutput<'r> {
    pub fn new(config: HtmlConfig, renderer: &'r dyn Renderer) -> Self {
        let assets = AssetStore::new(config.output_dir.join(IMAGE_DIR), IMAGE_DIR);
        Self {
            config,
            renderer,
            symbols: SymbolTable::standard(),
            normalizer: Box::new(XhtmlNormalizer),
            assets,
            stack: Vec::new(),
            chapter: None,
            chapter_count: 0,
            written: Vec::new(),
        }
    }

    pub fn with_symbols(mut self, symbols: &'r SymbolTable) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Chapter files written so far, in order.
    pub fn chapters(&self) -> &[PathBuf] {
        &self.written
    }

    fn current(&self) -> Option<&HtmlContext> {
        self.stack.last()
    }

    fn context_name(&self) -> &'static str {
        self.current().map_or(NO_CONTEXT, |c| c.kind().name())
    }

    fn dom(&mut self) -> Result<&mut ChapterDom> {
        self.chapter
            .as_mut()
            .map(|c| &mut c.dom)
            .ok_or_else(|| Error::grammar("content", NO_CONTEXT))
    }

    /// The flow node of the current context, or a grammar error naming
    /// `construct`.
    fn flow(&self, construct: &'static str) -> Result<NodeId> {
        self.current()
            .and_then(HtmlContext::flow_node)
            .ok_or_else(|| Error::grammar(construct, self.context_name()))
    }

    /// Append an element to the current flow node.
    fn append_inline(
        &mut self,
        construct: &'static str,
        name: &'static str,
        attrs: Vec<(&'static str, String)>,
    ) -> Result<NodeId> {
        let parent = self.flow(construct)?;
        Ok(self.dom()?.append_element(parent, name, attrs))
    }

    fn open_chapter(&mut self, name: &str, label: Option<&str>) -> NodeId {
        self.chapter_count += 1;
        let number = self.chapter_count;
        let title = format!("Chapter {number}: {name}");

        let mut dom = ChapterDom::new();
        let html = dom.root();
        let head = dom.append_element(html, "head", vec![]);
        let title_node = dom.append_element(head, "title", vec![]);
        dom.append_text(title_node, &title);
        let body = dom.append_element(html, "body", vec![]);
        let h1 = dom.append_element(body, "h1", label_attr(label));
        dom.append_text(h1, &title);

        debug!("opened chapter {number}: {name}");
        self.chapter = Some(OpenChapter {
            dom,
            path: self.config.chapter_path(number),
        });
        body
    }

    fn close_chapter(&mut self) -> Result<()> {
        let Some(chapter) = self.chapter.take() else {
            return Err(Error::grammar("chapter", NO_CONTEXT));
        };
        let duplicates = chapter.dom.duplicate_ids();
        if !duplicates.is_empty() {
            warn!(
                "{}: anchor id(s) used more than once: {}",
                chapter.path.display(),
                duplicates.join(", ")
            );
        }
        let markup = chapter.dom.serialize();
        let document = self.normalizer.normalize(&markup)?;
        std::fs::write(&chapter.path, document)?;
        info!("wrote {}", chapter.path.display());
        self.written.push(chapter.path);
        Ok(())
    }

    fn finish_math(&mut self, buf: String, anchor: NodeId) -> Result<()> {
        match resolve(&buf, self.symbols) {
            Resolution::Text(runs) => {
                let dom = self.dom()?;
                append_runs(dom, anchor, &runs);
            }
            Resolution::Rasterize(fragment) => {
                let src = rasterize(
                    self.renderer,
                    &self.assets,
                    &fragment,
                    AssetKind::Math,
                    ImageFormat::Svg,
                )?;
                self.dom()?.append_element(
                    anchor,
                    "img",
                    vec![("class", "math".to_string()), ("src", src), ("alt", buf)],
                );
            }
        }
        Ok(())
    }

    /// Rasterize a display block into `<p id=label><img/></p>`.
    fn finish_block(
        &mut self,
        buf: &str,
        kind: AssetKind,
        label: Option<String>,
        anchor: NodeId,
    ) -> Result<()> {
        let src = rasterize(self.renderer, &self.assets, buf, kind, ImageFormat::Svg)?;
        let dom = self.dom()?;
        let p = dom.append_element(anchor, "p", label_attr(label.as_deref()));
        dom.append_element(p, "img", vec![("src", src), ("alt", String::new())]);
        Ok(())
    }

    fn warn_unfinished(&self, when: &str) {
        // The root itself is expected to stay open until finish.
        let unfinished = self.stack.len().saturating_sub(1);
        if unfinished > 0 {
            let innermost = self.context_name();
            warn!("{when} with {unfinished} unfinished context(s), innermost is {innermost}");
        }
    }
}

impl OutputState for HtmlOutput<'_> {
    fn create_root(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            self.warn_unfinished("replacing document");
            self.stack.clear();
            self.chapter = None;
        }

        let dir = &self.config.output_dir;
        if self.config.clean && dir.exists() {
            info!("removing {}", dir.display());
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;

        self.chapter_count = 0;
        self.written.clear();
        self.stack.push(HtmlContext::Root);
        Ok(())
    }

    fn put_text(&mut self, text: &str) -> Result<()> {
        match self.stack.last_mut() {
            Some(
                HtmlContext::Math { buf, .. }
                | HtmlContext::Equation { buf, .. }
                | HtmlContext::Plot { buf, .. },
            ) => {
                buf.push_str(text);
                Ok(())
            }
            Some(
                HtmlContext::Root
                | HtmlContext::Table { .. }
                | HtmlContext::Row { .. }
                | HtmlContext::Figure { .. },
            ) if is_blank(text) => Ok(()),
            _ => {
                let parent = self.flow("text")?;
                self.dom()?.append_text(parent, text);
                Ok(())
            }
        }
    }

    fn newline(&mut self) -> Result<()> {
        self.append_inline("newline", "br", vec![])?;
        Ok(())
    }

    fn new_paragraph(&mut self) -> Result<()> {
        self.append_inline("new paragraph", "p", vec![])?;
        Ok(())
    }

    fn bold(&mut self) -> Result<()> {
        let node = self.append_inline("bold", "b", vec![])?;
        self.stack.push(HtmlContext::Bold { node });
        Ok(())
    }

    fn math(&mut self) -> Result<()> {
        let anchor = self.flow("math")?;
        self.stack.push(HtmlContext::Math {
            buf: String::new(),
            anchor,
        });
        Ok(())
    }

    fn equation(&mut self, label: Option<&str>) -> Result<()> {
        let anchor = self.flow("equation")?;
        self.stack.push(HtmlContext::Equation {
            buf: String::new(),
            label: label.map(str::to_string),
            anchor,
        });
        Ok(())
    }

    fn reference(&mut self, label: &str) -> Result<()> {
        let a = self.append_inline("reference", "a", vec![("href", format!("#{label}"))])?;
        self.dom()?.append_text(a, label);
        Ok(())
    }

    fn cite(&mut self, id: &str) -> Result<()> {
        let a = self.append_inline(
            "citation",
            "a",
            vec![("href", format!("bibliography.html#{id}"))],
        )?;
        self.dom()?.append_text(a, &format!("[{id}]"));
        Ok(())
    }

    fn section(&mut self, name: &str, level: u32, label: Option<&str>) -> Result<()> {
        let parent = match self.current() {
            Some(HtmlContext::Chapter { body }) => *body,
            Some(HtmlContext::Section { node }) => *node,
            _ => return Err(Error::grammar("section", self.context_name())),
        };
        if level > MAX_SECTION_LEVEL {
            return Err(Error::grammar("a section deeper than h6", self.context_name()));
        }

        let heading = match level {
            0 => "h2",
            1 => "h3",
            2 => "h4",
            3 => "h5",
            _ => "h6",
        };
        let dom = self.dom()?;
        let h = dom.append_element(parent, heading, label_attr(label));
        dom.append_text(h, name);
        let node = dom.append_element(parent, "div", vec![("id", section_anchor(name))]);
        self.stack.push(HtmlContext::Section { node });
        Ok(())
    }

    fn chapter(&mut self, name: &str, label: Option<&str>) -> Result<()> {
        if !matches!(self.current(), Some(HtmlContext::Root)) {
            return Err(Error::grammar("chapter", self.context_name()));
        }
        let body = self.open_chapter(name, label);
        self.stack.push(HtmlContext::Chapter { body });
        Ok(())
    }

    fn plot(&mut self, label: Option<&str>) -> Result<()> {
        let anchor = self.flow("plot")?;
        self.stack.push(HtmlContext::Plot {
            buf: String::new(),
            label: label.map(str::to_string),
            anchor,
        });
        Ok(())
    }

    fn table(&mut self) -> Result<()> {
        let node = self.append_inline("table", "table", vec![])?;
        self.stack.push(HtmlContext::Table { node });
        Ok(())
    }

    fn table_row(&mut self) -> Result<()> {
        let Some(HtmlContext::Table { node: table }) = self.current() else {
            return Err(Error::grammar("table row", self.context_name()));
        };
        let table = *table;
        let node = self.dom()?.append_element(table, "tr", vec![]);
        self.stack.push(HtmlContext::Row { node });
        Ok(())
    }

    fn table_cell(&mut self) -> Result<()> {
        let Some(HtmlContext::Row { node: row }) = self.current() else {
            return Err(Error::grammar("table cell", self.context_name()));
        };
        let row = *row;
        let node = self.dom()?.append_element(row, "td", vec![]);
        self.stack.push(HtmlContext::Cell { node });
        Ok(())
    }

    fn figure(&mut self, label: Option<&str>) -> Result<()> {
        let mut attrs = vec![("class", "figure".to_string())];
        attrs.extend(label_attr(label));
        let node = self.append_inline("figure", "div", attrs)?;
        self.stack.push(HtmlContext::Figure { node });
        Ok(())
    }

    fn caption(&mut self) -> Result<()> {
        let Some(HtmlContext::Figure { node: figure }) = self.current() else {
            return Err(Error::grammar("caption", self.context_name()));
        };
        let figure = *figure;
        let node =
            self.dom()?
                .append_element(figure, "p", vec![("class", "caption".to_string())]);
        self.stack.push(HtmlContext::Caption { node });
        Ok(())
    }

    fn image(&mut self, src: &str) -> Result<()> {
        let parent = match self.current() {
            Some(HtmlContext::Figure { node }) => *node,
            _ => self.flow("image")?,
        };
        self.dom()?.append_element(
            parent,
            "img",
            vec![("src", src.to_string()), ("alt", String::new())],
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let Some(context) = self.stack.pop() else {
            return Err(Error::grammar("finish", NO_CONTEXT));
        };
        match context {
            HtmlContext::Root => {
                info!("{} chapter(s) written", self.written.len());
                Ok(())
            }
            HtmlContext::Chapter { .. } => self.close_chapter(),
            HtmlContext::Math { buf, anchor } => self.finish_math(buf, anchor),
            HtmlContext::Equation { buf, label, anchor } => {
                self.finish_block(&buf, AssetKind::Equation, label, anchor)
            }
            HtmlContext::Plot { buf, label, anchor } => {
                self.finish_block(&buf, AssetKind::Plot, label, anchor)
            }
            HtmlContext::Section { .. }
            | HtmlContext::Bold { .. }
            | HtmlContext::Table { .. }
            | HtmlContext::Row { .. }
            | HtmlContext::Cell { .. }
            | HtmlContext::Figure { .. }
            | HtmlContext::Caption { .. } => Ok(()),
        }
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Drop for HtmlOutput<'_> {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            warn!(
                "HTML output dropped with {} open context(s), innermost is {}",
                self.stack.len(),
                self.context_name()
            );
        }
    }
}

fn label_attr(label: Option<&str>) -> Vec<(&'static str, String)> {
    label
        .filter(|l| !l.is_empty())
        .map(|l| vec![("id", l.to_string())])
        .unwrap_or_default()
}

/// Anchor id of a section body: `sec:` plus the name with whitespace runs
/// replaced by `-`.
fn section_anchor(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    format!("sec:{}", words.join("-"))
}

/// Append resolved math runs as styled inline markup.
fn append_runs(dom: &mut ChapterDom, parent: NodeId, runs: &[MathRun]) {
    for run in runs {
        match run {
            MathRun::Upright(text) => dom.append_text(parent, text),
            MathRun::Italic(text) => {
                let i = dom.append_element(parent, "i", vec![]);
                dom.append_text(i, text);
            }
            MathRun::Bold(text) => {
                let b = dom.append_element(parent, "b", vec![]);
                dom.append_text(b, text);
            }
            MathRun::Superscript(inner) => {
                let sup = dom.append_element(parent, "sup", vec![]);
                append_runs(dom, sup, inner);
            }
            MathRun::Subscript(inner) => {
                let sub = dom.append_element(parent, "sub", vec![]);
                append_runs(dom, sub, inner);
            }
        }
    }
}
