//! Depth-first document walker.
//!
//! Drives an [`OutputState`] from a parsed source tree: each construct opens
//! its context, its children are visited, then the context is finished.

use tracing::info;

use crate::error::{Error, Result};
use crate::output::OutputState;
use crate::source::{Construct, DocumentNode, ROOT_ELEMENT, validate};

/// Coarse percentage-complete reporting over a known node count.
#[derive(Debug, Clone)]
pub struct Progress {
    total: usize,
    done: usize,
    last_percent: Option<u32>,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            done: 0,
            last_percent: None,
        }
    }

    /// Current percentage, rounded up.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        let done = self.done.min(self.total);
        (done * 100).div_ceil(self.total) as u32
    }

    /// Count `nodes` as processed, logging when the percentage changes.
    pub fn advance(&mut self, nodes: usize) {
        self.done += nodes;
        let percent = self.percent();
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            info!("{percent}% finished");
        }
    }
}

/// Walk a whole document: check the root, validate every construct, then
/// build the output.
///
/// Validation runs before the root context is created, so unknown elements
/// and missing attributes never leave partial output behind.
pub fn walk_document<S: OutputState + ?Sized>(root: &DocumentNode, out: &mut S) -> Result<()> {
    match root.name() {
        Some(ROOT_ELEMENT) => {}
        Some(other) => {
            return Err(Error::MalformedSource(format!(
                "root element must be <{ROOT_ELEMENT}>, found <{other}>"
            )));
        }
        None => {
            return Err(Error::MalformedSource("root is not an element".to_string()));
        }
    }
    validate(root)?;

    let mut walker = Walker {
        progress: Progress::new(root.count()),
    };
    out.create_root()?;
    walker.progress.advance(1);
    for child in root.children() {
        walker.visit(child, out)?;
    }
    out.finish()
}

struct Walker {
    progress: Progress,
}

impl Walker {
    fn visit<S: OutputState + ?Sized>(&mut self, node: &DocumentNode, out: &mut S) -> Result<()> {
        let Some(construct) = Construct::classify(node)? else {
            self.progress.advance(1);
            if let DocumentNode::Text { content } = node {
                out.put_text(content)?;
            }
            return Ok(());
        };

        dispatch(construct, out)?;
        if !construct.opens_context() {
            // Content of leaf constructs is ignored.
            self.progress.advance(node.count());
            return Ok(());
        }

        self.progress.advance(1);
        for child in node.children() {
            self.visit(child, out)?;
        }
        out.finish()
    }
}

/// Invoke the builder operation for a construct.
fn dispatch<S: OutputState + ?Sized>(construct: Construct<'_>, out: &mut S) -> Result<()> {
    match construct {
        Construct::Bold => out.bold(),
        Construct::Math => out.math(),
        Construct::Equation { label } => out.equation(label),
        Construct::Figure { label } => out.figure(label),
        Construct::Image { src } => out.image(src),
        Construct::Caption => out.caption(),
        Construct::Plot { label } => out.plot(label),
        Construct::Newline => out.newline(),
        Construct::NewParagraph => out.new_paragraph(),
        Construct::Table => out.table(),
        Construct::TableRow => out.table_row(),
        Construct::TableCell => out.table_cell(),
        Construct::Reference { label } => out.reference(label),
        Construct::Cite { id } => out.cite(id),
        Construct::Section { name, level, label } => out.section(name, level, label),
        Construct::Chapter { name, label } => out.chapter(name, label),
    }
}
