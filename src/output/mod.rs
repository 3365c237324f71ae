//! Output state machines.
//!
//! Both backends implement [`OutputState`]: a stack of open contexts where
//! constructor operations (`bold`, `section`, ...) push a context and
//! [`OutputState::finish`] pops the innermost one, appending its output to
//! the enclosing context. Each backend decides per context which operations
//! are legal; anything else fails with [`Error::StructuralGrammar`].
//!
//! [`Error::StructuralGrammar`]: crate::Error::StructuralGrammar

pub mod html;
pub mod latex;

pub use html::{HtmlConfig, HtmlOutput, Normalizer, XhtmlNormalizer};
pub use latex::{LatexConfig, LatexOutput, Preamble};

use crate::error::Result;

/// The kinds of document context, shared by both backends for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    Root,
    Chapter,
    Section,
    Bold,
    Math,
    Equation,
    Plot,
    Table,
    Row,
    Cell,
    Figure,
    Caption,
}

impl ContextKind {
    /// Human-readable context name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ContextKind::Root => "the document root",
            ContextKind::Chapter => "chapter",
            ContextKind::Section => "section",
            ContextKind::Bold => "bold",
            ContextKind::Math => "math",
            ContextKind::Equation => "equation",
            ContextKind::Plot => "plot",
            ContextKind::Table => "table",
            ContextKind::Row => "table row",
            ContextKind::Cell => "table cell",
            ContextKind::Figure => "figure",
            ContextKind::Caption => "caption",
        }
    }
}

/// Context name reported when an operation arrives with nothing open.
pub(crate) const NO_CONTEXT: &str = "an unopened document";

/// The builder capability set shared by all backends.
///
/// Operations documented as opening a context must be balanced by a call to
/// [`finish`](OutputState::finish) once the construct's content is done.
pub trait OutputState {
    /// Start a new document, discarding any previous one.
    fn create_root(&mut self) -> Result<()>;

    /// Literal text.
    fn put_text(&mut self, text: &str) -> Result<()>;
    fn newline(&mut self) -> Result<()>;
    fn new_paragraph(&mut self) -> Result<()>;

    /// Opens a context.
    fn bold(&mut self) -> Result<()>;
    /// Opens a context.
    fn math(&mut self) -> Result<()>;
    /// Opens a context.
    fn equation(&mut self, label: Option<&str>) -> Result<()>;

    fn reference(&mut self, label: &str) -> Result<()>;
    fn cite(&mut self, id: &str) -> Result<()>;

    /// Opens a context. `level` 0 is a section, 1 a subsection, and so on.
    fn section(&mut self, name: &str, level: u32, label: Option<&str>) -> Result<()>;
    /// Opens a context.
    fn chapter(&mut self, name: &str, label: Option<&str>) -> Result<()>;
    /// Opens a context.
    fn plot(&mut self, label: Option<&str>) -> Result<()>;
    /// Opens a context.
    fn table(&mut self) -> Result<()>;
    /// Opens a context.
    fn table_row(&mut self) -> Result<()>;
    /// Opens a context.
    fn table_cell(&mut self) -> Result<()>;
    /// Opens a context.
    fn figure(&mut self, label: Option<&str>) -> Result<()>;
    /// Opens a context.
    fn caption(&mut self) -> Result<()>;

    fn image(&mut self, src: &str) -> Result<()>;

    /// Close the innermost open context and emit its output.
    fn finish(&mut self) -> Result<()>;

    /// Number of open contexts, including the root.
    fn depth(&self) -> usize;
}

/// Whitespace as found between structural elements.
pub(crate) fn is_blank(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\r' | '\n' | '\t'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank(" \n\t\r "));
        assert!(!is_blank(" x "));
        assert!(!is_blank("\u{a0}"));
    }

    #[test]
    fn test_context_names_are_distinct() {
        let kinds = [
            ContextKind::Root,
            ContextKind::Chapter,
            ContextKind::Section,
            ContextKind::Bold,
            ContextKind::Math,
            ContextKind::Equation,
            ContextKind::Plot,
            ContextKind::Table,
            ContextKind::Row,
            ContextKind::Cell,
            ContextKind::Figure,
            ContextKind::Caption,
        ];
        let mut names: Vec<_> = kinds.iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), kinds.len());
    }
}
