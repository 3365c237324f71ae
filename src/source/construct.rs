//! Recognized source elements and their required attributes.

use crate::error::{Error, Result};

use super::DocumentNode;

/// A recognized source element, with the attributes the builder needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct<'a> {
    Bold,
    Math,
    Equation { label: Option<&'a str> },
    Figure { label: Option<&'a str> },
    Image { src: &'a str },
    Caption,
    Plot { label: Option<&'a str> },
    Newline,
    NewParagraph,
    Table,
    TableRow,
    TableCell,
    Reference { label: &'a str },
    Cite { id: &'a str },
    Section {
        name: &'a str,
        level: u32,
        label: Option<&'a str>,
    },
    Chapter {
        name: &'a str,
        label: Option<&'a str>,
    },
}

impl<'a> Construct<'a> {
    /// Classify an element node.
    ///
    /// Fails with [`Error::UnknownConstruct`] for unrecognized names and
    /// [`Error::MissingAttribute`] when a required attribute is absent or
    /// empty. Text nodes are not constructs and yield `Ok(None)`.
    pub fn classify(node: &'a DocumentNode) -> Result<Option<Self>> {
        let Some(name) = node.name() else {
            return Ok(None);
        };
        let label = node.label();

        let construct = match name {
            "b" => Construct::Bold,
            "math" => Construct::Math,
            "equation" => Construct::Equation { label },
            "figure" => Construct::Figure { label },
            "image" => Construct::Image {
                src: required(node, name, "src")?,
            },
            "caption" => Construct::Caption,
            "plot" => Construct::Plot { label },
            "br" => Construct::Newline,
            "np" => Construct::NewParagraph,
            "table" => Construct::Table,
            "tr" => Construct::TableRow,
            "td" => Construct::TableCell,
            "ref" => Construct::Reference {
                label: required(node, name, "label")?,
            },
            "cite" => Construct::Cite {
                id: required(node, name, "id")?,
            },
            "section" | "subsection" | "subsubsection" => Construct::Section {
                name: required(node, name, "name")?,
                level: match name {
                    "subsection" => 1,
                    "subsubsection" => 2,
                    _ => 0,
                },
                label,
            },
            "chapter" => Construct::Chapter {
                name: required(node, name, "name")?,
                label,
            },
            other => return Err(Error::UnknownConstruct(other.to_string())),
        };

        Ok(Some(construct))
    }

    /// Whether the construct opens a nested context that receives the
    /// element's children.
    pub fn opens_context(&self) -> bool {
        !matches!(
            self,
            Construct::Image { .. }
                | Construct::Newline
                | Construct::NewParagraph
                | Construct::Reference { .. }
                | Construct::Cite { .. }
        )
    }
}

fn required<'a>(node: &'a DocumentNode, element: &str, attribute: &'static str) -> Result<&'a str> {
    node.attribute(attribute)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MissingAttribute {
            element: element.to_string(),
            attribute,
        })
}

/// Check a whole subtree before any output is produced.
///
/// Every element below `root` must be a known construct with its required
/// attributes. The root itself is not classified.
pub fn validate(root: &DocumentNode) -> Result<()> {
    let mut stack: Vec<&DocumentNode> = root.children().iter().rev().collect();
    while let Some(node) = stack.pop() {
        Construct::classify(node)?;
        stack.extend(node.children().iter().rev());
    }
    Ok(())
}
