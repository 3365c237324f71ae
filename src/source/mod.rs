//! Source document model and XML parsing.
//!
//! The source is read once into an owned [`DocumentNode`] tree which stays
//! read-only for the rest of the conversion.

mod construct;

pub use construct::{Construct, validate};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};

/// Name every source document's root element must carry.
pub const ROOT_ELEMENT: &str = "document";

/// A node of the parsed source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentNode {
    /// Element with name, attributes (in document order) and children.
    Element {
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<DocumentNode>,
    },
    /// Character data.
    Text { content: String },
}

impl DocumentNode {
    /// Create an element node.
    pub fn element(
        name: impl Into<String>,
        attributes: Vec<(String, String)>,
        children: Vec<DocumentNode>,
    ) -> Self {
        DocumentNode::Element {
            name: name.into(),
            attributes,
            children,
        }
    }

    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        DocumentNode::Text {
            content: content.into(),
        }
    }

    /// Element name, or `None` for text.
    pub fn name(&self) -> Option<&str> {
        match self {
            DocumentNode::Element { name, .. } => Some(name),
            DocumentNode::Text { .. } => None,
        }
    }

    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            DocumentNode::Element { attributes, .. } => attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            DocumentNode::Text { .. } => None,
        }
    }

    /// The `label` attribute, if present and non-empty.
    pub fn label(&self) -> Option<&str> {
        self.attribute("label").filter(|l| !l.is_empty())
    }

    /// Child nodes (empty for text).
    pub fn children(&self) -> &[DocumentNode] {
        match self {
            DocumentNode::Element { children, .. } => children,
            DocumentNode::Text { .. } => &[],
        }
    }

    /// Total number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children().iter().map(DocumentNode::count).sum::<usize>()
    }
}

/// Parse an XML source document into a [`DocumentNode`] tree.
///
/// Whitespace is preserved, comments and processing instructions are
/// skipped. The returned node is the root element; its name is not checked
/// here.
pub fn parse_document(content: &str) -> Result<DocumentNode> {
    let mut reader = Reader::from_str(content);

    // Open elements; the bottom entry collects the root.
    let mut stack: Vec<DocumentNode> = vec![DocumentNode::element("", Vec::new(), Vec::new())];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let node = open_element(&e)?;
                stack.push(node);
            }
            Event::Empty(e) => {
                let node = open_element(&e)?;
                append_child(&mut stack, node)?;
            }
            Event::End(e) => {
                let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if stack.len() < 2 {
                    return Err(Error::MalformedSource(format!(
                        "unexpected closing tag </{end_name}>"
                    )));
                }
                let node = stack.pop().unwrap_or_else(|| DocumentNode::text(""));
                if node.name() != Some(end_name.as_str()) {
                    return Err(Error::MalformedSource(format!(
                        "closing tag </{end_name}> does not match <{}>",
                        node.name().unwrap_or_default()
                    )));
                }
                append_child(&mut stack, node)?;
            }
            Event::Text(e) => {
                let raw = String::from_utf8_lossy(e.as_ref());
                append_text(&mut stack, &raw)?;
            }
            Event::CData(e) => {
                let raw = String::from_utf8_lossy(e.as_ref());
                append_text(&mut stack, &raw)?;
            }
            Event::GeneralRef(e) => {
                let entity = String::from_utf8_lossy(e.as_ref());
                let resolved = resolve_entity(&entity).ok_or_else(|| {
                    Error::MalformedSource(format!("unknown entity &{entity};"))
                })?;
                append_text(&mut stack, &resolved)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() > 1 {
        let open = stack.last().and_then(DocumentNode::name).unwrap_or_default();
        return Err(Error::MalformedSource(format!(
            "unexpected end of input inside <{open}>"
        )));
    }

    let holder = stack.pop();
    let mut roots = match holder {
        Some(DocumentNode::Element { children, .. }) => children,
        _ => Vec::new(),
    };
    roots.retain(|n| matches!(n, DocumentNode::Element { .. }));
    match roots.len() {
        0 => Err(Error::MalformedSource("no root element".to_string())),
        1 => Ok(roots.remove(0)),
        _ => Err(Error::MalformedSource(
            "more than one root element".to_string(),
        )),
    }
}

fn open_element(e: &BytesStart<'_>) -> Result<DocumentNode> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| Error::MalformedSource(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|err| Error::MalformedSource(err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(DocumentNode::element(name, attributes, Vec::new()))
}

fn append_child(stack: &mut [DocumentNode], node: DocumentNode) -> Result<()> {
    match stack.last_mut() {
        Some(DocumentNode::Element { children, .. }) => {
            children.push(node);
            Ok(())
        }
        _ => Err(Error::MalformedSource("dangling node".to_string())),
    }
}

/// Append text, merging with a preceding text node.
fn append_text(stack: &mut [DocumentNode], text: &str) -> Result<()> {
    if let Some(DocumentNode::Element { children, .. }) = stack.last_mut()
        && let Some(DocumentNode::Text { content }) = children.last_mut()
    {
        content.push_str(text);
        return Ok(());
    }
    append_child(stack, DocumentNode::text(text))
}

/// Resolve XML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code).map(|c| c.to_string())
}
