//! Arena-allocated chapter tree.
//!
//! Chapters are built incrementally while the walker descends the source, so
//! nodes are addressed by index and appended to whichever element the
//! innermost open context owns.

use std::collections::HashSet;

/// Unique identifier for a node in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Sentinel value for no node.
    pub const NONE: NodeId = NodeId(u32::MAX);

    pub fn is_none(&self) -> bool {
        self.0 == u32::MAX
    }
}

#[derive(Debug, Clone)]
pub enum NodeData {
    /// Element with tag name and attributes in insertion order.
    Element {
        name: &'static str,
        attrs: Vec<(&'static str, String)>,
    },
    Text(String),
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: NodeId,
    pub first_child: NodeId,
    pub last_child: NodeId,
    pub next_sibling: NodeId,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: NodeId::NONE,
            first_child: NodeId::NONE,
            last_child: NodeId::NONE,
            next_sibling: NodeId::NONE,
        }
    }
}

/// Elements serialized as `<name/>`.
const VOID_ELEMENTS: &[&str] = &["br", "img", "meta", "link", "hr"];

/// One chapter document, rooted at an `html` element.
#[derive(Debug)]
pub struct ChapterDom {
    nodes: Vec<Node>,
    root: NodeId,
    /// Every `id` attribute seen so far.
    ids: HashSet<String>,
    /// Ids assigned to more than one element, in order of reuse.
    duplicate_ids: Vec<String>,
}

impl ChapterDom {
    /// Create a tree holding only the `html` root element.
    pub fn new() -> Self {
        let mut dom = Self {
            nodes: Vec::new(),
            root: NodeId::NONE,
            ids: HashSet::new(),
            duplicate_ids: Vec::new(),
        };
        dom.root = dom.create_element("html", Vec::new());
        dom
    }

    fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.0 as usize)
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.0 as usize)
    }

    /// Create a detached element node.
    ///
    /// An `id` already used in this tree is recorded in
    /// [`duplicate_ids`](Self::duplicate_ids); the element is still created.
    pub fn create_element(
        &mut self,
        name: &'static str,
        attrs: Vec<(&'static str, String)>,
    ) -> NodeId {
        if let Some((_, id)) = attrs.iter().find(|(k, _)| *k == "id")
            && !self.ids.insert(id.clone())
        {
            self.duplicate_ids.push(id.clone());
        }
        self.alloc(Node::new(NodeData::Element { name, attrs }))
    }

    /// Append a child to a parent node.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(child_node) = self.get_mut(child) {
            child_node.parent = parent;
        }
        if let Some(last_node) = self.get_mut(last_child) {
            last_node.next_sibling = child;
        }
        if let Some(parent_node) = self.get_mut(parent) {
            if parent_node.first_child.is_none() {
                parent_node.first_child = child;
            }
            parent_node.last_child = child;
        }
    }

    /// Create an element and append it to `parent` in one step.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        name: &'static str,
        attrs: Vec<(&'static str, String)>,
    ) -> NodeId {
        let id = self.create_element(name, attrs);
        self.append(parent, id);
        id
    }

    /// Append text, merging with a trailing text node.
    pub fn append_text(&mut self, parent: NodeId, text: &str) {
        let last_child = self
            .get(parent)
            .map(|n| n.last_child)
            .unwrap_or(NodeId::NONE);

        if let Some(last) = self.get_mut(last_child)
            && let NodeData::Text(existing) = &mut last.data
        {
            existing.push_str(text);
            return;
        }

        let text_node = self.alloc(Node::new(NodeData::Text(text.to_string())));
        self.append(parent, text_node);
    }

    /// Anchor ids that were assigned to more than one element.
    pub fn duplicate_ids(&self) -> &[String] {
        &self.duplicate_ids
    }

    pub fn children(&self, parent: NodeId) -> ChildrenIter<'_> {
        let first = self
            .get(parent)
            .map(|n| n.first_child)
            .unwrap_or(NodeId::NONE);
        ChildrenIter {
            dom: self,
            current: first,
        }
    }

    /// Serialize the tree as XML markup, without declaration or doctype.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 16);
        self.write_node(self.root, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get(id) else {
            return;
        };
        match &node.data {
            NodeData::Text(text) => out.push_str(&escape_xml(text)),
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_xml(value));
                    out.push('"');
                }
                if VOID_ELEMENTS.contains(name) {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for child in self.children(id) {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

impl Default for ChapterDom {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ChildrenIter<'a> {
    dom: &'a ChapterDom,
    current: NodeId,
}

impl Iterator for ChildrenIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current.is_none() {
            return None;
        }
        let id = self.current;
        self.current = self
            .dom
            .get(id)
            .map(|n| n.next_sibling)
            .unwrap_or(NodeId::NONE);
        Some(id)
    }
}

/// Escape special XML characters.
pub fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_children_in_order() {
        let mut dom = ChapterDom::new();
        let body = dom.append_element(dom.root(), "body", vec![]);
        let first = dom.append_element(body, "p", vec![]);
        let second = dom.append_element(body, "p", vec![]);

        let children: Vec<_> = dom.children(body).collect();
        assert_eq!(children, vec![first, second]);
        assert_eq!(dom.get(second).map(|n| n.parent), Some(body));
    }

    #[test]
    fn test_text_merging() {
        let mut dom = ChapterDom::new();
        let p = dom.append_element(dom.root(), "p", vec![]);
        dom.append_text(p, "Hello, ");
        dom.append_text(p, "World!");

        assert_eq!(dom.children(p).count(), 1);
        assert_eq!(dom.serialize(), "<html><p>Hello, World!</p></html>");
    }

    #[test]
    fn test_duplicate_ids_recorded() {
        let mut dom = ChapterDom::new();
        dom.append_element(dom.root(), "h2", vec![("id", "sec1".to_string())]);
        dom.append_element(dom.root(), "p", vec![("id", "eq1".to_string())]);
        assert!(dom.duplicate_ids().is_empty());

        dom.append_element(dom.root(), "div", vec![("id", "sec1".to_string())]);
        assert_eq!(dom.duplicate_ids(), ["sec1".to_string()]);
    }

    #[test]
    fn test_serialize_escapes_and_closes() {
        let mut dom = ChapterDom::new();
        let p = dom.append_element(dom.root(), "p", vec![("title", "a \"b\"".to_string())]);
        dom.append_text(p, "1 < 2 & 3");
        dom.append_element(p, "br", vec![]);
        dom.append_element(dom.root(), "div", vec![]);

        assert_eq!(
            dom.serialize(),
            "<html><p title=\"a &quot;b&quot;\">1 &lt; 2 &amp; 3<br/></p><div></div></html>"
        );
    }
}
