//! In-process document: an arena of element and text nodes.
//!
//! Nodes are addressed by [`NodeId`] handles; the string `id` of an element is a derived
//! addressing scheme used by templates and lookups. Nodes that are not reachable from the body
//! are orphans (templates, freshly cloned subtrees, detached items) and stay in the arena until
//! they are [removed](Document::remove).

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// A unique identifier for a node.
///
/// (this is just a UUID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Uuid);

impl NodeId {
    pub(crate) fn new() -> NodeId {
        NodeId(Uuid::new_v4())
    }
}

/// A shared handle to a document.
pub type DocumentRef = Arc<Mutex<Document>>;

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        id: Option<String>,
        attributes: BTreeMap<String, String>,
        classes: Vec<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// The document.
#[derive(Debug)]
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    body: NodeId,
    next_list_id: u64,
    next_unique_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Document::new()
    }
}

impl Document {
    /// Creates an empty document with a `body` element.
    pub fn new() -> Document {
        let body = NodeId::new();
        let mut nodes = HashMap::new();
        nodes.insert(
            body,
            Node {
                kind: NodeKind::Element {
                    tag: "body".into(),
                    id: None,
                    attributes: BTreeMap::new(),
                    classes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            },
        );
        Document {
            nodes,
            body,
            next_list_id: 1,
            next_unique_id: 1,
        }
    }

    /// Wraps a new document in a shared handle.
    pub fn shared() -> DocumentRef {
        Arc::new(Mutex::new(Document::new()))
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Allocates a list identifier. Never returns the same value twice for this document.
    pub fn next_list_id(&mut self) -> u64 {
        let id = self.next_list_id;
        self.next_list_id += 1;
        id
    }

    /// Allocates an identifier for cloned views.
    pub fn next_unique_id(&mut self) -> u64 {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(&id).ok_or(Error::NoSuchNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes.get_mut(&id).ok_or(Error::NoSuchNode(id))
    }

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node {
                kind: NodeKind::Element {
                    tag: tag.into(),
                    id: None,
                    attributes: BTreeMap::new(),
                    classes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Creates a detached element with an id.
    pub fn create_element_with_id(&mut self, tag: &str, element_id: &str) -> NodeId {
        let node = self.create_element(tag);
        if let Some(Node {
            kind: NodeKind::Element { id, .. },
            ..
        }) = self.nodes.get_mut(&node)
        {
            *id = Some(element_id.into());
        }
        node
    }

    /// Creates a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let id = NodeId::new();
        self.nodes.insert(
            id,
            Node {
                kind: NodeKind::Text(text.into()),
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    /// Returns true if the node exists in the arena.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Returns true if the node is reachable from the body.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(id) = cursor {
            if id == self.body {
                return true;
            }
            cursor = self.nodes.get(&id).and_then(|node| node.parent);
        }
        false
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Returns the element id, if the node is an element that has one.
    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { id, .. } => id.as_deref(),
            NodeKind::Text(_) => None,
        }
    }

    /// Sets the element id. Does nothing for text nodes.
    pub fn set_element_id(&mut self, node: NodeId, element_id: Option<String>) -> Result<()> {
        if let NodeKind::Element { id, .. } = &mut self.node_mut(node)?.kind {
            *id = element_id;
        }
        Ok(())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(&node)
            .map(|node| &node.children[..])
            .unwrap_or(&[])
    }

    /// Finds an attached element by id.
    pub fn element_by_id(&self, element_id: &str) -> Option<NodeId> {
        self.contained_element_by_id(self.body, element_id)
    }

    /// Like [`element_by_id`](Self::element_by_id), but fails if nothing is found.
    pub fn require_element_by_id(&self, element_id: &str) -> Result<NodeId> {
        self.element_by_id(element_id)
            .ok_or_else(|| Error::ElementNotFound(element_id.into()))
    }

    /// Finds an element by id in the subtree rooted at `root` (inclusive), in document order.
    pub fn contained_element_by_id(&self, root: NodeId, element_id: &str) -> Option<NodeId> {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(&id)?;
            if let NodeKind::Element { id: Some(eid), .. } = &node.kind {
                if eid == element_id {
                    return Some(id);
                }
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    /// Removes the node from its parent’s children, if it has a parent.
    fn unlink(&mut self, node: NodeId) -> Result<()> {
        let parent = self.node(node)?.parent;
        if let Some(parent) = parent {
            let siblings = &mut self.node_mut(parent)?.children;
            if let Some(pos) = siblings.iter().position(|id| *id == node) {
                siblings.remove(pos);
            }
            self.node_mut(node)?.parent = None;
        }
        Ok(())
    }

    fn check_cycle(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(Error::Cycle(child));
            }
            cursor = self.node(id)?.parent;
        }
        Ok(())
    }

    /// Appends `child` to `parent`. If `child` already has a parent, it is moved.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.insert_before(parent, child, None)
    }

    /// Inserts `child` into `parent` before `reference`, or at the end if `reference` is `None`
    /// or not a child of `parent`.
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> Result<()> {
        self.node(child)?;
        self.node(parent)?;
        self.check_cycle(parent, child)?;
        self.unlink(child)?;

        let siblings = &mut self.node_mut(parent)?.children;
        let pos = reference
            .and_then(|reference| siblings.iter().position(|id| *id == reference))
            .unwrap_or(siblings.len());
        siblings.insert(pos, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Detaches a node from its parent; the node stays in the arena.
    pub fn detach(&mut self, node: NodeId) -> Result<()> {
        self.unlink(node)
    }

    /// Detaches a node and drops it and all its descendants from the arena.
    pub fn remove(&mut self, node: NodeId) -> Result<()> {
        self.unlink(node)?;
        self.drop_subtree(node);
        Ok(())
    }

    /// Drops an unlinked subtree from the arena.
    fn drop_subtree(&mut self, root: NodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                stack.extend(node.children);
            }
        }
    }

    /// Removes all children of the node, dropping them from the arena.
    pub fn empty_element(&mut self, node: NodeId) -> Result<()> {
        let children = std::mem::take(&mut self.node_mut(node)?.children);
        for child in children {
            self.drop_subtree(child);
        }
        Ok(())
    }

    /// Number of nodes in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Clones a subtree. The copy is detached.
    pub fn deep_clone(&mut self, node: NodeId) -> Result<NodeId> {
        let source = self.node(node)?.clone();
        let copy = NodeId::new();
        self.nodes.insert(
            copy,
            Node {
                kind: source.kind,
                parent: None,
                children: Vec::new(),
            },
        );
        for child in source.children {
            let child_copy = self.deep_clone(child)?;
            self.node_mut(child_copy)?.parent = Some(copy);
            self.node_mut(copy)?.children.push(child_copy);
        }
        Ok(copy)
    }

    /// Replaces the contents of the node with a single text node.
    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.empty_element(node)?;
        let text = self.create_text(text);
        self.append_child(node, text)
    }

    /// Concatenated text of all descendant text nodes.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                if let NodeKind::Text(text) = &node.kind {
                    out.push_str(text);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        if let NodeKind::Element { attributes, .. } = &mut self.node_mut(node)?.kind {
            attributes.insert(name.into(), value.into());
        }
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        match self.nodes.get(&node).map(|node| &node.kind) {
            Some(NodeKind::Element { classes, .. }) => classes.iter().any(|c| c == class),
            _ => false,
        }
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) -> Result<()> {
        if let NodeKind::Element { classes, .. } = &mut self.node_mut(node)?.kind {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.into());
            }
        }
        Ok(())
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) -> Result<()> {
        if let NodeKind::Element { classes, .. } = &mut self.node_mut(node)?.kind {
            classes.retain(|c| c != class);
        }
        Ok(())
    }

    /// The node and every descendant element, in document order.
    pub(crate) fn descendant_elements(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                if let NodeKind::Element { .. } = node.kind {
                    out.push(id);
                }
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_moves_attached_nodes() {
        let mut doc = Document::new();
        let a = doc.create_element("ul");
        let b = doc.create_element("ul");
        let item = doc.create_element("li");
        doc.append_child(doc.body(), a).unwrap();
        doc.append_child(doc.body(), b).unwrap();
        doc.append_child(a, item).unwrap();

        doc.append_child(b, item).unwrap();
        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[item]);
        assert_eq!(doc.parent(item), Some(b));

        // re-appending to the same parent moves it to the end
        let other = doc.create_element("li");
        doc.insert_before(b, other, None).unwrap();
        doc.append_child(b, item).unwrap();
        assert_eq!(doc.children(b), &[other, item]);
    }

    #[test]
    fn insert_before_and_cycles() {
        let mut doc = Document::new();
        let list = doc.create_element("ul");
        let first = doc.create_element("li");
        let second = doc.create_element("li");
        doc.append_child(list, second).unwrap();
        doc.insert_before(list, first, Some(second)).unwrap();
        assert_eq!(doc.children(list), &[first, second]);

        assert_eq!(doc.append_child(first, list), Err(Error::Cycle(list)));
        assert_eq!(doc.append_child(list, list), Err(Error::Cycle(list)));
    }

    #[test]
    fn lookup_only_finds_attached_elements() {
        let mut doc = Document::new();
        let orphan = doc.create_element_with_id("div", "orphan");
        assert_eq!(doc.element_by_id("orphan"), None);
        assert_eq!(doc.contained_element_by_id(orphan, "orphan"), Some(orphan));
        assert_eq!(
            doc.require_element_by_id("orphan"),
            Err(Error::ElementNotFound("orphan".into()))
        );

        doc.append_child(doc.body(), orphan).unwrap();
        assert_eq!(doc.element_by_id("orphan"), Some(orphan));
        assert!(doc.is_attached(orphan));
    }

    #[test]
    fn deep_clone_copies_subtree() {
        let mut doc = Document::new();
        let row = doc.create_element_with_id("tr", "row");
        let cell = doc.create_element_with_id("td", "cell");
        doc.append_child(row, cell).unwrap();
        doc.set_text(cell, "hello").unwrap();
        doc.set_attribute(cell, "title", "greeting").unwrap();

        let copy = doc.deep_clone(row).unwrap();
        assert_ne!(copy, row);
        assert_eq!(doc.parent(copy), None);
        let cell_copy = doc.contained_element_by_id(copy, "cell").unwrap();
        assert_ne!(cell_copy, cell);
        assert_eq!(doc.text_content(cell_copy), "hello");
        assert_eq!(doc.attribute(cell_copy, "title"), Some("greeting"));

        doc.set_text(cell_copy, "bye").unwrap();
        assert_eq!(doc.text_content(cell), "hello");
    }

    #[test]
    fn remove_drops_subtree() {
        let mut doc = Document::new();
        let row = doc.create_element("tr");
        let cell = doc.create_element("td");
        doc.append_child(doc.body(), row).unwrap();
        doc.append_child(row, cell).unwrap();
        doc.remove(row).unwrap();
        assert!(!doc.contains(row));
        assert!(!doc.contains(cell));
        assert!(doc.children(doc.body()).is_empty());
    }

    #[test]
    fn emptying_drops_children() {
        let mut doc = Document::new();
        let span = doc.create_element("span");
        doc.append_child(doc.body(), span).unwrap();
        doc.set_text(span, "0").unwrap();
        let count = doc.node_count();
        for n in 1..100 {
            doc.set_text(span, &n.to_string()).unwrap();
        }
        assert_eq!(doc.node_count(), count);
        assert_eq!(doc.text_content(span), "99");

        let list = doc.create_element("ul");
        let item = doc.create_element("li");
        doc.append_child(list, item).unwrap();
        doc.set_text(item, "x").unwrap();
        doc.empty_element(list).unwrap();
        assert!(!doc.contains(item));
        assert!(doc.contains(list));
    }

    #[test]
    fn classes() {
        let mut doc = Document::new();
        let node = doc.create_element("div");
        doc.add_class(node, "hidden").unwrap();
        doc.add_class(node, "hidden").unwrap();
        assert!(doc.has_class(node, "hidden"));
        doc.remove_class(node, "hidden").unwrap();
        assert!(!doc.has_class(node, "hidden"));
    }
}
