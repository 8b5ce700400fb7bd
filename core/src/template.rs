//! Identifier templating for repeated subtrees.
//!
//! Template elements carry ids of the form `<base>_#n`. Every rendered copy rewrites them to
//! `<prefix><base>_#<index>`, where the prefix encodes the owning list and the index is the
//! item’s identifier within it, so copies never collide with each other or with copies made by
//! other lists.

use crate::dom::{Document, NodeId};
use crate::error::Result;

/// Separator between the base of an id and its index.
pub const INDEX_MARKER: &str = "_#";

/// Placeholder index used in templates.
pub const TEMPLATE_INDEX: &str = "_#n";

/// Id prefix for the items of the list with this identifier.
pub fn item_prefix(list_id: u64) -> String {
    format!("list{}.", list_id)
}

/// The full id of a templated element: `<prefix><base>_#<index>`.
pub fn full_element_id(prefix: &str, base: &str, index: u64) -> String {
    format!("{}{}{}{}", prefix, base, INDEX_MARKER, index)
}

/// Strips a trailing `_#n` or `_#<digits>`.
fn strip_index(element_id: &str) -> Option<&str> {
    if let Some(base) = element_id.strip_suffix(TEMPLATE_INDEX) {
        return Some(base);
    }
    let pos = element_id.rfind(INDEX_MARKER)?;
    let digits = &element_id[pos + INDEX_MARKER.len()..];
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some(&element_id[..pos])
    } else {
        None
    }
}

/// Rewrites a single id. Ids without an index suffix get one appended; ids that already start
/// with the prefix are not prefixed again.
pub fn templated_id(element_id: &str, prefix: &str, index: u64) -> String {
    let prefix = if element_id.starts_with(prefix) {
        ""
    } else {
        prefix
    };
    let base = strip_index(element_id).unwrap_or(element_id);
    full_element_id(prefix, base, index)
}

/// Rewrites the ids of `root` and all its descendant elements. Elements without an id are left
/// alone.
pub fn set_number_ids(doc: &mut Document, root: NodeId, index: u64, prefix: &str) -> Result<()> {
    for node in doc.descendant_elements(root) {
        if let Some(element_id) = doc.element_id(node) {
            let new_id = templated_id(element_id, prefix, index);
            doc.set_element_id(node, Some(new_id))?;
        }
    }
    Ok(())
}

/// Deep-clones `template` and rewrites the ids of the copy. The copy is detached.
pub fn clone_node_set_ids(
    doc: &mut Document,
    template: NodeId,
    prefix: &str,
    index: u64,
) -> Result<NodeId> {
    let copy = doc.deep_clone(template)?;
    set_number_ids(doc, copy, index, prefix)?;
    Ok(copy)
}

/// Changes the index of every already-indexed id in the subtree to `new_index`.
pub fn update_number_ids(doc: &mut Document, root: NodeId, new_index: u64) -> Result<()> {
    for node in doc.descendant_elements(root) {
        let new_id = doc
            .element_id(node)
            .and_then(strip_index)
            .map(|base| full_element_id("", base, new_index));
        if let Some(new_id) = new_id {
            doc.set_element_id(node, Some(new_id))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_rewriting() {
        assert_eq!(templated_id("title_#n", "list1.", 4), "list1.title_#4");
        assert_eq!(templated_id("title_#12", "list1.", 4), "list1.title_#4");
        assert_eq!(templated_id("title", "list1.", 4), "list1.title_#4");
        assert_eq!(templated_id("list1.title_#n", "list1.", 4), "list1.title_#4");
        assert_eq!(templated_id("a_#x", "", 2), "a_#x_#2");
        assert_eq!(templated_id("title_#n", "", 7), "title_#7");
    }

    fn template(doc: &mut Document) -> NodeId {
        let root = doc.create_element_with_id("li", "item_#n");
        let title = doc.create_element_with_id("span", "title_#n");
        let plain = doc.create_element("span");
        doc.append_child(root, title).unwrap();
        doc.append_child(root, plain).unwrap();
        root
    }

    #[test]
    fn clone_rewrites_the_copy_only() {
        let mut doc = Document::new();
        let template = template(&mut doc);
        let copy = clone_node_set_ids(&mut doc, template, "list2.", 3).unwrap();

        assert_eq!(doc.element_id(copy), Some("list2.item_#3"));
        let children = doc.children(copy).to_vec();
        assert_eq!(doc.element_id(children[0]), Some("list2.title_#3"));
        assert_eq!(doc.element_id(children[1]), None);

        assert_eq!(doc.element_id(template), Some("item_#n"));
        assert!(doc.contained_element_by_id(copy, "list2.title_#3").is_some());
        assert!(doc.contained_element_by_id(template, "list2.title_#3").is_none());
    }

    #[test]
    fn update_changes_the_index() {
        let mut doc = Document::new();
        let template = template(&mut doc);
        let copy = clone_node_set_ids(&mut doc, template, "list2.", 3).unwrap();
        update_number_ids(&mut doc, copy, 9).unwrap();

        assert_eq!(doc.element_id(copy), Some("list2.item_#9"));
        let title = doc.children(copy)[0];
        assert_eq!(doc.element_id(title), Some("list2.title_#9"));
    }
}
