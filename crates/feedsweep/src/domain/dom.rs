//! Capability interface over a live document tree.
//!
//! The resolver and sweeper never own the tree. They only see it through
//! [`Dom`], which keeps them usable against any tree that can answer these
//! structural questions: the in-memory [`crate::infra::document::Document`]
//! in this crate, or a browser-backed handle in an embedding host.

use std::fmt;
use std::hash::Hash;

/// Structural queries and the single mutation (detach) the sweeper needs.
pub trait Dom {
    /// Cheap handle to a node. Handles stay valid after the node is detached.
    type Node: Copy + Eq + Hash + fmt::Debug;

    /// Root of the meaningful document region and the default sweep scope.
    fn body(&self) -> Self::Node;

    /// Whether the node is an element (as opposed to text).
    fn is_element(&self, node: Self::Node) -> bool;

    /// Lowercase tag name. Empty for non-element nodes.
    fn tag_name(&self, node: Self::Node) -> &str;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// All child nodes in document order, text included.
    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    /// Concatenated text of the node and all of its descendants.
    fn text_content(&self, node: Self::Node) -> String;

    /// Whether the node is currently connected to the document.
    fn is_attached(&self, node: Self::Node) -> bool;

    /// Remove the node (and its subtree) from its parent. No-op when already detached.
    fn detach(&mut self, node: Self::Node);

    fn has_attribute(&self, node: Self::Node, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    fn has_class(&self, node: Self::Node, class: &str) -> bool {
        self.attribute(node, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    fn element_children(&self, node: Self::Node) -> Vec<Self::Node> {
        self.children(node)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Element descendants in document (pre-)order, excluding `node` itself.
    fn descendants(&self, node: Self::Node) -> Vec<Self::Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Self::Node> = self.element_children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.element_children(current).into_iter().rev());
        }
        out
    }

    /// First element descendant (document order) satisfying `predicate`.
    fn first_descendant<F>(&self, node: Self::Node, mut predicate: F) -> Option<Self::Node>
    where
        F: FnMut(Self::Node) -> bool,
    {
        let mut stack: Vec<Self::Node> = self.element_children(node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if predicate(current) {
                return Some(current);
            }
            stack.extend(self.element_children(current).into_iter().rev());
        }
        None
    }

    /// Nearest inclusive ancestor satisfying `predicate`.
    fn closest<F>(&self, node: Self::Node, mut predicate: F) -> Option<Self::Node>
    where
        F: FnMut(Self::Node) -> bool,
    {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if self.is_element(current) && predicate(current) {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    /// Short human-readable label for diagnostics, e.g. `div#feed.pj.n.y`.
    fn describe(&self, node: Self::Node) -> String {
        if !self.is_element(node) {
            return "#text".to_owned();
        }
        let mut label = self.tag_name(node).to_owned();
        if let Some(id) = self.attribute(node, "id") {
            label.push('#');
            label.push_str(id);
        }
        if let Some(classes) = self.attribute(node, "class") {
            for class in classes.split_ascii_whitespace() {
                label.push('.');
                label.push_str(class);
            }
        }
        label
    }

    /// Inclusive containment: a node contains itself.
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }
}
