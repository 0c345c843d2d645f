//! Arena-backed in-memory document implementing [`Dom`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::dom::Dom;
use crate::domain::mutation::{MutationRecord, MutationSource};

/// Handle to a node in a [`Document`]. Stays valid after detachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Serializable description of a node and its subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    Text(String),
    Element(ElementSpec),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSpec>,
}

/// A whole page: optional URL plus the children of `<body>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub body: Vec<NodeSpec>,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct Slot {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable document tree. Insertions made through [`Document::insert`] are
/// recorded and handed out through [`MutationSource`].
///
/// Storage is append-only: detached subtrees keep their arena slots so that
/// handles stay valid, and nothing is reclaimed. Memory grows with every
/// insertion for the lifetime of the document, which suits finite snapshots
/// and replays rather than an unbounded live feed.
#[derive(Debug, Clone)]
pub struct Document {
    slots: Vec<Slot>,
    html: NodeId,
    body: NodeId,
    url: Option<String>,
    pending: Vec<MutationRecord<NodeId>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty `<html><body></body></html>` document.
    pub fn new() -> Self {
        let mut doc = Self {
            slots: Vec::new(),
            html: NodeId(0),
            body: NodeId(0),
            url: None,
            pending: Vec::new(),
        };
        doc.html = doc.alloc(NodeData::Element {
            tag: "html".into(),
            attrs: BTreeMap::new(),
        });
        doc.body = doc.alloc(NodeData::Element {
            tag: "body".into(),
            attrs: BTreeMap::new(),
        });
        doc.link(doc.html, doc.body);
        doc
    }

    pub fn from_snapshot(snapshot: &PageSnapshot) -> Self {
        let mut doc = Self::new();
        doc.url = snapshot.url.clone();
        let body = doc.body;
        for spec in &snapshot.body {
            doc.append(body, spec);
        }
        doc
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let snapshot: PageSnapshot =
            serde_yaml::from_str(contents).context("failed to parse YAML page snapshot")?;
        Ok(Self::from_snapshot(&snapshot))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let snapshot: PageSnapshot =
            serde_json::from_str(contents).context("failed to parse JSON page snapshot")?;
        Ok(Self::from_snapshot(&snapshot))
    }

    /// Current attached content of `<body>` as a snapshot.
    pub fn to_snapshot(&self) -> PageSnapshot {
        PageSnapshot {
            url: self.url.clone(),
            body: self.slots[self.body.0]
                .children
                .iter()
                .map(|child| self.spec_of(*child))
                .collect(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    /// Build `spec` under `parent` without producing a mutation record.
    pub fn append(&mut self, parent: NodeId, spec: &NodeSpec) -> NodeId {
        let node = self.build(spec);
        self.link(parent, node);
        node
    }

    /// Build `spec` under `parent` and record the insertion for observers.
    pub fn insert(&mut self, parent: NodeId, spec: &NodeSpec) -> NodeId {
        let node = self.append(parent, spec);
        match self.pending.last_mut() {
            Some(record) if record.target == parent => record.added.push(node),
            _ => self.pending.push(MutationRecord {
                target: parent,
                added: vec![node],
            }),
        }
        node
    }

    /// First attached element whose `id` attribute equals `id`.
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        if self.attribute(self.html, "id") == Some(id) {
            return Some(self.html);
        }
        self.first_descendant(self.html, |node| self.attribute(node, "id") == Some(id))
    }

    /// Indented rendering of `<body>`: one line per element or non-blank text.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(self.body, 0, &mut out);
        out
    }

    fn write_outline(&self, node: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match &self.slots[node.0].data {
            NodeData::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    let _ = writeln!(out, "{indent}{trimmed:?}");
                }
                return;
            }
            NodeData::Element { tag, attrs } => {
                let mut line = format!("{indent}{tag}");
                if let Some(id) = attrs.get("id") {
                    let _ = write!(line, "#{id}");
                }
                if let Some(classes) = attrs.get("class") {
                    for class in classes.split_ascii_whitespace() {
                        let _ = write!(line, ".{class}");
                    }
                }
                for (name, value) in attrs {
                    if name != "id" && name != "class" {
                        let _ = write!(line, " {name}={value:?}");
                    }
                }
                let _ = writeln!(out, "{line}");
            }
        }
        for child in &self.slots[node.0].children {
            self.write_outline(*child, depth + 1, out);
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        self.slots[child.0].parent = Some(parent);
        self.slots[parent.0].children.push(child);
    }

    fn build(&mut self, spec: &NodeSpec) -> NodeId {
        match spec {
            NodeSpec::Text(text) => self.alloc(NodeData::Text(text.clone())),
            NodeSpec::Element(element) => {
                let node = self.alloc(NodeData::Element {
                    tag: element.tag.to_ascii_lowercase(),
                    attrs: element.attrs.clone(),
                });
                for child in &element.children {
                    let built = self.build(child);
                    self.link(node, built);
                }
                node
            }
        }
    }

    fn spec_of(&self, node: NodeId) -> NodeSpec {
        let slot = &self.slots[node.0];
        match &slot.data {
            NodeData::Text(text) => NodeSpec::Text(text.clone()),
            NodeData::Element { tag, attrs } => NodeSpec::Element(ElementSpec {
                tag: tag.clone(),
                attrs: attrs.clone(),
                children: slot
                    .children
                    .iter()
                    .map(|child| self.spec_of(*child))
                    .collect(),
            }),
        }
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let slot = &self.slots[node.0];
        match &slot.data {
            NodeData::Text(text) => out.push_str(text),
            NodeData::Element { .. } => {
                for child in &slot.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }
}

impl Dom for Document {
    type Node = NodeId;

    fn body(&self) -> NodeId {
        self.body
    }

    fn is_element(&self, node: NodeId) -> bool {
        matches!(self.slots[node.0].data, NodeData::Element { .. })
    }

    fn tag_name(&self, node: NodeId) -> &str {
        match &self.slots[node.0].data {
            NodeData::Element { tag, .. } => tag,
            NodeData::Text(_) => "",
        }
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        match &self.slots[node.0].data {
            NodeData::Element { attrs, .. } => attrs.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.slots[node.0].parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.slots[node.0].children.clone()
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.contains(self.html, node)
    }

    fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.slots[node.0].parent.take() else {
            return;
        };
        self.slots[parent.0].children.retain(|child| *child != node);
    }
}

impl MutationSource for Document {
    type Node = NodeId;

    fn take_records(&mut self) -> Vec<MutationRecord<NodeId>> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
url: https://medium.com/
body:
  - tag: div
    attrs: { id: feed }
    children:
      - tag: article
        attrs: { id: first, class: "a b" }
        children:
          - tag: h2
            children: ["  First story  "]
      - tag: article
        attrs: { id: second }
"#;

    #[test]
    fn loads_yaml_snapshot() {
        let doc = Document::from_yaml(PAGE).unwrap();
        assert_eq!(doc.url(), Some("https://medium.com/"));
        let first = doc.find_by_id("first").unwrap();
        assert_eq!(doc.tag_name(first), "article");
        assert!(doc.has_class(first, "b"));
        assert_eq!(doc.text_content(first).trim(), "First story");
        assert_eq!(doc.parent(doc.body()), Some(doc.html()));
    }

    #[test]
    fn detach_disconnects_subtree_but_keeps_handles() {
        let mut doc = Document::from_yaml(PAGE).unwrap();
        let first = doc.find_by_id("first").unwrap();
        let heading = doc.first_descendant(first, |n| doc.tag_name(n) == "h2").unwrap();

        doc.detach(first);
        assert!(!doc.is_attached(first));
        assert!(!doc.is_attached(heading));
        assert_eq!(doc.parent(heading), Some(first));
        assert!(doc.find_by_id("first").is_none());

        doc.detach(first);
        assert!(doc.find_by_id("second").is_some());
    }

    #[test]
    fn insert_records_mutations_per_target() {
        let mut doc = Document::from_yaml(PAGE).unwrap();
        assert!(doc.take_records().is_empty());

        let feed = doc.find_by_id("feed").unwrap();
        let spec: NodeSpec = serde_yaml::from_str("{ tag: article, attrs: { id: third } }").unwrap();
        let third = doc.insert(feed, &spec);
        let fourth = doc.insert(feed, &NodeSpec::Text("tail".into()));
        let body = doc.body();
        let banner = doc.insert(body, &NodeSpec::Text("banner".into()));

        let records = doc.take_records();
        assert_eq!(
            records,
            vec![
                MutationRecord {
                    target: feed,
                    added: vec![third, fourth],
                },
                MutationRecord {
                    target: body,
                    added: vec![banner],
                },
            ]
        );
        assert!(doc.take_records().is_empty());
    }

    #[test]
    fn snapshot_round_trip_drops_detached_nodes() {
        let mut doc = Document::from_yaml(PAGE).unwrap();
        let second = doc.find_by_id("second").unwrap();
        doc.detach(second);

        let json = serde_json::to_string(&doc.to_snapshot()).unwrap();
        let reloaded = Document::from_json(&json).unwrap();
        assert!(reloaded.find_by_id("first").is_some());
        assert!(reloaded.find_by_id("second").is_none());
        assert_eq!(reloaded.url(), Some("https://medium.com/"));
    }

    #[test]
    fn outline_lists_attached_elements() {
        let doc = Document::from_yaml(PAGE).unwrap();
        let outline = doc.outline();
        assert!(outline.starts_with("body\n  div#feed\n    article#first.a.b\n"));
        assert!(outline.contains("      \"First story\"\n"));
    }
}
