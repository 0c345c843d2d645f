//! Compiled matcher table for the host's markup.
//!
//! Every class name and attribute value the resolver relies on lives here,
//! so tracking a markup change means editing configuration, not traversal
//! code.

use crate::domain::dom::Dom;
use crate::domain::errors::SignatureError;
use crate::domain::selector::Selector;
use crate::infra::config::Signatures;

#[derive(Debug, Clone)]
pub struct SignatureTable {
    pub version: String,
    /// Iconographic marker.
    pub member_icon: Selector,
    /// Accessible-label marker on an interactive control.
    pub member_button: Selector,
    /// Nearest ancestor of an icon used as the resolution start.
    pub interactive_ancestor: Selector,
    /// The "self-contained unit" tag.
    pub unit: Selector,
    /// Stable attribute marking a unit as one content item.
    pub unit_marker: Selector,
    pub heading: Selector,
    /// Heading text that identifies the protected section.
    pub section_title: String,
    pub section_container: Selector,
    pub section_item: Selector,
    pub section_list: Selector,
    pub section_heading_parent: Selector,
    pub broad_wrappers: Vec<Selector>,
    pub block_wrapper: Selector,
    pub interactive_region: Selector,
    pub feed_wrapper: Selector,
    pub boundaries: Vec<Selector>,
    pub title_link: Selector,
}

impl SignatureTable {
    pub fn compile(raw: &Signatures) -> Result<Self, SignatureError> {
        Ok(Self {
            version: raw.version.clone().unwrap_or_else(|| "unversioned".into()),
            member_icon: selector("member_icon", &raw.member_icon)?,
            member_button: selector("member_button", &raw.member_button)?,
            interactive_ancestor: selector("interactive_ancestor", &raw.interactive_ancestor)?,
            unit: selector("unit", &raw.unit)?,
            unit_marker: selector("unit_marker", &raw.unit_marker)?,
            heading: selector("heading", &raw.heading)?,
            section_title: raw
                .section_title
                .as_deref()
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .ok_or_else(|| SignatureError::Empty.for_signature("section_title"))?
                .to_owned(),
            section_container: selector("section_container", &raw.section_container)?,
            section_item: selector("section_item", &raw.section_item)?,
            section_list: selector("section_list", &raw.section_list)?,
            section_heading_parent: selector(
                "section_heading_parent",
                &raw.section_heading_parent,
            )?,
            broad_wrappers: selectors("broad_wrappers", &raw.broad_wrappers)?,
            block_wrapper: selector("block_wrapper", &raw.block_wrapper)?,
            interactive_region: selector("interactive_region", &raw.interactive_region)?,
            feed_wrapper: selector("feed_wrapper", &raw.feed_wrapper)?,
            boundaries: selectors("boundaries", &raw.boundaries)?,
            title_link: selector("title_link", &raw.title_link)?,
        })
    }

    /// Name/value pairs in table order, for display.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let join = |selectors: &[Selector]| {
            selectors
                .iter()
                .map(Selector::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };
        vec![
            ("member_icon", self.member_icon.to_string()),
            ("member_button", self.member_button.to_string()),
            ("interactive_ancestor", self.interactive_ancestor.to_string()),
            ("unit", self.unit.to_string()),
            ("unit_marker", self.unit_marker.to_string()),
            ("heading", self.heading.to_string()),
            ("section_title", self.section_title.clone()),
            ("section_container", self.section_container.to_string()),
            ("section_item", self.section_item.to_string()),
            ("section_list", self.section_list.to_string()),
            ("section_heading_parent", self.section_heading_parent.to_string()),
            ("broad_wrappers", join(&self.broad_wrappers)),
            ("block_wrapper", self.block_wrapper.to_string()),
            ("interactive_region", self.interactive_region.to_string()),
            ("feed_wrapper", self.feed_wrapper.to_string()),
            ("boundaries", join(&self.boundaries)),
            ("title_link", self.title_link.to_string()),
        ]
    }

    /// Unit tag carrying the stable unit marker attribute.
    pub fn is_marked_unit<D: Dom>(&self, dom: &D, node: D::Node) -> bool {
        self.unit.matches(dom, node) && self.unit_marker.matches(dom, node)
    }

    /// Strong unit signal: the unit marker attribute or a contained heading.
    pub fn has_unit_signal<D: Dom>(&self, dom: &D, node: D::Node) -> bool {
        self.unit_marker.matches(dom, node) || self.heading.select_first(dom, node).is_some()
    }

    /// Trimmed text of the first heading inside `node`.
    pub fn heading_text<D: Dom>(&self, dom: &D, node: D::Node) -> Option<String> {
        self.heading
            .select_first(dom, node)
            .map(|heading| dom.text_content(heading).trim().to_owned())
    }

    /// Whether the first heading inside `node` carries the protected section title.
    pub fn has_section_heading<D: Dom>(&self, dom: &D, node: D::Node) -> bool {
        self.heading_text(dom, node).as_deref() == Some(self.section_title.as_str())
    }

    pub fn is_broad_wrapper<D: Dom>(&self, dom: &D, node: D::Node) -> bool {
        self.broad_wrappers.iter().any(|s| s.matches(dom, node))
    }

    /// Whether the walk has left the meaningful document region.
    pub fn is_boundary<D: Dom>(&self, dom: &D, node: D::Node) -> bool {
        self.boundaries.iter().any(|s| s.matches(dom, node))
    }
}

impl Default for SignatureTable {
    fn default() -> Self {
        Self::compile(&Signatures::default()).expect("built-in signatures compile")
    }
}

fn selector(name: &str, raw: &Option<String>) -> Result<Selector, SignatureError> {
    let source = raw
        .as_deref()
        .ok_or_else(|| SignatureError::Empty.for_signature(name))?;
    Selector::parse(source).map_err(|err| err.for_signature(name))
}

fn selectors(name: &str, raw: &Option<Vec<String>>) -> Result<Vec<Selector>, SignatureError> {
    raw.as_deref()
        .unwrap_or_default()
        .iter()
        .map(|source| Selector::parse(source).map_err(|err| err.for_signature(name)))
        .collect()
}
