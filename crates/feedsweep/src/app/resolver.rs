//! Ancestor-card resolution.
//!
//! Starting from a marker (or its nearest interactive ancestor), climb the
//! tree one ancestor at a time and decide which node is the whole content
//! card. Selecting too little leaves the card behind; selecting too much
//! deletes unrelated content, so at every level the rejection rules run
//! before any selection rule, and item-shaped signatures are tried before the
//! generic wrapper heuristics.
//!
//! The per-level rules are an ordered table ([`level_rules`]). Their order is
//! part of the contract: several rules overlap, and reordering them changes
//! which node is picked in ambiguous trees.

use std::fmt;
use std::sync::Arc;

use crate::app::signatures::SignatureTable;
use crate::domain::dom::Dom;

pub const DEFAULT_MAX_HOPS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleName {
    /// Nearest unit-tag ancestor of the start element, if it shows a unit signal.
    Shortcut,
    SectionTitleContainer,
    BroadWrapper,
    RepeatedItem,
    UnitTag,
    UnitWrapper,
    InteractiveWrapper,
    FeedWrapper,
}

impl RuleName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::Shortcut => "shortcut",
            RuleName::SectionTitleContainer => "section-title-container",
            RuleName::BroadWrapper => "broad-wrapper",
            RuleName::RepeatedItem => "repeated-item",
            RuleName::UnitTag => "unit-tag",
            RuleName::UnitWrapper => "unit-wrapper",
            RuleName::InteractiveWrapper => "interactive-wrapper",
            RuleName::FeedWrapper => "feed-wrapper",
        }
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying one rule to one ancestor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict<N> {
    /// Rule does not apply; try the next rule at this level.
    Pass,
    /// Never select this node; move straight to its parent.
    Reject,
    /// Stop the walk and return this node as the card.
    Select(N),
}

/// What a rule can see while judging an ancestor.
pub struct RuleContext<'a, D: Dom> {
    pub dom: &'a D,
    pub signatures: &'a SignatureTable,
    /// The element the walk started from.
    pub start: D::Node,
}

pub struct Rule<D: Dom> {
    pub name: RuleName,
    pub apply: fn(&RuleContext<'_, D>, D::Node) -> Verdict<D::Node>,
}

/// Rules evaluated top to bottom at every ancestor. First non-`Pass` verdict wins.
pub fn level_rules<D: Dom>() -> [Rule<D>; 7] {
    [
        Rule {
            name: RuleName::SectionTitleContainer,
            apply: reject_section_title_container,
        },
        Rule {
            name: RuleName::BroadWrapper,
            apply: reject_broad_wrapper,
        },
        Rule {
            name: RuleName::RepeatedItem,
            apply: select_repeated_item,
        },
        Rule {
            name: RuleName::UnitTag,
            apply: select_unit_tag,
        },
        Rule {
            name: RuleName::UnitWrapper,
            apply: select_unit_wrapper,
        },
        Rule {
            name: RuleName::InteractiveWrapper,
            apply: select_interactive_wrapper,
        },
        Rule {
            name: RuleName::FeedWrapper,
            apply: select_feed_wrapper_unit,
        },
    ]
}

/// A resolved card and how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<N> {
    pub card: N,
    pub rule: RuleName,
    /// Ancestor steps taken before the selecting rule fired.
    pub hops: usize,
}

/// Maps a marker to the card that should be removed.
#[derive(Debug, Clone)]
pub struct CardResolver {
    signatures: Arc<SignatureTable>,
    max_hops: usize,
}

impl CardResolver {
    pub fn new(signatures: Arc<SignatureTable>) -> Self {
        Self {
            signatures,
            max_hops: DEFAULT_MAX_HOPS,
        }
    }

    pub fn with_max_hops(mut self, hops: usize) -> Self {
        self.max_hops = hops;
        self
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    pub fn signatures(&self) -> &SignatureTable {
        &self.signatures
    }

    /// Resolve `start` to its card, or `None` when no card can be identified
    /// confidently within the hop bound.
    pub fn resolve<D: Dom>(&self, dom: &D, start: D::Node) -> Option<Resolution<D::Node>> {
        let signatures = self.signatures.as_ref();
        tracing::debug!(start = %dom.describe(start), "resolving card");

        if let Some(unit) = dom.closest(start, |node| signatures.unit.matches(dom, node)) {
            if signatures.has_unit_signal(dom, unit) {
                tracing::debug!(card = %dom.describe(unit), "matched shortcut unit ancestor");
                return Some(Resolution {
                    card: unit,
                    rule: RuleName::Shortcut,
                    hops: 0,
                });
            }
            tracing::debug!(unit = %dom.describe(unit), "unit ancestor lacks a unit signal");
        }

        let ctx = RuleContext {
            dom,
            signatures,
            start,
        };
        let rules = level_rules::<D>();
        let mut current = start;

        'walk: for hop in 0..self.max_hops {
            if signatures.is_boundary(dom, current) {
                tracing::debug!(hop, node = %dom.describe(current), "reached document boundary");
                return None;
            }
            let Some(parent) = dom.parent(current) else {
                tracing::debug!(hop, node = %dom.describe(current), "node has no parent");
                return None;
            };
            tracing::trace!(hop, node = %dom.describe(current), "visiting ancestor");

            for rule in &rules {
                match (rule.apply)(&ctx, current) {
                    Verdict::Pass => {}
                    Verdict::Reject => {
                        tracing::debug!(hop, rule = %rule.name, node = %dom.describe(current), "rejected container");
                        current = parent;
                        continue 'walk;
                    }
                    Verdict::Select(card) => {
                        tracing::debug!(hop, rule = %rule.name, card = %dom.describe(card), "matched card");
                        return Some(Resolution {
                            card,
                            rule: rule.name,
                            hops: hop,
                        });
                    }
                }
            }

            current = parent;
        }

        tracing::debug!(
            max_hops = self.max_hops,
            start = %dom.describe(start),
            "no card found within hop bound"
        );
        None
    }
}

fn reject_section_title_container<D: Dom>(
    ctx: &RuleContext<'_, D>,
    node: D::Node,
) -> Verdict<D::Node> {
    let sig = ctx.signatures;
    if sig.has_section_heading(ctx.dom, node) && sig.section_container.matches(ctx.dom, node) {
        Verdict::Reject
    } else {
        Verdict::Pass
    }
}

fn reject_broad_wrapper<D: Dom>(ctx: &RuleContext<'_, D>, node: D::Node) -> Verdict<D::Node> {
    let sig = ctx.signatures;
    let container_shape = sig.section_container.matches(ctx.dom, node)
        && !sig.section_item.matches(ctx.dom, node);
    if sig.is_broad_wrapper(ctx.dom, node) || container_shape {
        Verdict::Reject
    } else {
        Verdict::Pass
    }
}

fn select_repeated_item<D: Dom>(ctx: &RuleContext<'_, D>, node: D::Node) -> Verdict<D::Node> {
    let sig = ctx.signatures;
    let in_list = ctx
        .dom
        .parent(node)
        .is_some_and(|parent| sig.section_list.matches(ctx.dom, parent));
    if !(sig.section_item.matches(ctx.dom, node) && in_list) {
        return Verdict::Pass;
    }
    // The section wrapper can share the item shape; its title gives it away.
    if sig.has_section_heading(ctx.dom, node) {
        Verdict::Reject
    } else {
        Verdict::Select(node)
    }
}

fn select_unit_tag<D: Dom>(ctx: &RuleContext<'_, D>, node: D::Node) -> Verdict<D::Node> {
    let sig = ctx.signatures;
    if sig.unit.matches(ctx.dom, node) && sig.has_unit_signal(ctx.dom, node) {
        Verdict::Select(node)
    } else {
        Verdict::Pass
    }
}

fn select_unit_wrapper<D: Dom>(ctx: &RuleContext<'_, D>, node: D::Node) -> Verdict<D::Node> {
    let sig = ctx.signatures;
    if !sig.block_wrapper.matches(ctx.dom, node) {
        return Verdict::Pass;
    }
    let wraps_unit = ctx
        .dom
        .element_children(node)
        .into_iter()
        .any(|child| sig.is_marked_unit(ctx.dom, child));
    if wraps_unit {
        Verdict::Select(node)
    } else {
        Verdict::Pass
    }
}

fn select_interactive_wrapper<D: Dom>(
    ctx: &RuleContext<'_, D>,
    node: D::Node,
) -> Verdict<D::Node> {
    let sig = ctx.signatures;
    if sig.interactive_region.matches(ctx.dom, node)
        && sig.heading.select_first(ctx.dom, node).is_some()
        && ctx.dom.contains(node, ctx.start)
    {
        Verdict::Select(node)
    } else {
        Verdict::Pass
    }
}

fn select_feed_wrapper_unit<D: Dom>(
    ctx: &RuleContext<'_, D>,
    node: D::Node,
) -> Verdict<D::Node> {
    let sig = ctx.signatures;
    if !sig.feed_wrapper.matches(ctx.dom, node) {
        return Verdict::Pass;
    }
    match ctx
        .dom
        .first_descendant(node, |candidate| sig.is_marked_unit(ctx.dom, candidate))
    {
        Some(unit) => Verdict::Select(unit),
        None => Verdict::Pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::document::{Document, NodeId};

    fn page(yaml: &str) -> Document {
        Document::from_yaml(yaml).expect("fixture parses")
    }

    fn resolver() -> CardResolver {
        CardResolver::new(Arc::new(SignatureTable::default()))
    }

    fn id(doc: &Document, id: &str) -> NodeId {
        doc.find_by_id(id).unwrap_or_else(|| panic!("missing #{id}"))
    }

    fn verdict(doc: &Document, rule: RuleName, start: &str, node: &str) -> Verdict<NodeId> {
        let signatures = SignatureTable::default();
        let ctx = RuleContext {
            dom: doc,
            signatures: &signatures,
            start: id(doc, start),
        };
        let rule = level_rules::<Document>()
            .into_iter()
            .find(|r| r.name == rule)
            .expect("rule exists");
        (rule.apply)(&ctx, id(doc, node))
    }

    const STAFF_PICKS: &str = r#"
body:
  - tag: div
    attrs: { id: root }
    children:
      - tag: div
        attrs: { id: picks, class: "fb fc fd y" }
        children:
          - tag: div
            attrs: { class: gb }
            children:
              - tag: h2
                children: ["Staff Picks"]
          - tag: div
            attrs: { id: list, class: "dl y" }
            children:
              - tag: div
                attrs: { id: pick1, class: "gc y" }
                children:
                  - tag: h2
                    children: ["Rust in production"]
                  - tag: button
                    attrs: { id: btn1, aria-label: "Member-only story" }
              - tag: div
                attrs: { id: pick2, class: "gc y" }
                children:
                  - tag: h2
                    children: ["Free story"]
"#;

    #[test]
    fn shortcut_returns_marked_article() {
        let doc = page(
            r#"
body:
  - tag: article
    attrs: { id: card, data-testid: post-preview }
    children:
      - tag: div
        children:
          - tag: button
            attrs: { id: btn, aria-label: "Member-only story" }
"#,
        );
        let found = resolver().resolve(&doc, id(&doc, "btn")).unwrap();
        assert_eq!(found.card, id(&doc, "card"));
        assert_eq!(found.rule, RuleName::Shortcut);
        assert_eq!(found.hops, 0);
    }

    #[test]
    fn shortcut_skips_article_without_unit_signal() {
        let doc = page(
            r#"
body:
  - tag: article
    attrs: { id: page }
    children:
      - tag: div
        attrs: { id: wrap }
        children:
          - tag: article
            attrs: { id: card, data-testid: post-preview }
          - tag: div
            children:
              - tag: button
                attrs: { id: btn }
"#,
        );
        let found = resolver().resolve(&doc, id(&doc, "btn")).unwrap();
        assert_eq!(found.card, id(&doc, "wrap"));
        assert_eq!(found.rule, RuleName::UnitWrapper);
        assert_eq!(found.hops, 2);
    }

    #[test]
    fn repeated_item_is_selected_inside_titled_section() {
        let doc = page(STAFF_PICKS);
        let found = resolver().resolve(&doc, id(&doc, "btn1")).unwrap();
        assert_eq!(found.card, id(&doc, "pick1"));
        assert_eq!(found.rule, RuleName::RepeatedItem);
    }

    #[test]
    fn section_title_container_is_rejected() {
        let doc = page(STAFF_PICKS);
        assert_eq!(
            verdict(&doc, RuleName::SectionTitleContainer, "btn1", "picks"),
            Verdict::Reject
        );
        assert_eq!(
            verdict(&doc, RuleName::SectionTitleContainer, "btn1", "pick1"),
            Verdict::Pass
        );
    }

    #[test]
    fn broad_wrapper_shapes_are_rejected() {
        let doc = page(
            r#"
body:
  - tag: div
    attrs: { id: sidebar, class: "ed ee et eu ev" }
  - tag: div
    attrs: { id: section, class: "fb fc fd y" }
  - tag: div
    attrs: { id: item, class: "fb fc fd y gc" }
  - tag: div
    attrs: { id: plain }
"#,
        );
        assert_eq!(
            verdict(&doc, RuleName::BroadWrapper, "plain", "sidebar"),
            Verdict::Reject
        );
        assert_eq!(
            verdict(&doc, RuleName::BroadWrapper, "plain", "section"),
            Verdict::Reject
        );
        assert_eq!(
            verdict(&doc, RuleName::BroadWrapper, "plain", "item"),
            Verdict::Pass
        );
        assert_eq!(
            verdict(&doc, RuleName::BroadWrapper, "plain", "plain"),
            Verdict::Pass
        );
    }

    #[test]
    fn repeated_item_with_section_title_is_rejected() {
        let doc = page(
            r#"
body:
  - tag: section
    attrs: { id: outer }
    children:
      - tag: div
        attrs: { class: "dl y" }
        children:
          - tag: div
            attrs: { id: titled, class: "gc y" }
            children:
              - tag: h2
                children: ["Staff Picks"]
              - tag: button
                attrs: { id: btn }
"#,
        );
        assert_eq!(
            verdict(&doc, RuleName::RepeatedItem, "btn", "titled"),
            Verdict::Reject
        );
        // Nothing above the titled item qualifies either.
        assert_eq!(resolver().resolve(&doc, id(&doc, "btn")), None);
    }

    #[test]
    fn interactive_wrapper_requires_heading_and_start() {
        let doc = page(
            r#"
body:
  - tag: div
    attrs: { id: link, role: link, data-href: "https://medium.com/p/1" }
    children:
      - tag: h2
        children: ["Clickable story"]
      - tag: span
        children:
          - tag: button
            attrs: { id: btn }
  - tag: div
    attrs: { id: bare, role: link, data-href: "https://medium.com/p/2" }
    children:
      - tag: button
        attrs: { id: other }
"#,
        );
        let found = resolver().resolve(&doc, id(&doc, "btn")).unwrap();
        assert_eq!(found.card, id(&doc, "link"));
        assert_eq!(found.rule, RuleName::InteractiveWrapper);

        assert_eq!(
            verdict(&doc, RuleName::InteractiveWrapper, "other", "bare"),
            Verdict::Pass
        );
        assert_eq!(
            verdict(&doc, RuleName::InteractiveWrapper, "other", "link"),
            Verdict::Pass
        );
    }

    #[test]
    fn feed_wrapper_prefers_inner_unit() {
        let doc = page(
            r#"
body:
  - tag: div
    attrs: { id: feed, class: "pj n y" }
    children:
      - tag: div
        children:
          - tag: button
            attrs: { id: btn }
      - tag: section
        children:
          - tag: article
            attrs: { id: card, data-testid: post-preview }
"#,
        );
        let found = resolver().resolve(&doc, id(&doc, "btn")).unwrap();
        assert_eq!(found.card, id(&doc, "card"));
        assert_eq!(found.rule, RuleName::FeedWrapper);
        assert_eq!(found.hops, 2);
    }

    #[test]
    fn stops_at_root_boundary() {
        let doc = page(
            r#"
body:
  - tag: div
    attrs: { id: root }
    children:
      - tag: div
        children:
          - tag: button
            attrs: { id: btn }
"#,
        );
        assert_eq!(resolver().resolve(&doc, id(&doc, "btn")), None);
    }

    #[test]
    fn detached_subtree_without_card_is_a_miss() {
        let mut doc = page(
            r#"
body:
  - tag: div
    attrs: { id: orphan }
    children:
      - tag: button
        attrs: { id: btn }
"#,
        );
        let orphan = id(&doc, "orphan");
        let btn = id(&doc, "btn");
        doc.detach(orphan);
        assert_eq!(resolver().resolve(&doc, btn), None);
    }

    /// `wrap` (a unit wrapper) sits exactly `hops` ancestors above `btn`.
    fn card_above(hops: usize) -> Document {
        let mut yaml = String::from(
            "body:\n  - tag: div\n    attrs: { id: wrap }\n    children:\n      - tag: article\n        attrs: { data-testid: post-preview }\n",
        );
        let mut indent = 6;
        for _ in 1..hops {
            let pad = " ".repeat(indent);
            yaml.push_str(&format!("{pad}- tag: div\n{pad}  children:\n"));
            indent += 4;
        }
        let pad = " ".repeat(indent);
        yaml.push_str(&format!("{pad}- tag: button\n{pad}  attrs: {{ id: btn }}\n"));
        page(&yaml)
    }

    #[test]
    fn walk_is_bounded_by_hop_cap() {
        let doc = card_above(22);
        let btn = id(&doc, "btn");
        assert_eq!(resolver().resolve(&doc, btn), None);

        let found = resolver().with_max_hops(40).resolve(&doc, btn).unwrap();
        assert_eq!(found.card, id(&doc, "wrap"));
        assert_eq!(found.hops, 22);
    }

    #[test]
    fn last_reachable_ancestor_is_fourteen_hops_up() {
        let doc = card_above(14);
        let found = resolver().resolve(&doc, id(&doc, "btn")).unwrap();
        assert_eq!(found.card, id(&doc, "wrap"));
        assert_eq!(found.rule, RuleName::UnitWrapper);
        assert_eq!(found.hops, 14);

        let doc = card_above(15);
        assert_eq!(resolver().resolve(&doc, id(&doc, "btn")), None);
        let found = resolver().with_max_hops(16).resolve(&doc, id(&doc, "btn")).unwrap();
        assert_eq!(found.hops, 15);
    }

    #[test]
    fn never_selects_a_node_spanning_several_units() {
        let doc = page(STAFF_PICKS);
        let signatures = SignatureTable::default();
        let resolver = resolver();
        for marker in signatures.member_button.select_all(&doc, doc.body()) {
            if let Some(found) = resolver.resolve(&doc, marker) {
                let units = signatures
                    .section_item
                    .select_inclusive(&doc, found.card)
                    .len();
                assert!(units <= 1, "card spans {units} items");
            }
        }
    }
}
