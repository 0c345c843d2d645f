//! Marker discovery and guarded card removal.

use std::sync::Arc;

use crate::app::resolver::CardResolver;
use crate::app::signatures::SignatureTable;
use crate::domain::dom::Dom;
use crate::domain::model::{MarkerKind, MarkerOutcome, SweepReport};

/// One pass of marker discovery, resolution, and guarded removal.
#[derive(Debug, Clone)]
pub struct Sweeper {
    resolver: CardResolver,
}

impl Sweeper {
    pub fn new(resolver: CardResolver) -> Self {
        Self { resolver }
    }

    pub fn from_signatures(signatures: Arc<SignatureTable>, max_hops: usize) -> Self {
        Self::new(CardResolver::new(signatures).with_max_hops(max_hops))
    }

    pub fn resolver(&self) -> &CardResolver {
        &self.resolver
    }

    /// Sweep the whole document body.
    pub fn sweep_document<D: Dom>(&self, dom: &mut D) -> SweepReport {
        let body = dom.body();
        self.sweep(dom, body)
    }

    /// Remove the card of every marker found in `root` (inclusive).
    ///
    /// Icons are handled before buttons are even looked up, so a button
    /// inside a card already removed through its icon is never visited.
    pub fn sweep<D: Dom>(&self, dom: &mut D, root: D::Node) -> SweepReport {
        let signatures = self.resolver.signatures();
        let mut report = SweepReport::default();
        tracing::debug!(root = %dom.describe(root), "scanning subtree");

        let icons = signatures.member_icon.select_inclusive(&*dom, root);
        tracing::debug!(count = icons.len(), "found member icons");
        for (idx, icon) in icons.iter().enumerate() {
            tracing::debug!(index = idx + 1, total = icons.len(), icon = %dom.describe(*icon), "processing icon");
            let start = dom
                .closest(*icon, |node| signatures.interactive_ancestor.matches(&*dom, node))
                .unwrap_or(*icon);
            report.record(self.process(dom, MarkerKind::Icon, start));
        }

        let buttons = signatures.member_button.select_inclusive(&*dom, root);
        tracing::debug!(count = buttons.len(), "found member buttons");
        for (idx, button) in buttons.iter().enumerate() {
            tracing::debug!(index = idx + 1, total = buttons.len(), button = %dom.describe(*button), "processing button");
            report.record(self.process(dom, MarkerKind::Button, *button));
        }

        tracing::debug!(root = %dom.describe(root), %report, "scan finished");
        report
    }

    fn process<D: Dom>(&self, dom: &mut D, kind: MarkerKind, start: D::Node) -> MarkerOutcome {
        let Some(resolution) = self.resolver.resolve(&*dom, start) else {
            tracing::debug!(marker = %kind, start = %dom.describe(start), "no card found for marker");
            return MarkerOutcome::Miss;
        };
        let card = resolution.card;
        let title = card_title(&*dom, self.resolver.signatures(), card);

        if is_protected_container(&*dom, self.resolver.signatures(), card) {
            tracing::warn!(
                marker = %kind,
                card = %dom.describe(card),
                "resolved card is the protected section container, skipping removal"
            );
            return MarkerOutcome::Guarded;
        }

        if !dom.is_attached(card) {
            tracing::debug!(marker = %kind, %title, "card already removed or not in document");
            return MarkerOutcome::Stale;
        }

        tracing::info!(
            marker = %kind,
            rule = %resolution.rule,
            card = %dom.describe(card),
            %title,
            "removing member-only card"
        );
        dom.detach(card);
        MarkerOutcome::Removed
    }
}

/// Independent re-check that `card` is not the protected section container,
/// regardless of which rule selected it.
pub fn is_protected_container<D: Dom>(dom: &D, signatures: &SignatureTable, card: D::Node) -> bool {
    let Some(heading) = signatures.heading.select_first(dom, card) else {
        return false;
    };
    if dom.text_content(heading).trim() != signatures.section_title {
        return false;
    }
    signatures.section_container.matches(dom, card)
        || dom
            .parent(heading)
            .is_some_and(|parent| signatures.section_heading_parent.matches(dom, parent))
}

/// Best-effort label for a card: heading text, then link target, then a placeholder.
pub fn card_title<D: Dom>(dom: &D, signatures: &SignatureTable, card: D::Node) -> String {
    if let Some(text) = signatures.heading_text(dom, card) {
        return text;
    }
    if let Some(href) = signatures
        .title_link
        .select_first(dom, card)
        .and_then(|link| dom.attribute(link, "data-href"))
    {
        return href.to_owned();
    }
    dom.first_descendant(card, |node| dom.tag_name(node) == "a")
        .and_then(|link| dom.attribute(link, "href"))
        .map(str::to_owned)
        .unwrap_or_else(|| "No title/link found".to_owned())
}
