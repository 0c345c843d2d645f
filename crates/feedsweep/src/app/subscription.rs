//! Persistent subscription to subtree insertions.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::app::sweeper::Sweeper;
use crate::domain::dom::Dom;
use crate::domain::model::SweepReport;
use crate::domain::mutation::MutationRecord;

/// Cloneable handle that permanently ends a [`Subscription`].
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Observes insertions anywhere under `root` and sweeps each inserted element.
///
/// Lives for the whole page session unless stopped through its [`StopHandle`].
#[derive(Debug)]
pub struct Subscription<N> {
    root: N,
    stop: StopHandle,
}

impl<N: Copy + Eq> Subscription<N> {
    pub fn observe(root: N) -> Self {
        Self {
            root,
            stop: StopHandle::default(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_active(&self) -> bool {
        !self.stop.is_stopped()
    }

    /// Process one batch synchronously. Each inserted element is swept on its
    /// own, never the whole document.
    pub fn deliver<D>(
        &self,
        dom: &mut D,
        sweeper: &Sweeper,
        batch: Vec<MutationRecord<N>>,
    ) -> SweepReport
    where
        D: Dom<Node = N>,
    {
        let mut report = SweepReport::default();
        if !self.is_active() {
            tracing::debug!(records = batch.len(), "subscription stopped, dropping batch");
            return report;
        }

        for record in batch {
            if !dom.contains(self.root, record.target) {
                continue;
            }
            for node in record.added {
                if !dom.is_element(node) {
                    continue;
                }
                if is_interesting(dom, sweeper, node) {
                    tracing::debug!(node = %dom.describe(node), "inserted node may hold cards, scanning it");
                }
                report.merge(sweeper.sweep(dom, node));
            }
        }
        report
    }
}

/// Whether an inserted node is worth a trace line: a unit, or holding one or a marker.
fn is_interesting<D: Dom>(dom: &D, sweeper: &Sweeper, node: D::Node) -> bool {
    let signatures = sweeper.resolver().signatures();
    signatures.unit.matches(dom, node)
        || signatures.unit.select_first(dom, node).is_some()
        || signatures.member_icon.select_first(dom, node).is_some()
        || signatures.member_button.select_first(dom, node).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::resolver::CardResolver;
    use crate::app::signatures::SignatureTable;
    use crate::domain::mutation::MutationSource;
    use crate::infra::document::{Document, NodeSpec};

    fn sweeper() -> Sweeper {
        Sweeper::new(CardResolver::new(Arc::new(SignatureTable::default())))
    }

    fn card(id: &str, member: bool) -> NodeSpec {
        let button = if member {
            r#"[{ tag: button, attrs: { aria-label: "Member-only story" } }]"#
        } else {
            "[]"
        };
        serde_yaml::from_str(&format!(
            "{{ tag: article, attrs: {{ id: {id}, data-testid: post-preview }}, children: {button} }}"
        ))
        .expect("card spec")
    }

    fn feed() -> Document {
        Document::from_yaml(
            r#"
body:
  - tag: div
    attrs: { id: feed }
    children:
      - tag: article
        attrs: { id: old, data-testid: post-preview }
        children:
          - tag: h2
            children: ["Old story"]
"#,
        )
        .expect("fixture parses")
    }

    #[test]
    fn sweeps_only_inserted_subtrees() {
        let mut doc = feed();
        let sweeper = sweeper();
        let subscription = Subscription::observe(doc.body());
        let feed = doc.find_by_id("feed").unwrap();

        doc.insert(feed, &card("fresh", true));
        doc.insert(feed, &card("kept", false));
        let batch = doc.take_records();
        let report = subscription.deliver(&mut doc, &sweeper, batch);

        assert_eq!(report.removed, 1);
        assert_eq!(report.markers, 1);
        assert!(doc.find_by_id("fresh").is_none());
        assert!(doc.find_by_id("kept").is_some());
        assert!(doc.find_by_id("old").is_some());
    }

    #[test]
    fn does_not_rescan_existing_markers() {
        let mut doc = feed();
        let sweeper = sweeper();
        let subscription = Subscription::observe(doc.body());
        let feed = doc.find_by_id("feed").unwrap();
        // Pre-existing marker that a whole-document rescan would catch.
        doc.append(feed, &card("unswept", true));

        doc.insert(feed, &card("kept", false));
        let batch = doc.take_records();
        let report = subscription.deliver(&mut doc, &sweeper, batch);

        assert!(report.is_empty());
        assert!(doc.find_by_id("unswept").is_some());
    }

    #[test]
    fn ignores_insertions_outside_observed_root() {
        let mut doc = feed();
        let sweeper = sweeper();
        let feed = doc.find_by_id("feed").unwrap();
        let subscription = Subscription::observe(feed);
        let body = doc.body();

        doc.insert(body, &card("outside", true));
        let batch = doc.take_records();
        let report = subscription.deliver(&mut doc, &sweeper, batch);

        assert!(report.is_empty());
        assert!(doc.find_by_id("outside").is_some());
    }

    #[test]
    fn stop_handle_ends_processing() {
        let mut doc = feed();
        let sweeper = sweeper();
        let subscription = Subscription::observe(doc.body());
        let handle = subscription.stop_handle();
        let feed = doc.find_by_id("feed").unwrap();

        handle.stop();
        assert!(!subscription.is_active());

        doc.insert(feed, &card("late", true));
        let batch = doc.take_records();
        let report = subscription.deliver(&mut doc, &sweeper, batch);

        assert!(report.is_empty());
        assert!(doc.find_by_id("late").is_some());
    }

    #[test]
    fn text_insertions_are_skipped() {
        let mut doc = feed();
        let sweeper = sweeper();
        let subscription = Subscription::observe(doc.body());
        let feed = doc.find_by_id("feed").unwrap();

        doc.insert(feed, &NodeSpec::Text("loading…".into()));
        let batch = doc.take_records();
        assert!(subscription.deliver(&mut doc, &sweeper, batch).is_empty());
    }
}
