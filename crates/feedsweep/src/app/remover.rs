//! Startup wiring: one initial sweep after the first paint, then a scoped
//! sweep for every batch of insertions.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::app::signatures::SignatureTable;
use crate::app::subscription::{StopHandle, Subscription};
use crate::app::sweeper::Sweeper;
use crate::domain::dom::Dom;
use crate::domain::model::SweepReport;
use crate::domain::mutation::{MutationRecord, MutationSource};
use crate::infra::config::Config;

/// Owns the sweeper and the page-lifetime subscription.
#[derive(Debug)]
pub struct Remover<N> {
    sweeper: Sweeper,
    subscription: Option<Subscription<N>>,
    paint_pending: bool,
    total: SweepReport,
}

impl<N: Copy + Eq> Remover<N> {
    pub fn new(sweeper: Sweeper) -> Self {
        Self {
            sweeper,
            subscription: None,
            paint_pending: false,
            total: SweepReport::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let signatures = SignatureTable::compile(&config.signatures)
            .context("failed to compile signature table")?;
        tracing::debug!(version = %signatures.version, max_hops = config.resolver.max_hops(), "signature table compiled");
        Ok(Self::new(Sweeper::from_signatures(
            Arc::new(signatures),
            config.resolver.max_hops(),
        )))
    }

    pub fn sweeper(&self) -> &Sweeper {
        &self.sweeper
    }

    /// Subscribe to insertions under the document body and schedule the
    /// initial sweep for the next paint. Calling it again keeps the existing
    /// subscription.
    pub fn start<D: Dom<Node = N>>(&mut self, dom: &D) -> StopHandle {
        if let Some(subscription) = &self.subscription {
            return subscription.stop_handle();
        }
        let subscription = Subscription::observe(dom.body());
        let handle = subscription.stop_handle();
        self.subscription = Some(subscription);
        self.paint_pending = true;
        tracing::info!(
            version = %self.sweeper.resolver().signatures().version,
            "member-only card remover active"
        );
        handle
    }

    /// One-shot: sweeps the whole document the first time it runs after `start`.
    pub fn on_paint<D: Dom<Node = N>>(&mut self, dom: &mut D) -> SweepReport {
        if !std::mem::take(&mut self.paint_pending) {
            return SweepReport::default();
        }
        tracing::info!("initial scan triggered after paint");
        let report = self.sweeper.sweep_document(dom);
        tracing::info!(%report, "initial scan complete");
        self.total.merge(report);
        report
    }

    pub fn on_mutations<D: Dom<Node = N>>(
        &mut self,
        dom: &mut D,
        batch: Vec<MutationRecord<N>>,
    ) -> SweepReport {
        let Some(subscription) = &self.subscription else {
            return SweepReport::default();
        };
        let report = subscription.deliver(dom, &self.sweeper, batch);
        self.total.merge(report);
        report
    }

    /// Take whatever insertions the source accumulated and handle them as one batch.
    pub fn pump<D>(&mut self, dom: &mut D) -> SweepReport
    where
        D: Dom<Node = N> + MutationSource<Node = N>,
    {
        let batch = dom.take_records();
        if batch.is_empty() {
            return SweepReport::default();
        }
        self.on_mutations(dom, batch)
    }

    /// Totals across every sweep this remover has run.
    pub fn total(&self) -> SweepReport {
        self.total
    }
}
