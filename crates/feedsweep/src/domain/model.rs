//! Domain models for markers, sweep outcomes, and reports.

use std::fmt;

use serde::Serialize;

/// How a marker was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerKind {
    /// Iconographic marker (the member star).
    Icon,
    /// Interactive control carrying the member-only accessible label.
    Button,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Icon => "ICON",
            MarkerKind::Button => "BUTTON",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a single marker during a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerOutcome {
    /// The resolved card was detached from the tree.
    Removed,
    /// No card could be resolved within the hop bound.
    Miss,
    /// The resolved card was no longer attached.
    Stale,
    /// The resolved card is a protected section container.
    Guarded,
}

/// Aggregate counts for one or more sweeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub markers: usize,
    pub removed: usize,
    pub misses: usize,
    pub stale: usize,
    pub guarded: usize,
}

impl SweepReport {
    pub fn record(&mut self, outcome: MarkerOutcome) {
        self.markers += 1;
        match outcome {
            MarkerOutcome::Removed => self.removed += 1,
            MarkerOutcome::Miss => self.misses += 1,
            MarkerOutcome::Stale => self.stale += 1,
            MarkerOutcome::Guarded => self.guarded += 1,
        }
    }

    pub fn merge(&mut self, other: SweepReport) {
        self.markers += other.markers;
        self.removed += other.removed;
        self.misses += other.misses;
        self.stale += other.stale;
        self.guarded += other.guarded;
    }

    pub fn is_empty(&self) -> bool {
        self.markers == 0
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "markers: {}, removed: {}, misses: {}, stale: {}, guarded: {}",
            self.markers, self.removed, self.misses, self.stale, self.guarded
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_merge_accumulate() {
        let mut first = SweepReport::default();
        first.record(MarkerOutcome::Removed);
        first.record(MarkerOutcome::Stale);

        let mut second = SweepReport::default();
        second.record(MarkerOutcome::Guarded);
        second.record(MarkerOutcome::Miss);

        first.merge(second);
        assert_eq!(
            first,
            SweepReport {
                markers: 4,
                removed: 1,
                misses: 1,
                stale: 1,
                guarded: 1,
            }
        );
        assert_eq!(
            first.to_string(),
            "markers: 4, removed: 1, misses: 1, stale: 1, guarded: 1"
        );
    }
}
