//! Subtree-insertion notifications.

/// One "nodes were inserted under `target`" notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
    pub target: N,
    pub added: Vec<N>,
}

/// Source of insertion records, delivered after the fact in batches.
///
/// Records are observational: by the time they are taken the insertions
/// have already happened and cannot be intercepted.
pub trait MutationSource {
    type Node;

    /// Drain every record accumulated since the last call as one batch.
    fn take_records(&mut self) -> Vec<MutationRecord<Self::Node>>;
}
