//! ProcessedSetTracker - scan-once bookkeeping per text leaf
//!
//! Membership is keyed by generational `NodeId`, so the set never extends a
//! leaf's lifetime: when the host tree drops the leaf the id dies with it
//! and the stale entry can never match again. Monotonic between mutations:
//! scan -> mark processed -> only an invalidation clears the mark.

use crate::dom::{NodeId, PageTree};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tracker statistics (diagnostics)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessedStats {
    pub checks: u64,
    pub hits: u64,
    pub invalidations: u64,
}

impl ProcessedStats {
    /// Share of checks short-circuited by an existing mark
    pub fn skip_rate(&self) -> f64 {
        if self.checks == 0 {
            return 0.0;
        }
        (self.hits as f64 / self.checks as f64) * 100.0
    }
}

/// Identity-keyed, non-owning processed-leaf set
#[derive(Debug, Default)]
pub struct ProcessedSet {
    seen: HashSet<NodeId>,
    stats: ProcessedStats,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processed(&mut self, leaf: NodeId) -> bool {
        self.stats.checks += 1;
        let hit = self.seen.contains(&leaf);
        if hit {
            self.stats.hits += 1;
        }
        hit
    }

    pub fn mark_processed(&mut self, leaf: NodeId) {
        self.seen.insert(leaf);
    }

    pub fn invalidate(&mut self, leaf: NodeId) {
        if self.seen.remove(&leaf) {
            self.stats.invalidations += 1;
        }
    }

    /// Invalidate a leaf plus its text-leaf siblings.
    ///
    /// Conservative mode needs the siblings too: an insertion next to an
    /// unmarked leaf can complete a cross-node match the pair scan already
    /// passed over.
    pub fn invalidate_with_siblings(&mut self, tree: &PageTree, leaf: NodeId) {
        self.invalidate(leaf);
        if let Some(parent) = tree.parent(leaf) {
            let siblings: Vec<NodeId> = tree
                .children(parent)
                .iter()
                .copied()
                .filter(|&sibling| sibling != leaf && tree.is_text(sibling))
                .collect();
            for sibling in siblings {
                self.invalidate(sibling);
            }
        }
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn stats(&self) -> &ProcessedStats {
        &self.stats
    }
}

// ==================== TESTS ====================
