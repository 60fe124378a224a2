//! ScanScheduler - trailing-edge debounce over page change events
//!
//! Mutations, scrolls, and resizes all collapse into at most one `scan()`
//! per quiescence window. Each new observation resets the pending deadline,
//! so only the last event of a burst produces a scan. Time is whatever
//! clock the host supplies as `f64` milliseconds (`Date.now()` in the
//! browser, plain literals in tests), which keeps the scheduler a passive
//! state machine with no timer thread.

use crate::dom::NodeId;
use serde::{Deserialize, Serialize};

/// Default quiescence window
pub const DEBOUNCE_MS: f64 = 200.0;

/// Inbound page change event, one tagged queue for every source
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    /// Host (or renderer) attached nodes under the document root
    NodesAdded(Vec<NodeId>),
    Scrolled,
    Resized,
    /// Feature flag transition delivered by the external controller
    FeatureToggled(bool),
}

/// Scheduler statistics (diagnostics)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub observed: u64,
    pub fired: u64,
}

/// Trailing-edge debouncer
#[derive(Debug)]
pub struct ScanScheduler {
    window_ms: f64,
    deadline_ms: Option<f64>,
    stats: SchedulerStats,
}

impl ScanScheduler {
    pub fn new(window_ms: f64) -> Self {
        Self {
            window_ms,
            deadline_ms: None,
            stats: SchedulerStats::default(),
        }
    }

    /// Record a change observation, resetting the pending deadline
    pub fn observe(&mut self, now_ms: f64) {
        self.stats.observed += 1;
        self.deadline_ms = Some(now_ms + self.window_ms);
    }

    /// True exactly once per quiesced burst, when the deadline has passed
    pub fn fire_due(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                self.stats.fired += 1;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending deadline (feature disabled)
    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }
}

impl Default for ScanScheduler {
    fn default() -> Self {
        Self::new(DEBOUNCE_MS)
    }
}

// ==================== TESTS ====================
