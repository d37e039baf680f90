//! State shared between the reweight loop and metrics readers.
//!
//! The loop is the only writer. Scrapes run on other threads and take the
//! same lock, so they always see the targets and the ledger from the same
//! instant.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::convergence::tracker::ConvergenceTracker;
use crate::types::topology::OsdId;

#[derive(Debug, Clone, Default)]
pub struct RebalanceState {
    targets: BTreeMap<OsdId, f64>,
    tracker: ConvergenceTracker,
}

pub type SharedState = Arc<Mutex<RebalanceState>>;

/// A consistent point-in-time copy for readers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateView {
    /// Last applied weight per OSD (every OSD ever applied, not just remaining ones).
    pub applied: BTreeMap<OsdId, f64>,
    /// OSDs still waiting to reach their target.
    pub remaining: usize,
}

impl RebalanceState {
    pub fn new(targets: BTreeMap<OsdId, f64>) -> Self {
        RebalanceState {
            targets,
            tracker: ConvergenceTracker::new(),
        }
    }

    pub fn shared(targets: BTreeMap<OsdId, f64>) -> SharedState {
        Arc::new(Mutex::new(Self::new(targets)))
    }

    pub fn targets(&self) -> &BTreeMap<OsdId, f64> {
        &self.targets
    }

    pub fn target(&self, osd: OsdId) -> Option<f64> {
        self.targets.get(&osd).copied()
    }

    /// Drop an OSD from the managed set. There is no way to add it back.
    pub fn remove_target(&mut self, osd: OsdId) -> Option<f64> {
        self.targets.remove(&osd)
    }

    pub fn remaining(&self) -> usize {
        self.targets.len()
    }

    pub fn is_drained(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn tracker(&self) -> &ConvergenceTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut ConvergenceTracker {
        &mut self.tracker
    }

    pub fn view(&self) -> StateView {
        StateView {
            applied: self.tracker.to_map(),
            remaining: self.targets.len(),
        }
    }
}
