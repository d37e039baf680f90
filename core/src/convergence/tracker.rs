//! Applied-weight ledger.
//!
//! Remembers the last weight this controller issued (or, in dry-run, would
//! have issued) per OSD. Entries are overwritten, never removed, so the
//! ledger outlives the OSD's membership in the managed set. It is not a
//! source of truth for the live weight; the snapshot is.

use std::collections::BTreeMap;

use crate::types::topology::OsdId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvergenceTracker {
    applied: BTreeMap<OsdId, f64>,
}

impl ConvergenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&mut self, osd: OsdId, weight: f64) {
        self.applied.insert(osd, weight);
    }

    pub fn last_applied(&self, osd: OsdId) -> Option<f64> {
        self.applied.get(&osd).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OsdId, f64)> + '_ {
        self.applied.iter().map(|(&osd, &w)| (osd, w))
    }

    /// Owned copy of the ledger, for readers on other threads.
    pub fn to_map(&self) -> BTreeMap<OsdId, f64> {
        self.applied.clone()
    }
}
