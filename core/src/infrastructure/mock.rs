//! In-memory cluster for testing.
//!
//! Records every reweight and serves a controllable topology and PG counts,
//! making it easy to write deterministic tests for the controller. Clones
//! share state, so a test can keep one handle while the controller owns another.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;

use super::CephClient;
use crate::errors::CephError;
use crate::types::topology::{OsdId, OsdNode, OsdTree};

#[derive(Debug, Default)]
struct MockState {
    tree: OsdTree,
    backfilling: u64,
    recovering: u64,
    fail_counts: bool,
    fail_topology: bool,
    reject_reweight: BTreeSet<OsdId>,
    reweights: Vec<(OsdId, f64)>,
    queries: u32,
    closed: bool,
}

/// A test-double cluster. Reweighting an OSD updates its CRUSH weight in the
/// served topology, so successive cycles observe progress.
#[derive(Debug, Clone, Default)]
pub struct MockCeph {
    state: Arc<Mutex<MockState>>,
}

impl MockCeph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cluster whose topology holds the given `(id, crush_weight)` OSDs.
    pub fn with_osds(osds: &[(OsdId, f64)]) -> Self {
        let mock = Self::new();
        mock.state.lock().tree.nodes = osds.iter().map(|&(id, w)| OsdNode::osd(id, w)).collect();
        mock
    }

    /// Add a raw topology entry (buckets, non-osd kinds).
    pub fn push_node(&self, node: OsdNode) {
        self.state.lock().tree.nodes.push(node);
    }

    pub fn set_backfilling(&self, count: u64) {
        self.state.lock().backfilling = count;
    }

    pub fn set_recovering(&self, count: u64) {
        self.state.lock().recovering = count;
    }

    /// Make both PG count queries fail.
    pub fn fail_counts(&self, fail: bool) {
        self.state.lock().fail_counts = fail;
    }

    /// Make the topology query fail.
    pub fn fail_topology(&self, fail: bool) {
        self.state.lock().fail_topology = fail;
    }

    /// Reject reweights of the given OSD until cleared.
    pub fn reject_reweight(&self, osd: OsdId, reject: bool) {
        let mut state = self.state.lock();
        if reject {
            state.reject_reweight.insert(osd);
        } else {
            state.reject_reweight.remove(&osd);
        }
    }

    /// Overwrite an OSD's CRUSH weight as if changed out of band.
    pub fn set_crush_weight(&self, osd: OsdId, weight: f64) {
        let mut state = self.state.lock();
        if let Some(node) = state.tree.nodes.iter_mut().find(|n| n.id == osd) {
            node.crush_weight = weight;
        }
    }

    /// All successful reweights, in order.
    pub fn reweights(&self) -> Vec<(OsdId, f64)> {
        self.state.lock().reweights.clone()
    }

    pub fn reweight_count(&self) -> usize {
        self.state.lock().reweights.len()
    }

    /// Last weight applied per OSD.
    pub fn applied_weights(&self) -> BTreeMap<OsdId, f64> {
        self.state.lock().reweights.iter().copied().collect()
    }

    /// Number of read queries (counts + topology) served.
    pub fn query_count(&self) -> u32 {
        self.state.lock().queries
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl CephClient for MockCeph {
    fn backfilling_count(&self) -> Result<u64, CephError> {
        let mut state = self.state.lock();
        state.queries += 1;
        if state.fail_counts {
            return Err(CephError::Rejected("mock: status unavailable".into()));
        }
        Ok(state.backfilling)
    }

    fn recovering_count(&self) -> Result<u64, CephError> {
        let mut state = self.state.lock();
        state.queries += 1;
        if state.fail_counts {
            return Err(CephError::Rejected("mock: status unavailable".into()));
        }
        Ok(state.recovering)
    }

    fn current_topology(&self) -> Result<OsdTree, CephError> {
        let mut state = self.state.lock();
        state.queries += 1;
        if state.fail_topology {
            return Err(CephError::Rejected("mock: osd tree unavailable".into()));
        }
        Ok(state.tree.clone())
    }

    fn set_weight(&mut self, osd: OsdId, weight: f64) -> Result<(), CephError> {
        let mut state = self.state.lock();
        if state.reject_reweight.contains(&osd) {
            return Err(CephError::Rejected(format!("mock: reweight of osd.{} refused", osd)));
        }
        if let Some(node) = state.tree.nodes.iter_mut().find(|n| n.id == osd) {
            node.crush_weight = weight;
        }
        state.reweights.push((osd, weight));
        Ok(())
    }

    fn close(&mut self) {
        self.state.lock().closed = true;
    }
}
