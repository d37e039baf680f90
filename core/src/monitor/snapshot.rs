//! Current-state snapshot: live CRUSH weights for the managed OSDs.
//!
//! Read fresh every cycle and never cached. Only `osd` entries count; CRUSH
//! buckets share the id space (with negative ids) and are skipped.

use std::collections::BTreeMap;

use crate::errors::CephError;
use crate::infrastructure::CephClient;
use crate::types::topology::OsdId;

/// The managed subset of one `osd tree` response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightSnapshot {
    /// Current CRUSH weight of every managed OSD present in the tree.
    pub weights: BTreeMap<OsdId, f64>,
    /// Managed OSDs the tree does not contain.
    pub missing: Vec<OsdId>,
    /// Storage-node entries in the whole response, managed or not.
    pub osds_seen: usize,
}

impl WeightSnapshot {
    /// The tree held no storage nodes at all.
    pub fn is_empty_topology(&self) -> bool {
        self.osds_seen == 0
    }
}

/// Fetch the topology and project it onto `managed`.
pub fn take_snapshot<'a, I>(
    client: &dyn CephClient,
    managed: I,
) -> Result<WeightSnapshot, CephError>
where
    I: IntoIterator<Item = &'a OsdId>,
{
    let tree = client.current_topology()?;

    let mut all = BTreeMap::new();
    for node in tree.osds() {
        all.insert(node.id, node.crush_weight);
    }

    let mut snapshot = WeightSnapshot {
        osds_seen: all.len(),
        ..WeightSnapshot::default()
    };
    for &osd in managed {
        match all.get(&osd) {
            Some(&weight) => {
                snapshot.weights.insert(osd, weight);
            }
            None => snapshot.missing.push(osd),
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockCeph;
    use crate::types::topology::OsdNode;

    #[test]
    fn projects_onto_managed_ids() {
        let mock = MockCeph::with_osds(&[(1, 0.5), (2, 1.0), (3, 2.0)]);
        let snap = take_snapshot(&mock, &[1, 3]).unwrap();
        assert_eq!(snap.weights, [(1, 0.5), (3, 2.0)].into_iter().collect());
        assert!(snap.missing.is_empty());
        assert_eq!(snap.osds_seen, 3);
    }

    #[test]
    fn buckets_are_ignored() {
        let mock = MockCeph::with_osds(&[(1, 0.5)]);
        mock.push_node(OsdNode {
            id: 2,
            name: "host-2".into(),
            kind: "host".into(),
            crush_weight: 9.0,
            ..OsdNode::default()
        });
        let snap = take_snapshot(&mock, &[1, 2]).unwrap();
        assert_eq!(snap.weights.len(), 1);
        assert_eq!(snap.missing, vec![2]);
    }

    #[test]
    fn reports_missing_ids() {
        let mock = MockCeph::with_osds(&[(1, 0.5)]);
        let snap = take_snapshot(&mock, &[1, 7, 9]).unwrap();
        assert_eq!(snap.missing, vec![7, 9]);
    }

    #[test]
    fn empty_topology_is_flagged() {
        let mock = MockCeph::new();
        let snap = take_snapshot(&mock, &[1, 2]).unwrap();
        assert!(snap.is_empty_topology());
        assert_eq!(snap.missing, vec![1, 2]);
    }

    #[test]
    fn query_failure_propagates() {
        let mock = MockCeph::new();
        mock.fail_topology(true);
        assert!(take_snapshot(&mock, &[1]).is_err());
    }
}
