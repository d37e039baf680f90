//! Wire models for the parts of `ceph osd tree` and `ceph status` the
//! controller reads. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Numeric node id as reported by the OSD tree. OSDs are non-negative,
/// CRUSH buckets (hosts, racks, root) are negative.
pub type OsdId = i64;

/// The `type` tag carried by storage-node entries.
pub const OSD_NODE_TYPE: &str = "osd";

/// Parsed output of `ceph osd tree --format json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OsdTree {
    #[serde(default)]
    pub nodes: Vec<OsdNode>,
    #[serde(default)]
    pub stray: Vec<OsdNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OsdNode {
    pub id: OsdId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reweight: f64,
    #[serde(default)]
    pub crush_weight: f64,
}

impl OsdNode {
    /// A storage-node entry with the given CRUSH weight.
    pub fn osd(id: OsdId, crush_weight: f64) -> Self {
        OsdNode {
            id,
            name: format!("osd.{}", id),
            kind: OSD_NODE_TYPE.to_string(),
            status: "up".to_string(),
            reweight: 1.0,
            crush_weight,
        }
    }

    pub fn is_osd(&self) -> bool {
        self.kind == OSD_NODE_TYPE
    }
}

impl OsdTree {
    /// Iterate over storage-node entries only, skipping CRUSH buckets.
    pub fn osds(&self) -> impl Iterator<Item = &OsdNode> {
        self.nodes.iter().filter(|n| n.is_osd())
    }
}

/// Parsed output of `ceph status --format json`, reduced to the PG map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterStatus {
    #[serde(default)]
    pub pgmap: PgMap,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PgMap {
    #[serde(default)]
    pub num_pgs: f64,
    #[serde(default)]
    pub pgs_by_state: Vec<PgStateCount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PgStateCount {
    pub count: f64,
    /// Compound state such as `active+remapped+backfill_wait`.
    pub state_name: String,
}

impl ClusterStatus {
    /// Sum PG counts over every state entry containing any of `states`.
    ///
    /// An entry is counted once per matching state, so
    /// `active+backfilling+backfill_wait` contributes twice when both are asked for.
    pub fn pgs_in_states(&self, states: &[&str]) -> u64 {
        let mut count: u64 = 0;
        for entry in &self.pgmap.pgs_by_state {
            for state in states {
                if entry.state_name.contains(state) {
                    count += entry.count.max(0.0) as u64;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osd_tree_parses_ceph_output() {
        let json = r#"{
            "nodes": [
                {"id": -1, "name": "default", "type": "root", "type_id": 11, "children": [-3]},
                {"id": -3, "name": "host-a", "type": "host", "type_id": 1, "children": [0, 1]},
                {"id": 0, "device_class": "hdd", "name": "osd.0", "type": "osd", "type_id": 0,
                 "crush_weight": 1.81898, "depth": 2, "pool_weights": {}, "exists": 1,
                 "status": "up", "reweight": 1, "primary_affinity": 1},
                {"id": 1, "name": "osd.1", "type": "osd", "crush_weight": 0.5,
                 "status": "up", "reweight": 1}
            ],
            "stray": []
        }"#;
        let tree: OsdTree = serde_json::from_str(json).unwrap();
        assert_eq!(tree.nodes.len(), 4);
        let osds: Vec<OsdId> = tree.osds().map(|n| n.id).collect();
        assert_eq!(osds, vec![0, 1]);
        assert_eq!(tree.nodes[2].crush_weight, 1.81898);
    }

    #[test]
    fn buckets_default_missing_weight() {
        let tree: OsdTree =
            serde_json::from_str(r#"{"nodes": [{"id": -1, "name": "default", "type": "root"}]}"#)
                .unwrap();
        assert_eq!(tree.nodes[0].crush_weight, 0.0);
        assert!(tree.stray.is_empty());
        assert_eq!(tree.osds().count(), 0);
    }

    #[test]
    fn pg_counts_match_substates() {
        let json = r#"{
            "pgmap": {
                "num_pgs": 512,
                "pgs_by_state": [
                    {"state_name": "active+clean", "count": 480},
                    {"state_name": "active+remapped+backfill_wait", "count": 20},
                    {"state_name": "active+remapped+backfilling", "count": 4},
                    {"state_name": "active+recovery_wait+degraded", "count": 6},
                    {"state_name": "active+recovering+degraded", "count": 2}
                ]
            }
        }"#;
        let status: ClusterStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.pgs_in_states(&["backfilling", "backfill_wait"]), 24);
        assert_eq!(status.pgs_in_states(&["recovering", "recovery_wait"]), 8);
    }

    #[test]
    fn entry_counts_once_per_matching_state() {
        let status = ClusterStatus {
            pgmap: PgMap {
                num_pgs: 3.0,
                pgs_by_state: vec![PgStateCount {
                    count: 3.0,
                    state_name: "active+backfilling+backfill_wait".into(),
                }],
            },
        };
        assert_eq!(status.pgs_in_states(&["backfilling", "backfill_wait"]), 6);
        assert_eq!(status.pgs_in_states(&["backfilling"]), 3);
    }

    #[test]
    fn empty_status_counts_zero() {
        let status: ClusterStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status.pgs_in_states(&["backfilling"]), 0);
    }
}
