//! Prometheus exposition of the rebalancer's state.
//!
//! `RebalancerCollector` reads the shared state on every scrape, so the
//! values are always those of the last completed step and never a partially
//! updated cycle. Two series are exported:
//!
//! - `rebalancer_crushweight{osd}`: last weight applied (or simulated) per OSD,
//!   including OSDs that have since left the managed set.
//! - `rebalancer_target_osds_total`: OSDs still being reweighted.

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, IntGauge, Opts, Registry, TextEncoder};

use crate::state::SharedState;

pub const CRUSH_WEIGHT_METRIC: &str = "rebalancer_crushweight";
pub const TARGET_OSDS_METRIC: &str = "rebalancer_target_osds_total";

pub struct RebalancerCollector {
    state: SharedState,
    crush_weight: GaugeVec,
    target_osds: IntGauge,
}

impl RebalancerCollector {
    pub fn new(state: SharedState) -> Result<Self, prometheus::Error> {
        let crush_weight = GaugeVec::new(
            Opts::new(CRUSH_WEIGHT_METRIC, "Crush Weight set for a given OSD"),
            &["osd"],
        )?;
        let target_osds = IntGauge::new(
            TARGET_OSDS_METRIC,
            "Count of target OSDs still left to be upweighted",
        )?;
        Ok(RebalancerCollector {
            state,
            crush_weight,
            target_osds,
        })
    }
}

impl Collector for RebalancerCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.crush_weight.desc();
        descs.extend(self.target_osds.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        // Held for the whole scrape: concurrent scrapes must not interleave
        // their reset/set on the shared gauges.
        let state = self.state.lock();

        self.crush_weight.reset();
        for (osd, weight) in state.tracker().iter() {
            self.crush_weight
                .with_label_values(&[osd.to_string().as_str()])
                .set(weight);
        }
        self.target_osds.set(state.remaining() as i64);

        let mut families = self.crush_weight.collect();
        families.extend(self.target_osds.collect());
        families
    }
}

/// Gather a registry into the Prometheus text format.
pub fn render(registry: &Registry) -> Result<String, prometheus::Error> {
    let mut buffer = String::new();
    TextEncoder::new().encode_utf8(&registry.gather(), &mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RebalanceState;

    fn registry_for(state: &SharedState) -> Registry {
        let registry = Registry::new();
        registry
            .register(Box::new(RebalancerCollector::new(state.clone()).unwrap()))
            .unwrap();
        registry
    }

    #[test]
    fn exports_ledger_and_remaining() {
        let state = RebalanceState::shared([(1, 2.0), (2, 2.0)].into_iter().collect());
        state.lock().tracker_mut().record_applied(1, 0.5);
        let text = render(&registry_for(&state)).unwrap();
        assert!(text.contains("rebalancer_crushweight{osd=\"1\"} 0.5"));
        assert!(text.contains("rebalancer_target_osds_total 2"));
        assert!(!text.contains("osd=\"2\""));
    }

    #[test]
    fn retired_osds_keep_their_weight() {
        let state = RebalanceState::shared([(7, 2.0)].into_iter().collect());
        {
            let mut s = state.lock();
            s.tracker_mut().record_applied(7, 2.0);
            s.remove_target(7);
        }
        let text = render(&registry_for(&state)).unwrap();
        assert!(text.contains("rebalancer_crushweight{osd=\"7\"} 2"));
        assert!(text.contains("rebalancer_target_osds_total 0"));
    }

    #[test]
    fn scrape_follows_state_changes() {
        let state = RebalanceState::shared([(1, 2.0)].into_iter().collect());
        let registry = registry_for(&state);
        state.lock().tracker_mut().record_applied(1, 1.0);
        assert!(render(&registry).unwrap().contains("osd=\"1\"} 1"));
        state.lock().tracker_mut().record_applied(1, 1.5);
        let text = render(&registry).unwrap();
        assert!(text.contains("osd=\"1\"} 1.5"));
        assert!(!text.contains("osd=\"1\"} 1\n"));
    }

    #[test]
    fn double_registration_is_rejected() {
        let state = RebalanceState::shared([(1, 2.0)].into_iter().collect());
        let registry = registry_for(&state);
        let again = RebalancerCollector::new(state).unwrap();
        assert!(registry.register(Box::new(again)).is_err());
    }
}
