//! Rebalancer: the reweight control loop.
//!
//! One cycle is strictly sequential:
//!
//! 1. Drained check: no targets left means nothing to do (no cluster calls).
//! 2. Gate: backfilling/recovering PG counts against their ceilings. Any
//!    hold or query failure ends the cycle with nothing changed.
//! 3. Snapshot: live CRUSH weights for the managed OSDs. A failed query ends
//!    the cycle; OSDs missing from the tree are dropped for good.
//! 4. Per OSD: plan the next weight, then apply it, simulate it, or retire
//!    the OSD. One OSD's failure never stops the others.
//!
//! `run` repeats cycles on a fixed interval until the targets drain or the
//! cancel token trips. Exactly one cycle is ever in flight.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::convergence::executor::{ExecuteOutcome, WeightExecutor};
use crate::convergence::planner::{plan_node, NodePlan};
use crate::errors::RebalancerError;
use crate::infrastructure::CephClient;
use crate::metrics::RebalancerCollector;
use crate::monitor::gate::{check_gate, GateDecision, GateLimits, HoldReason};
use crate::monitor::snapshot::take_snapshot;
use crate::shutdown::CancelToken;
use crate::state::{RebalanceState, SharedState, StateView};
use crate::types::config::RebalancerConfig;
use crate::types::topology::OsdId;

// ---------------------------------------------------------------------------
// Cycle reporting
// ---------------------------------------------------------------------------

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No targets were left; nothing was queried.
    Drained,
    /// The gate held the cycle; nothing was changed.
    Held(HoldReason),
    /// The OSD tree could not be fetched; nothing was changed.
    SnapshotFailed(String),
    /// The OSD tree came back without a single OSD; nothing was changed.
    EmptyTopology,
    /// Every managed OSD was evaluated.
    Completed,
}

/// Why an OSD left the managed set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Removal {
    TargetReached,
    Plateaued,
    NonPositiveWeight,
    MissingFromTopology,
}

/// Everything one cycle did, for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    /// Reweights issued to the cluster.
    pub applied: Vec<(OsdId, f64)>,
    /// Weights recorded in dry-run without touching the cluster.
    pub simulated: Vec<(OsdId, f64)>,
    pub removed: Vec<(OsdId, Removal)>,
    /// Reweights the cluster rejected; these OSDs are retried next cycle.
    pub failed: Vec<(OsdId, String)>,
}

impl CycleReport {
    fn new(outcome: CycleOutcome) -> Self {
        CycleReport {
            outcome,
            applied: Vec::new(),
            simulated: Vec::new(),
            removed: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// True when the cycle left the cluster and the managed set untouched.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
            && self.simulated.is_empty()
            && self.removed.is_empty()
            && self.failed.is_empty()
    }
}

/// Why `run` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Cancelled,
    Drained,
}

// ---------------------------------------------------------------------------
// Rebalancer
// ---------------------------------------------------------------------------

pub struct Rebalancer {
    client: Box<dyn CephClient + Send>,
    state: SharedState,
    limits: GateLimits,
    increment: f64,
    interval: Duration,
    executor: WeightExecutor,
}

impl Rebalancer {
    /// Validate the configuration and build a controller. Fails on an empty
    /// target map, a missing client, or weights the planner cannot honor.
    pub fn new(config: RebalancerConfig) -> Result<Rebalancer, RebalancerError> {
        config.validate()?;
        let RebalancerConfig {
            client,
            targets,
            settings,
        } = config;
        let client = client.ok_or(RebalancerError::MissingClient)?;

        Ok(Rebalancer {
            client,
            state: RebalanceState::shared(targets),
            limits: GateLimits {
                max_backfill_pgs: settings.max_backfill_pgs,
                max_recovery_pgs: settings.max_recovery_pgs,
            },
            increment: settings.weight_increment,
            interval: settings.sleep_interval(),
            executor: WeightExecutor::new(settings.dry_run),
        })
    }

    /// Handle to the shared state, for readers on other threads.
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// A Prometheus collector over this controller's state.
    pub fn collector(&self) -> Result<RebalancerCollector, prometheus::Error> {
        RebalancerCollector::new(self.state.clone())
    }

    pub fn view(&self) -> StateView {
        self.state.lock().view()
    }

    pub fn remaining(&self) -> usize {
        self.state.lock().remaining()
    }

    pub fn is_dry_run(&self) -> bool {
        self.executor.dry_run()
    }

    /// Run cycles every interval until drained or cancelled.
    ///
    /// The first cycle starts one interval after the call. Cancellation is
    /// checked on every tick before anything else; a cycle already running
    /// always finishes.
    pub fn run(&mut self, cancel: &CancelToken) -> RunOutcome {
        info!(
            osds = self.remaining(),
            increment = self.increment,
            interval_ms = self.interval.as_millis() as u64,
            dry_run = self.executor.dry_run(),
            "starting reweight loop"
        );
        loop {
            if cancel.wait_timeout(self.interval) {
                info!(remaining = self.remaining(), "reweighting cancelled");
                return RunOutcome::Cancelled;
            }
            if self.state.lock().is_drained() {
                info!("all given osds completed reweighting");
                return RunOutcome::Drained;
            }
            let report = self.run_cycle();
            if report.is_noop() {
                debug!(outcome = ?report.outcome, "cycle made no changes");
            }
        }
    }

    /// One pass of gate → snapshot → plan/apply.
    pub fn run_cycle(&mut self) -> CycleReport {
        let managed: Vec<OsdId> = {
            let state = self.state.lock();
            if state.is_drained() {
                return CycleReport::new(CycleOutcome::Drained);
            }
            state.targets().keys().copied().collect()
        };

        if let GateDecision::Hold(reason) = check_gate(self.client.as_ref(), self.limits) {
            return CycleReport::new(CycleOutcome::Held(reason));
        }

        let snapshot = match take_snapshot(self.client.as_ref(), &managed) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "failed to get output of osd-tree");
                return CycleReport::new(CycleOutcome::SnapshotFailed(e.to_string()));
            }
        };
        if snapshot.is_empty_topology() {
            warn!(managed = managed.len(), "osd tree has no osds, skipping reweighting");
            return CycleReport::new(CycleOutcome::EmptyTopology);
        }

        let mut report = CycleReport::new(CycleOutcome::Completed);

        for osd in snapshot.missing {
            error!(osd, "cannot find osd in current osd tree");
            self.retire(osd, Removal::MissingFromTopology, &mut report);
        }

        for (osd, current) in snapshot.weights {
            let (target, last_applied) = {
                let state = self.state.lock();
                (state.target(osd), state.tracker().last_applied(osd))
            };
            let Some(target) = target else {
                continue;
            };

            match plan_node(current, target, self.increment, last_applied) {
                NodePlan::TargetReached => {
                    info!(
                        osd,
                        target_weight = target,
                        current_weight = current,
                        "target weight achieved"
                    );
                    self.retire(osd, Removal::TargetReached, &mut report);
                }
                NodePlan::NonPositive { weight } => {
                    error!(
                        osd,
                        target_weight = target,
                        current_weight = current,
                        weight,
                        increment = self.increment,
                        "0 or negative weight found"
                    );
                    self.retire(osd, Removal::NonPositiveWeight, &mut report);
                }
                NodePlan::Plateaued { weight } => {
                    info!(
                        osd,
                        target_weight = target,
                        current_weight = current,
                        weight,
                        increment = self.increment,
                        "optimal weight achieved"
                    );
                    self.retire(osd, Removal::Plateaued, &mut report);
                }
                NodePlan::Apply { weight } => {
                    match self.executor.execute(osd, weight, self.client.as_mut(), &self.state) {
                        Ok(ExecuteOutcome::Simulated) => {
                            info!(
                                osd,
                                target_weight = target,
                                current_weight = current,
                                weight,
                                "weight will be applied in the actual run"
                            );
                            report.simulated.push((osd, weight));
                        }
                        Ok(ExecuteOutcome::Applied) => {
                            info!(
                                osd,
                                target_weight = target,
                                current_weight = current,
                                weight,
                                "reweight applied"
                            );
                            report.applied.push((osd, weight));
                        }
                        Err(e) => {
                            error!(osd, weight, error = %e, "cannot reweight osd");
                            report.failed.push((osd, e.to_string()));
                        }
                    }
                }
            }
        }

        report
    }

    fn retire(&self, osd: OsdId, why: Removal, report: &mut CycleReport) {
        self.state.lock().remove_target(osd);
        report.removed.push((osd, why));
    }

    /// Close the cluster client. Call once, after `run` has returned.
    pub fn close(mut self) {
        self.client.close();
    }
}
