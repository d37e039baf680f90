//! Weight executor: applies (or simulates) one planned weight.

use parking_lot::Mutex;

use crate::errors::CephError;
use crate::infrastructure::CephClient;
use crate::state::RebalanceState;
use crate::types::topology::OsdId;

/// What happened to a planned weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    /// Reweight issued; the OSD stays managed for re-evaluation next cycle.
    Applied,
    /// Dry-run: recorded and dropped from the managed set, cluster untouched.
    Simulated,
}

/// Executes planned weights against a `CephClient`.
///
/// In dry-run mode every OSD is reported exactly once: the weight it would
/// get is recorded in the ledger and the OSD is removed from the targets.
/// In live mode only a successful reweight is recorded; a failed one leaves
/// both the ledger and the targets untouched so the next cycle retries it.
#[derive(Debug, Clone, Copy)]
pub struct WeightExecutor {
    dry_run: bool,
}

impl WeightExecutor {
    pub fn new(dry_run: bool) -> Self {
        WeightExecutor { dry_run }
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn execute(
        &self,
        osd: OsdId,
        weight: f64,
        client: &mut dyn CephClient,
        state: &Mutex<RebalanceState>,
    ) -> Result<ExecuteOutcome, CephError> {
        if self.dry_run {
            let mut state = state.lock();
            state.tracker_mut().record_applied(osd, weight);
            state.remove_target(osd);
            return Ok(ExecuteOutcome::Simulated);
        }

        // No lock held across the cluster call; readers are never blocked on it.
        client.set_weight(osd, weight)?;
        state.lock().tracker_mut().record_applied(osd, weight);
        Ok(ExecuteOutcome::Applied)
    }
}
