//! Cluster health gate: the single backpressure check run before each cycle.
//!
//! The gate is binary. Either both PG counts are within their ceilings and
//! the cycle may proceed, or the whole cycle is held. A failed query also
//! holds: without a count there is no way to tell whether it is safe.

use std::fmt;

use tracing::{error, warn};

use crate::infrastructure::CephClient;

/// Configured ceilings. A count strictly greater than its ceiling holds the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimits {
    pub max_backfill_pgs: u64,
    pub max_recovery_pgs: u64,
}

/// Why a cycle was held.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldReason {
    Backfilling { count: u64, max: u64 },
    Recovering { count: u64, max: u64 },
    /// A count query failed; `what` names the query.
    QueryFailed { what: &'static str, error: String },
}

impl fmt::Display for HoldReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldReason::Backfilling { count, max } => {
                write!(f, "{} backfilling pgs (max {})", count, max)
            }
            HoldReason::Recovering { count, max } => {
                write!(f, "{} recovering pgs (max {})", count, max)
            }
            HoldReason::QueryFailed { what, error } => {
                write!(f, "failed checking for {}: {}", what, error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Hold(HoldReason),
}

/// Query backfilling then recovering PGs and compare each against its ceiling.
///
/// The recovering query is skipped once backfilling already holds the cycle.
pub fn check_gate(client: &dyn CephClient, limits: GateLimits) -> GateDecision {
    let backfilling = match client.backfilling_count() {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "failed checking for backfilling pgs");
            return GateDecision::Hold(HoldReason::QueryFailed {
                what: "backfilling pgs",
                error: e.to_string(),
            });
        }
    };
    if backfilling > limits.max_backfill_pgs {
        warn!(backfill_pgs = backfilling, "skipping reweighting, backfilling pgs found");
        return GateDecision::Hold(HoldReason::Backfilling {
            count: backfilling,
            max: limits.max_backfill_pgs,
        });
    }

    let recovering = match client.recovering_count() {
        Ok(n) => n,
        Err(e) => {
            error!(error = %e, "failed checking for recovering pgs");
            return GateDecision::Hold(HoldReason::QueryFailed {
                what: "recovering pgs",
                error: e.to_string(),
            });
        }
    };
    if recovering > limits.max_recovery_pgs {
        warn!(recovery_pgs = recovering, "skipping reweighting, recovering pgs found");
        return GateDecision::Hold(HoldReason::Recovering {
            count: recovering,
            max: limits.max_recovery_pgs,
        });
    }

    GateDecision::Proceed
}
