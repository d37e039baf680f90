//! Gradual CRUSH reweighting for Ceph.
//!
//! A `Rebalancer` raises the CRUSH weight of a set of OSDs toward per-OSD
//! targets in small steps, holding off whenever the cluster is already busy
//! backfilling or recovering.

pub mod cli;
pub mod convergence;
pub mod errors;
pub mod infrastructure;
pub mod metrics;
pub mod monitor;
pub mod rebalancer;
pub mod shutdown;
pub mod state;
pub mod types;

pub use errors::{CephError, RebalancerError};
pub use infrastructure::CephClient;
pub use rebalancer::{CycleOutcome, CycleReport, Rebalancer, Removal, RunOutcome};
pub use types::config::{RebalancerConfig, Settings};
pub use types::topology::OsdId;
