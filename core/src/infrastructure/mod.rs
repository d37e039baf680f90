//! Cluster admin backends.
//!
//! Provides the `CephClient` trait and implementations for the `ceph` CLI
//! (production) and an in-memory cluster (testing). The controller only ever
//! talks to the trait.

pub mod ceph;
pub mod mock;
pub mod runner;

use crate::errors::CephError;
use crate::types::topology::{OsdId, OsdTree};

/// The five cluster operations the controller depends on.
pub trait CephClient {
    /// PGs currently in `backfilling` or `backfill_wait`.
    fn backfilling_count(&self) -> Result<u64, CephError>;

    /// PGs currently in `recovering` or `recovery_wait`.
    fn recovering_count(&self) -> Result<u64, CephError>;

    /// Parsed `ceph osd tree`.
    fn current_topology(&self) -> Result<OsdTree, CephError>;

    /// Set the CRUSH weight of `osd.<id>`.
    fn set_weight(&mut self, osd: OsdId, weight: f64) -> Result<(), CephError>;

    /// Release the connection. Called once by the owner after the loop exits.
    fn close(&mut self);
}
