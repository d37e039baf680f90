//! Cluster observation: backpressure gating and the per-cycle weight snapshot.
//!
//! The `gate` module decides whether a cycle may touch the cluster at all.
//! The `snapshot` module reads live CRUSH weights for the managed OSDs.

pub mod gate;
pub mod snapshot;
