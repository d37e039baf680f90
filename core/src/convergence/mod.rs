//! Convergence engine: moves each OSD's CRUSH weight toward its target.
//!
//! The `planner` module computes the next weight for one OSD and classifies
//! it. The `tracker` module remembers what was last applied, which is how
//! plateaus are detected. The `executor` module applies or simulates a
//! planned weight.

pub mod executor;
pub mod planner;
pub mod tracker;
