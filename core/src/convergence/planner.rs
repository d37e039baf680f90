//! Weight planner: decides the next CRUSH weight for one OSD.
//!
//! The planner is stateless: it takes the live weight, the target, the
//! increment and the last weight this controller applied, and classifies
//! the OSD. It never touches the cluster itself.

/// Decimal places every planned weight is rounded to.
pub const ROUND_TO_PLACES: i32 = 4;

/// Outcome of planning one OSD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodePlan {
    /// Live weight is already at or past the target.
    TargetReached,
    /// The computed weight is zero or negative; nothing sensible to apply.
    NonPositive { weight: f64 },
    /// The computed weight equals the last one applied: no further progress
    /// is possible at this increment.
    Plateaued { weight: f64 },
    /// Apply this weight.
    Apply { weight: f64 },
}

/// Round to `ROUND_TO_PLACES` decimal places.
pub fn round_weight(weight: f64) -> f64 {
    let scale = 10f64.powi(ROUND_TO_PLACES);
    (weight * scale).round() / scale
}

/// Plan the next step for one OSD.
///
/// # Logic
///
/// Evaluated in order:
/// 1. `current >= target` -> `TargetReached`
/// 2. `next = min(round(current + increment), target)`
/// 3. `next <= 0` -> `NonPositive`
/// 4. `last_applied == next` -> `Plateaued`
/// 5. otherwise -> `Apply { next }`
///
/// Rounding happens before the cap so the result never exceeds the target,
/// and before the plateau comparison so float drift from repeated additions
/// cannot keep an OSD a hair below its target forever.
pub fn plan_node(current: f64, target: f64, increment: f64, last_applied: Option<f64>) -> NodePlan {
    if current >= target {
        return NodePlan::TargetReached;
    }

    let next = round_weight(current + increment).min(target);

    if next <= 0.0 {
        return NodePlan::NonPositive { weight: next };
    }

    if last_applied == Some(next) {
        return NodePlan::Plateaued { weight: next };
    }

    NodePlan::Apply { weight: next }
}
