//! Step-size tuning during burn-in.

/// Target acceptance rate for single-parameter proposals.
pub const TARGET_RATE_SCALAR: f64 = 0.44;

/// Target acceptance rate for block (multi-parameter) proposals.
pub const TARGET_RATE_BLOCK: f64 = 0.234;

const STEP_FLOOR: f64 = 1e-9;
const STEP_CEILING: f64 = 1e9;

/// Nudges a step size toward the target acceptance rate.
///
/// Accepting too often means the steps are timid and the step size grows;
/// accepting too rarely means the steps overshoot and it shrinks. The factor
/// is proportional to the distance from the target, so tuning settles as the
/// observed rate converges. The result is clamped to keep a pathological
/// epoch (0% or 100% acceptance on a tiny sample) from collapsing or blowing
/// up the step.
pub fn retune_step(step: f64, acceptance_rate: f64, target: f64) -> f64 {
    let tuned = if acceptance_rate > target {
        step * (1.0 + (acceptance_rate - target) / (1.0 - target))
    } else {
        step / (2.0 - acceptance_rate / target)
    };
    tuned.clamp(STEP_FLOOR, STEP_CEILING)
}
