//! Move scheduling policies.

use bgm_core::uniform01;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// How move attempts are ordered within a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScheduleKind {
    /// Every move runs `round(weight)` times (at least once) in registration
    /// order.
    #[default]
    Sequential,
    /// `round(sum of weights)` attempts, each picking a move with probability
    /// proportional to its weight.
    Random,
    /// A single weighted pick per generation.
    Single,
}

/// Plans one generation: the returned vector holds move indices in execution
/// order. Weighted picks consume one uniform draw each; the sequential policy
/// consumes none.
pub fn plan(kind: ScheduleKind, weights: &[f64], rng: &mut dyn RngCore) -> Vec<usize> {
    match kind {
        ScheduleKind::Sequential => {
            let mut order = Vec::new();
            for (index, weight) in weights.iter().enumerate() {
                let repeats = weight.round().max(1.0) as usize;
                order.extend(std::iter::repeat(index).take(repeats));
            }
            order
        }
        ScheduleKind::Random => {
            let total: f64 = weights.iter().sum();
            let attempts = total.round().max(1.0) as usize;
            (0..attempts)
                .map(|_| weighted_pick(weights, total, rng))
                .collect()
        }
        ScheduleKind::Single => {
            let total: f64 = weights.iter().sum();
            vec![weighted_pick(weights, total, rng)]
        }
    }
}

fn weighted_pick(weights: &[f64], total: f64, rng: &mut dyn RngCore) -> usize {
    let mut remaining = uniform01(rng) * total;
    for (index, weight) in weights.iter().enumerate() {
        remaining -= weight;
        if remaining <= 0.0 {
            return index;
        }
    }
    weights.len().saturating_sub(1)
}
