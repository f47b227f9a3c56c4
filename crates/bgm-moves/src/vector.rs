//! Proposals over vector-valued nodes.

use bgm_core::errors::ErrorInfo;
use bgm_core::{uniform01, BgmError, NodeId};
use bgm_graph::{ModelGraph, Value};
use rand::RngCore;

use crate::proposal::Proposal;
use crate::tuning::{retune_step, TARGET_RATE_BLOCK};

/// Symmetric per-element slide over a real vector node, with independent
/// offsets per element. Targets the block acceptance rate.
pub struct VectorSlideProposal {
    targets: [NodeId; 1],
    delta: f64,
}

impl VectorSlideProposal {
    /// Creates a vector slide proposal on `target` with window `delta`.
    pub fn new(target: NodeId, delta: f64) -> Self {
        Self {
            targets: [target],
            delta,
        }
    }

    /// Current window width.
    pub fn delta(&self) -> f64 {
        self.delta
    }
}

impl Proposal for VectorSlideProposal {
    fn name(&self) -> &'static str {
        "vector-slide"
    }

    fn target_nodes(&self) -> &[NodeId] {
        &self.targets
    }

    fn propose(
        &mut self,
        graph: &mut ModelGraph,
        rng: &mut dyn RngCore,
    ) -> Result<f64, BgmError> {
        let id = self.targets[0];
        // a simplex also reads as a real vector, but sliding its elements
        // would break the sum-to-one constraint
        let current = match graph.value(id)? {
            Value::RealVector(elements) => elements,
            other => {
                return Err(BgmError::Construction(
                    ErrorInfo::new("value-kind", "proposal requires a real-vector node")
                        .with_context("proposal", self.name())
                        .with_context("node", id.to_string())
                        .with_context("actual", format!("{:?}", other.kind())),
                ))
            }
        };
        let candidate: Vec<f64> = current
            .iter()
            .map(|x| x + self.delta * (uniform01(rng) - 0.5))
            .collect();
        graph.set_stochastic_value(id, Value::RealVector(candidate))?;
        graph.touch(id)?;
        Ok(0.0)
    }

    fn is_tunable(&self) -> bool {
        true
    }

    fn tune(&mut self, acceptance_rate: f64) {
        self.delta = retune_step(self.delta, acceptance_rate, TARGET_RATE_BLOCK);
    }

    fn parameter_summary(&self) -> String {
        format!("delta={:.6}", self.delta)
    }
}
