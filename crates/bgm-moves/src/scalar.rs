//! Proposals over real scalar nodes.

use bgm_core::errors::ErrorInfo;
use bgm_core::{uniform01, BgmError, NodeId};
use bgm_graph::{ModelGraph, Value};
use rand::RngCore;

use crate::proposal::Proposal;
use crate::tuning::{retune_step, TARGET_RATE_SCALAR};

fn real_target(graph: &ModelGraph, id: NodeId, name: &'static str) -> Result<f64, BgmError> {
    graph.value(id)?.as_real().ok_or_else(|| {
        BgmError::Construction(
            ErrorInfo::new("value-kind", "proposal targets a non-real node")
                .with_context("proposal", name)
                .with_context("node", id.to_string()),
        )
    })
}

/// Multiplicative scale proposal: `x' = x * exp(lambda * (u - 1/2))`.
///
/// Suited to positive-valued parameters. The proposal is asymmetric, so the
/// scaling factor enters the Hastings ratio.
pub struct ScaleProposal {
    targets: [NodeId; 1],
    lambda: f64,
}

impl ScaleProposal {
    /// Creates a scale proposal on `target` with initial tuning `lambda`.
    pub fn new(target: NodeId, lambda: f64) -> Self {
        Self {
            targets: [target],
            lambda,
        }
    }

    /// Current tuning parameter.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Proposal for ScaleProposal {
    fn name(&self) -> &'static str {
        "scale"
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
        let x = real_target(graph, id, self.name())?;
        let factor = (self.lambda * (uniform01(rng) - 0.5)).exp();
        graph.set_stochastic_value(id, Value::Real(x * factor))?;
        graph.touch(id)?;
        Ok(factor.ln())
    }

    fn is_tunable(&self) -> bool {
        true
    }

    fn tune(&mut self, acceptance_rate: f64) {
        self.lambda = retune_step(self.lambda, acceptance_rate, TARGET_RATE_SCALAR);
    }

    fn parameter_summary(&self) -> String {
        format!("lambda={:.6}", self.lambda)
    }
}

/// Symmetric sliding-window proposal: `x' = x + delta * (u - 1/2)`.
pub struct SlideProposal {
    targets: [NodeId; 1],
    delta: f64,
}

impl SlideProposal {
    /// Creates a slide proposal on `target` with initial window `delta`.
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

impl Proposal for SlideProposal {
    fn name(&self) -> &'static str {
        "slide"
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
        let x = real_target(graph, id, self.name())?;
        let candidate = x + self.delta * (uniform01(rng) - 0.5);
        graph.set_stochastic_value(id, Value::Real(candidate))?;
        graph.touch(id)?;
        Ok(0.0)
    }

    fn is_tunable(&self) -> bool {
        true
    }

    fn tune(&mut self, acceptance_rate: f64) {
        self.delta = retune_step(self.delta, acceptance_rate, TARGET_RATE_SCALAR);
    }

    fn parameter_summary(&self) -> String {
        format!("delta={:.6}", self.delta)
    }
}
