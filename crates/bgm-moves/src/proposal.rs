//! The proposal interface.

use bgm_core::{BgmError, NodeId};
use bgm_graph::ModelGraph;
use rand::RngCore;

/// A perturbation of one or more stochastic node values.
///
/// `propose` writes candidate values into the graph, touches every mutated
/// node, and returns the log Hastings ratio of the perturbation. The caller
/// owns the surrounding transaction: it computes the probability ratio, makes
/// the accept decision, and ends with `keep` or `restore` on the graph before
/// invoking `clean_up` or `undo`.
///
/// `undo` exists for proposals carrying state beyond node values (the graph
/// itself is already rolled back when it runs); value-only proposals use the
/// empty default.
pub trait Proposal: Send {
    /// Short identifier used in operator summaries.
    fn name(&self) -> &'static str;

    /// The nodes this proposal mutates; these are the transaction roots.
    fn target_nodes(&self) -> &[NodeId];

    /// Writes candidate values and touches the targets. Returns the log
    /// Hastings ratio; `-inf` forces rejection.
    fn propose(&mut self, graph: &mut ModelGraph, rng: &mut dyn RngCore)
        -> Result<f64, BgmError>;

    /// Hook run after the transaction commits.
    fn clean_up(&mut self, _graph: &mut ModelGraph) {}

    /// Hook run after the transaction rolls back.
    fn undo(&mut self, _graph: &mut ModelGraph) {}

    /// True when the proposal carries a tunable step size.
    fn is_tunable(&self) -> bool {
        false
    }

    /// Adjusts the step size toward the proposal's target acceptance rate.
    fn tune(&mut self, _acceptance_rate: f64) {}

    /// Human readable rendering of the tunable parameters.
    fn parameter_summary(&self) -> String;
}
