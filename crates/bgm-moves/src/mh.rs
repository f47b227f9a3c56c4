//! The Metropolis-Hastings accept/reject transaction.

use bgm_core::errors::ErrorInfo;
use bgm_core::{uniform01, BgmError, NodeId};
use bgm_graph::ModelGraph;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::proposal::Proposal;

/// Below this log acceptance probability the draw is skipped: `exp` would
/// underflow to zero anyway.
const LN_ALPHA_FLOOR: f64 = -300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveState {
    Idle,
    Pending,
}

/// Outcome of one move attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOutcome {
    /// True when the candidate state was committed.
    pub accepted: bool,
    /// Log probability ratio of the candidate over the current state.
    pub ln_probability_ratio: f64,
    /// Log Hastings correction reported by the proposal.
    pub ln_hastings_ratio: f64,
}

/// Acceptance bookkeeping for one move, suitable for run summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorStats {
    /// Proposal name.
    pub name: String,
    /// Scheduling weight.
    pub weight: f64,
    /// Attempts over the whole run.
    pub tried: u64,
    /// Acceptances over the whole run.
    pub accepted: u64,
    /// Tunable parameters rendered by the proposal.
    pub parameters: String,
}

impl OperatorStats {
    /// Lifetime acceptance rate, zero before the first attempt.
    pub fn acceptance_rate(&self) -> f64 {
        if self.tried == 0 {
            0.0
        } else {
            self.accepted as f64 / self.tried as f64
        }
    }
}

/// A proposal bound to the accept/reject transaction and its counters.
///
/// The state machine guards transaction hygiene: a second `perform` while a
/// previous attempt never completed is state corruption, reported as a fatal
/// transaction error rather than silently compounding proposals.
pub struct Move {
    proposal: Box<dyn Proposal>,
    weight: f64,
    state: MoveState,
    tried_epoch: u64,
    accepted_epoch: u64,
    tried_total: u64,
    accepted_total: u64,
}

impl Move {
    /// Wraps a proposal with scheduling weight `weight`.
    pub fn new(proposal: Box<dyn Proposal>, weight: f64) -> Self {
        Self {
            proposal,
            weight,
            state: MoveState::Idle,
            tried_epoch: 0,
            accepted_epoch: 0,
            tried_total: 0,
            accepted_total: 0,
        }
    }

    /// Proposal name.
    pub fn name(&self) -> &'static str {
        self.proposal.name()
    }

    /// Scheduling weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Nodes mutated by the underlying proposal.
    pub fn target_nodes(&self) -> &[NodeId] {
        self.proposal.target_nodes()
    }

    /// Runs one full propose/decide/commit-or-rollback cycle.
    ///
    /// `heat` scales the probability ratio (1 for a cold chain); the Hastings
    /// correction is never heated. A `-inf` ratio or correction rejects
    /// without consuming randomness, as does a log acceptance probability
    /// below [`LN_ALPHA_FLOOR`]; certain acceptances skip the draw too, so
    /// the random stream is only consumed when the decision is genuinely
    /// uncertain.
    pub fn perform(
        &mut self,
        graph: &mut ModelGraph,
        heat: f64,
        under_prior: bool,
        rng: &mut dyn RngCore,
    ) -> Result<MoveOutcome, BgmError> {
        if self.state == MoveState::Pending {
            return Err(BgmError::Transaction(
                ErrorInfo::new("transaction-open", "move attempted while a proposal is pending")
                    .with_context("move", self.proposal.name())
                    .with_hint("a previous propose call failed; the chain must be abandoned"),
            ));
        }
        self.state = MoveState::Pending;
        self.tried_epoch += 1;
        self.tried_total += 1;

        // An error here leaves the move pending on purpose: the graph holds
        // half-applied values and no further attempt may run on top of them.
        let ln_hastings_ratio = self.proposal.propose(graph, rng)?;
        let roots = self.proposal.target_nodes().to_vec();
        let ln_probability_ratio = graph.ln_probability_ratio(&roots, under_prior)?;

        let accepted = if ln_probability_ratio == f64::NEG_INFINITY
            || ln_hastings_ratio == f64::NEG_INFINITY
        {
            false
        } else {
            let ln_alpha = heat * ln_probability_ratio + ln_hastings_ratio;
            if ln_alpha.is_nan() {
                false
            } else if ln_alpha >= 0.0 {
                true
            } else if ln_alpha < LN_ALPHA_FLOOR {
                false
            } else {
                uniform01(rng).ln() < ln_alpha
            }
        };

        if accepted {
            graph.keep_all(&roots)?;
            self.proposal.clean_up(graph);
            self.accepted_epoch += 1;
            self.accepted_total += 1;
        } else {
            graph.restore_all(&roots)?;
            self.proposal.undo(graph);
        }
        self.state = MoveState::Idle;
        Ok(MoveOutcome {
            accepted,
            ln_probability_ratio,
            ln_hastings_ratio,
        })
    }

    /// Retunes the proposal from the acceptance rate observed since the last
    /// tuning call, then starts a fresh epoch.
    pub fn tune(&mut self) {
        if self.proposal.is_tunable() && self.tried_epoch > 0 {
            let rate = self.accepted_epoch as f64 / self.tried_epoch as f64;
            self.proposal.tune(rate);
        }
        self.tried_epoch = 0;
        self.accepted_epoch = 0;
    }

    /// Lifetime statistics for run summaries.
    pub fn stats(&self) -> OperatorStats {
        OperatorStats {
            name: self.proposal.name().to_string(),
            weight: self.weight,
            tried: self.tried_total,
            accepted: self.accepted_total,
            parameters: self.proposal.parameter_summary(),
        }
    }
}
