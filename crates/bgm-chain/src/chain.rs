//! The sampling kernel: one chain stepping a model through generations.

use std::path::PathBuf;

use bgm_core::errors::ErrorInfo;
use bgm_core::{BgmError, RngHandle};
use bgm_graph::{ModelGraph, NodeKindTag, ProbabilitySummary};
use bgm_moves::{Move, OperatorStats};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{self, CheckpointPayload};
use crate::determinism;
use crate::monitor::{ChainView, Monitor};
use crate::schedule::{self, ScheduleKind};
use crate::stopping::StoppingRule;

/// Attempts the initialization loop makes before giving up on finding a
/// computable starting state.
const MAX_INIT_ATTEMPTS: u64 = 100;

/// Where and how often a running chain writes checkpoints.
#[derive(Debug, Clone)]
pub struct CheckpointPlan {
    /// Generations between writes.
    pub interval: u64,
    /// Directory the files land in.
    pub directory: PathBuf,
    /// Retention limit (0 keeps all).
    pub max_to_keep: usize,
    /// Whether a failed write ends the run instead of logging a warning.
    pub required: bool,
}

/// Summary returned after a run segment completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Generations executed by this segment.
    pub generations_completed: u64,
    /// Name of the stopping rule that ended the segment early, if any.
    pub stopped_by: Option<String>,
    /// Checkpoint files written, oldest first.
    pub checkpoints: Vec<PathBuf>,
    /// Non-fatal problems encountered (disabled monitors).
    pub warnings: Vec<String>,
    /// Lifetime acceptance statistics per move.
    pub operator_stats: Vec<OperatorStats>,
    /// Probability breakdown of the final state.
    pub final_summary: ProbabilitySummary,
}

struct MonitorSlot {
    monitor: Box<dyn Monitor>,
    disabled: bool,
}

/// A single MCMC chain over a model graph.
///
/// The chain owns the graph, the moves, and the monitors. All randomness is
/// derived from the master seed per (generation, slot), so two chains built
/// identically and stepped the same number of generations hold identical
/// states.
pub struct Chain {
    graph: ModelGraph,
    moves: Vec<Move>,
    monitors: Vec<MonitorSlot>,
    schedule: ScheduleKind,
    master_seed: u64,
    generation: u64,
    heat: f64,
    under_prior: bool,
    ln_probability: f64,
    posterior_trace: Vec<f64>,
    warnings: Vec<String>,
    stop_requested: bool,
}

impl Chain {
    /// Wraps a model graph into a cold chain with a sequential schedule.
    pub fn new(graph: ModelGraph, master_seed: u64) -> Self {
        Self {
            graph,
            moves: Vec::new(),
            monitors: Vec::new(),
            schedule: ScheduleKind::Sequential,
            master_seed,
            generation: 0,
            heat: 1.0,
            under_prior: false,
            ln_probability: f64::NEG_INFINITY,
            posterior_trace: Vec::new(),
            warnings: Vec::new(),
            stop_requested: false,
        }
    }

    /// Read access to the model graph.
    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    /// Current generation number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Log posterior of the current state, tracked incrementally.
    pub fn ln_probability(&self) -> f64 {
        self.ln_probability
    }

    /// Posterior trace, one entry per completed generation.
    pub fn posterior_trace(&self) -> &[f64] {
        &self.posterior_trace
    }

    /// Master seed the chain's substreams derive from.
    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Sets the move scheduling policy.
    pub fn set_schedule(&mut self, schedule: ScheduleKind) {
        self.schedule = schedule;
    }

    /// Sets the chain heat; must be positive.
    pub fn set_heat(&mut self, heat: f64) -> Result<(), BgmError> {
        if !(heat > 0.0) {
            return Err(BgmError::Construction(
                ErrorInfo::new("invalid-heat", "chain heat must be positive")
                    .with_context("heat", heat.to_string()),
            ));
        }
        self.heat = heat;
        Ok(())
    }

    /// Toggles prior-only sampling (clamped nodes ignored).
    pub fn set_under_prior(&mut self, under_prior: bool) {
        self.under_prior = under_prior;
    }

    /// Asks the chain to stop at the next generation boundary.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    /// Registers a move after checking its targets are sampleable.
    pub fn add_move(&mut self, mv: Move) -> Result<(), BgmError> {
        for target in mv.target_nodes() {
            if self.graph.kind(*target)? != NodeKindTag::Stochastic {
                return Err(BgmError::Construction(
                    ErrorInfo::new("invalid-move-target", "moves may only target stochastic nodes")
                        .with_context("move", mv.name())
                        .with_context("node", target.to_string()),
                ));
            }
            if self.graph.is_clamped(*target)? {
                return Err(BgmError::Construction(
                    ErrorInfo::new("invalid-move-target", "moves may not target clamped nodes")
                        .with_context("move", mv.name())
                        .with_context("node", target.to_string()),
                ));
            }
        }
        self.moves.push(mv);
        Ok(())
    }

    /// Registers a monitor after checking its sampling interval is nonzero.
    pub fn add_monitor(&mut self, monitor: Box<dyn Monitor>) -> Result<(), BgmError> {
        if monitor.sample_interval() == 0 {
            return Err(BgmError::Construction(
                ErrorInfo::new(
                    "zero-interval",
                    "monitor sample interval must be at least one generation",
                )
                .with_context("monitor", monitor.name().to_string()),
            ));
        }
        self.monitors.push(MonitorSlot {
            monitor,
            disabled: false,
        });
        Ok(())
    }

    /// Lifetime statistics of every registered move.
    pub fn operator_stats(&self) -> Vec<OperatorStats> {
        self.moves.iter().map(Move::stats).collect()
    }

    /// Brings the chain to a computable starting state.
    ///
    /// If the initial values have `-inf` joint probability, every unclamped
    /// stochastic node is redrawn from its distribution and the state is
    /// re-evaluated, up to [`MAX_INIT_ATTEMPTS`] times.
    pub fn initialize(&mut self) -> Result<(), BgmError> {
        if self.moves.is_empty() {
            return Err(BgmError::Construction(ErrorInfo::new(
                "no-moves",
                "the chain has no moves to schedule",
            )));
        }
        for attempt in 0..MAX_INIT_ATTEMPTS {
            let summary = self.graph.ln_probability_summary(self.under_prior)?;
            if summary.posterior.is_finite() {
                self.ln_probability = summary.posterior;
                return Ok(());
            }
            let seed = determinism::redraw_seed(self.master_seed, attempt);
            let mut rng = RngHandle::from_seed(seed);
            for id in self.graph.stochastic_nodes() {
                if !self.graph.is_clamped(id)? {
                    self.graph.redraw(id, &mut rng)?;
                    self.graph.keep(id)?;
                }
            }
        }
        Err(BgmError::Numeric(
            ErrorInfo::new(
                "non-computable-density",
                "no computable starting state after the redraw budget",
            )
            .with_context("attempts", MAX_INIT_ATTEMPTS.to_string())
            .with_hint("check that clamped data lies in the support of its distribution"),
        ))
    }

    /// Runs one generation of moves without monitoring.
    fn advance_generation(&mut self) -> Result<(), BgmError> {
        let weights: Vec<f64> = self.moves.iter().map(Move::weight).collect();
        let mut schedule_rng =
            RngHandle::from_seed(determinism::schedule_seed(self.master_seed, self.generation));
        let order = schedule::plan(self.schedule, &weights, &mut schedule_rng);
        for (slot, move_index) in order.into_iter().enumerate() {
            let seed = determinism::move_seed(self.master_seed, self.generation, slot as u64);
            let mut move_rng = RngHandle::from_seed(seed);
            let outcome = self.moves[move_index].perform(
                &mut self.graph,
                self.heat,
                self.under_prior,
                &mut move_rng,
            )?;
            if outcome.accepted {
                self.ln_probability += outcome.ln_probability_ratio;
            }
        }
        self.generation += 1;
        self.posterior_trace.push(self.ln_probability);
        Ok(())
    }

    /// Runs one generation and dispatches due monitors.
    pub fn step(&mut self) -> Result<(), BgmError> {
        self.advance_generation()?;
        let generation = self.generation;
        let due = self.monitors.iter().any(|slot| {
            !slot.disabled && generation % slot.monitor.sample_interval() == 0
        });
        if !due {
            return Ok(());
        }
        let summary = self.graph.ln_probability_summary(self.under_prior)?;
        let view = ChainView::new(generation, &self.graph, summary);
        for slot in &mut self.monitors {
            if slot.disabled || generation % slot.monitor.sample_interval() != 0 {
                continue;
            }
            if let Err(err) = slot.monitor.on_generation(&view) {
                if err.is_fatal() {
                    return Err(err);
                }
                slot.disabled = true;
                self.warnings.push(format!(
                    "monitor '{}' disabled at generation {generation}: {err}",
                    slot.monitor.name()
                ));
            }
        }
        Ok(())
    }

    /// Runs the burn-in phase: no monitoring, with step-size tuning every
    /// `tuning_interval` generations (0 disables tuning).
    pub fn burnin(&mut self, generations: u64, tuning_interval: u64) -> Result<(), BgmError> {
        for completed in 1..=generations {
            self.advance_generation()?;
            if tuning_interval > 0 && completed % tuning_interval == 0 {
                for mv in &mut self.moves {
                    mv.tune();
                }
            }
        }
        // burn-in samples are not part of the reported trace
        self.posterior_trace.clear();
        Ok(())
    }

    /// Runs up to `generations` sampling generations.
    ///
    /// Stopping rules are polled after every generation; checkpoints are
    /// written per the plan. Monitors run inside each step and a failing
    /// monitor is disabled rather than ending the run.
    pub fn run(
        &mut self,
        generations: u64,
        stopping: &mut [Box<dyn StoppingRule>],
        checkpoint_plan: Option<&CheckpointPlan>,
    ) -> Result<RunReport, BgmError> {
        let mut checkpoints: Vec<PathBuf> = Vec::new();
        let mut stopped_by = None;
        let mut completed = 0;

        for _ in 0..generations {
            if self.stop_requested {
                stopped_by = Some("stop-request".to_string());
                break;
            }
            self.step()?;
            completed += 1;

            if let Some(plan) = checkpoint_plan {
                if plan.interval > 0 && self.generation % plan.interval == 0 {
                    let path = checkpoint::checkpoint_path(&plan.directory, self.generation);
                    let written = self
                        .checkpoint_payload()
                        .store(&path)
                        .and_then(|()| {
                            checkpoints.push(path);
                            checkpoint::enforce_retention(&mut checkpoints, plan.max_to_keep)
                        });
                    if let Err(err) = written {
                        if plan.required {
                            return Err(err);
                        }
                        self.warnings.push(format!(
                            "checkpoint skipped at generation {}: {err}",
                            self.generation
                        ));
                    }
                }
            }

            let generation = self.generation;
            let trace = &self.posterior_trace;
            for rule in stopping.iter_mut() {
                if rule.should_stop(generation, trace) {
                    stopped_by = Some(rule.name().to_string());
                    break;
                }
            }
            if stopped_by.is_some() {
                break;
            }
        }

        for slot in &mut self.monitors {
            if slot.disabled {
                continue;
            }
            if let Err(err) = slot.monitor.finish() {
                if err.is_fatal() {
                    return Err(err);
                }
                self.warnings
                    .push(format!("monitor '{}' failed to finish: {err}", slot.monitor.name()));
            }
        }

        let final_summary = self.graph.ln_probability_summary(self.under_prior)?;
        Ok(RunReport {
            generations_completed: completed,
            stopped_by,
            checkpoints,
            warnings: std::mem::take(&mut self.warnings),
            operator_stats: self.operator_stats(),
            final_summary,
        })
    }

    /// Builds the serializable state of the chain.
    pub fn checkpoint_payload(&self) -> CheckpointPayload {
        CheckpointPayload {
            generation: self.generation,
            master_seed: self.master_seed,
            heat: self.heat,
            under_prior: self.under_prior,
            schedule: self.schedule,
            values: self.graph.snapshot(),
            posterior_trace: self.posterior_trace.clone(),
        }
    }

    /// Restores a freshly built chain (same model, moves, and monitors) to
    /// the state a checkpoint was written at.
    pub fn restore(&mut self, payload: &CheckpointPayload) -> Result<(), BgmError> {
        self.graph.restore_snapshot(&payload.values)?;
        self.master_seed = payload.master_seed;
        self.heat = payload.heat;
        self.under_prior = payload.under_prior;
        self.schedule = payload.schedule;
        self.generation = payload.generation;
        self.posterior_trace = payload.posterior_trace.clone();
        self.ln_probability = self.graph.ln_probability_summary(self.under_prior)?.posterior;
        Ok(())
    }
}
