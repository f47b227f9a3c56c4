//! Stopping rules evaluated after every generation.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::effective_sample_size;

/// A rule that can end a run before its generation budget is exhausted.
///
/// Rules are polled once per generation with the posterior trace collected so
/// far; the first rule to fire names itself in the run report.
pub trait StoppingRule: Send {
    /// Name recorded when this rule ends the run.
    fn name(&self) -> &'static str;

    /// True when sampling should stop.
    fn should_stop(&mut self, generation: u64, posterior_trace: &[f64]) -> bool;
}

/// Stops at an absolute generation count.
pub struct MaxGenerations {
    limit: u64,
}

impl MaxGenerations {
    /// Stops once `limit` generations have been reached.
    pub fn new(limit: u64) -> Self {
        Self { limit }
    }
}

impl StoppingRule for MaxGenerations {
    fn name(&self) -> &'static str {
        "max-generations"
    }

    fn should_stop(&mut self, generation: u64, _posterior_trace: &[f64]) -> bool {
        generation >= self.limit
    }
}

/// Stops when the wall-clock budget is exhausted.
pub struct MaxWallClock {
    started: DateTime<Utc>,
    budget: Duration,
}

impl MaxWallClock {
    /// Starts the clock now with the given budget.
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Utc::now(),
            budget,
        }
    }
}

impl StoppingRule for MaxWallClock {
    fn name(&self) -> &'static str {
        "max-wall-clock"
    }

    fn should_stop(&mut self, _generation: u64, _posterior_trace: &[f64]) -> bool {
        Utc::now() - self.started >= self.budget
    }
}

/// Stops once the posterior trace reaches a target effective sample size.
///
/// The ESS is quadratic in the trace length, so it is only recomputed every
/// `check_interval` generations.
pub struct MinEss {
    target: f64,
    check_interval: u64,
}

impl MinEss {
    /// Stops when the trace ESS reaches `target`, checking every
    /// `check_interval` generations.
    pub fn new(target: f64, check_interval: u64) -> Self {
        Self {
            target,
            check_interval: check_interval.max(1),
        }
    }
}

impl StoppingRule for MinEss {
    fn name(&self) -> &'static str {
        "min-ess"
    }

    fn should_stop(&mut self, generation: u64, posterior_trace: &[f64]) -> bool {
        if generation == 0 || generation % self.check_interval != 0 {
            return false;
        }
        effective_sample_size(posterior_trace) >= self.target
    }
}

/// Configurable stopping rule selection.
///
/// Rules carry state (wall clocks, ESS caches), so the configuration is kept
/// serde-able and a fresh rule is materialized per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "kebab-case")]
pub enum StoppingRuleConfig {
    /// Stop at an absolute generation count.
    MaxGenerations {
        /// Generation the run stops at.
        limit: u64,
    },
    /// Stop once a wall-clock budget is exhausted.
    MaxWallClock {
        /// Budget in seconds, counted from materialization.
        seconds: i64,
    },
    /// Stop once the posterior trace reaches a target effective sample size.
    MinEss {
        /// Target effective sample size.
        target: f64,
        /// Generations between ESS evaluations.
        #[serde(default = "default_ess_check_interval")]
        check_interval: u64,
    },
}

fn default_ess_check_interval() -> u64 {
    100
}

impl StoppingRuleConfig {
    /// Builds a fresh rule; wall clocks start ticking here.
    pub fn materialize(&self) -> Box<dyn StoppingRule> {
        match self {
            Self::MaxGenerations { limit } => Box::new(MaxGenerations::new(*limit)),
            Self::MaxWallClock { seconds } => {
                Box::new(MaxWallClock::new(Duration::seconds(*seconds)))
            }
            Self::MinEss {
                target,
                check_interval,
            } => Box::new(MinEss::new(*target, *check_interval)),
        }
    }
}
