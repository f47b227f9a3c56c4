#![deny(missing_docs)]

//! Deterministic MCMC chain execution over bgm model graphs.
//!
//! A [`Chain`] owns a model graph, a set of weighted moves, and monitors. It
//! derives every random decision from a master seed and the decision's
//! coordinates, so runs replay exactly, replicated runs use independent
//! substreams, and checkpoints carry no RNG state.

/// Convergence diagnostics over posterior traces.
pub mod analysis;
/// The sampling kernel and public `Chain` entry points.
pub mod chain;
/// Checkpoint serialization helpers and payload structures.
pub mod checkpoint;
/// YAML configuration schema and defaults.
pub mod config;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Run manifest serialization helpers.
pub mod manifest;
/// Monitor interfaces and the CSV trace monitor.
pub mod monitor;
/// Replicated-run execution.
pub mod replicate;
/// Move scheduling policies.
pub mod schedule;
/// Stopping rules.
pub mod stopping;

pub use analysis::{combine_traces, effective_sample_size, gelman_rubin, CombineMode};
pub use chain::{Chain, CheckpointPlan, RunReport};
pub use checkpoint::CheckpointPayload;
pub use config::{CheckpointConfig, OutputConfig, ReplicationConfig, RunConfig, SeedPolicy};
pub use manifest::RunManifest;
pub use monitor::{ChainView, Monitor, TraceMonitor, TraceRow};
pub use replicate::{replicate, ReplicationOutcome};
pub use schedule::ScheduleKind;
pub use stopping::{MaxGenerations, MaxWallClock, MinEss, StoppingRule, StoppingRuleConfig};
