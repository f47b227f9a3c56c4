//! Replicated runs of the same analysis under derived seeds.

use std::fs;
use std::path::PathBuf;

use bgm_core::errors::ErrorInfo;
use bgm_core::{BgmError, NodeId};
use chrono::Utc;

use crate::analysis;
use crate::chain::{Chain, CheckpointPlan, RunReport};
use crate::config::RunConfig;
use crate::determinism;
use crate::manifest::RunManifest;
use crate::monitor::TraceMonitor;
use crate::stopping::StoppingRule;

/// Result of running an analysis `runs` times with independent seeds.
#[derive(Debug)]
pub struct ReplicationOutcome {
    /// Per-run report, in run order.
    pub reports: Vec<RunReport>,
    /// Per-run posterior trace, in run order.
    pub traces: Vec<Vec<f64>>,
    /// Merged trace per the combine mode, when one is requested.
    pub combined: Option<Vec<f64>>,
    /// Effective sample size of each run's posterior trace.
    pub ess: Vec<f64>,
    /// Gelman-Rubin diagnostic across the runs (NaN below two runs).
    pub psrf: f64,
}

/// Executes `config.replication.runs` independent runs.
///
/// The builder receives a run seed derived from the master seed and must
/// return a fully configured chain (model, moves, monitors) seeded with it;
/// every chain is then initialized, burned in, and sampled identically, with
/// the configured stopping rules materialized fresh per run.
///
/// When `output.run_directory` is set, each run writes a CSV trace over its
/// unclamped stochastic nodes and a manifest into that directory; replicate
/// runs get a `run_<index>` subdirectory each so their artefacts do not
/// collide. Checkpoints are only written for single-run analyses.
pub fn replicate<F>(config: &RunConfig, mut build: F) -> Result<ReplicationOutcome, BgmError>
where
    F: FnMut(u64) -> Result<Chain, BgmError>,
{
    config.validate()?;
    let runs = config.replication.runs;
    let checkpoint_plan = match (&config.checkpoint.directory, runs) {
        (Some(directory), 1) if config.checkpoint.interval > 0 => Some(CheckpointPlan {
            interval: config.checkpoint.interval,
            directory: directory.clone(),
            max_to_keep: config.checkpoint.max_to_keep,
            required: config.checkpoint.required,
        }),
        _ => None,
    };

    let mut reports = Vec::with_capacity(runs);
    let mut traces = Vec::with_capacity(runs);
    for run_index in 0..runs {
        let seed = determinism::run_seed(config.seed_policy.master_seed, run_index as u64);
        let mut chain = build(seed)?;
        chain.set_schedule(config.schedule);
        chain.set_heat(config.heat)?;
        chain.set_under_prior(config.under_prior);

        let run_directory = run_artefact_directory(config, runs, run_index)?;
        if let Some(directory) = &run_directory {
            let targets = sampled_nodes(&chain)?;
            let monitor = TraceMonitor::new(chain.graph(), &targets, config.output.sample_interval)?
                .with_output(directory.join(&config.output.trace_file));
            chain.add_monitor(Box::new(monitor))?;
        }

        chain.initialize()?;
        chain.burnin(config.burn_in, config.tuning_interval)?;
        let mut stopping: Vec<Box<dyn StoppingRule>> = config
            .stopping
            .iter()
            .map(|rule| rule.materialize())
            .collect();
        let report = chain.run(config.generations, &mut stopping, checkpoint_plan.as_ref())?;

        if let Some(directory) = &run_directory {
            let manifest = RunManifest {
                created_at: Utc::now(),
                config: config.clone(),
                master_seed: seed,
                seed_label: config.seed_policy.label.clone(),
                generations_completed: report.generations_completed,
                final_posterior: report.final_summary.posterior,
                operator_stats: report.operator_stats.clone(),
                trace_file: Some(config.output.trace_file.clone()),
                checkpoints: report.checkpoints.clone(),
            };
            manifest.write(&directory.join(&config.output.manifest_file))?;
        }

        traces.push(chain.posterior_trace().to_vec());
        reports.push(report);
    }

    let combined = analysis::combine_traces(&traces, config.replication.combine);
    let ess = traces
        .iter()
        .map(|trace| analysis::effective_sample_size(trace))
        .collect();
    let psrf = if runs >= 2 {
        analysis::gelman_rubin(&traces)
    } else {
        f64::NAN
    };
    Ok(ReplicationOutcome {
        reports,
        traces,
        combined,
        ess,
        psrf,
    })
}

/// Resolves and creates the artefact directory for one run, when configured.
fn run_artefact_directory(
    config: &RunConfig,
    runs: usize,
    run_index: usize,
) -> Result<Option<PathBuf>, BgmError> {
    let root = match &config.output.run_directory {
        Some(root) => root,
        None => return Ok(None),
    };
    let directory = if runs == 1 {
        root.clone()
    } else {
        root.join(format!("run_{run_index}"))
    };
    fs::create_dir_all(&directory).map_err(|err| {
        BgmError::Serde(
            ErrorInfo::new("output-mkdir", err.to_string())
                .with_context("path", directory.display().to_string()),
        )
    })?;
    Ok(Some(directory))
}

/// Unclamped stochastic nodes, the columns a run's trace records.
fn sampled_nodes(chain: &Chain) -> Result<Vec<NodeId>, BgmError> {
    let mut targets = Vec::new();
    for id in chain.graph().stochastic_nodes() {
        if !chain.graph().is_clamped(id)? {
            targets.push(id);
        }
    }
    Ok(targets)
}
