//! YAML configuration schema and defaults.

use std::fs;
use std::path::{Path, PathBuf};

use bgm_core::errors::ErrorInfo;
use bgm_core::BgmError;
use serde::{Deserialize, Serialize};

use crate::analysis::CombineMode;
use crate::schedule::ScheduleKind;
use crate::stopping::StoppingRuleConfig;

/// YAML-configurable parameters governing a sampling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Number of sampling generations (post burn-in).
    pub generations: u64,
    /// Number of burn-in generations discarded before sampling.
    #[serde(default)]
    pub burn_in: u64,
    /// Generations between step-size tuning passes during burn-in.
    #[serde(default = "default_tuning_interval")]
    pub tuning_interval: u64,
    /// Move scheduling policy.
    #[serde(default)]
    pub schedule: ScheduleKind,
    /// Chain heat applied to the probability ratio.
    #[serde(default = "default_heat")]
    pub heat: f64,
    /// Sample under the prior, ignoring clamped nodes.
    #[serde(default)]
    pub under_prior: bool,
    /// Rules that may end each run before its generation budget.
    #[serde(default)]
    pub stopping: Vec<StoppingRuleConfig>,
    /// Master seed and substream policy.
    #[serde(default)]
    pub seed_policy: SeedPolicy,
    /// Replicated-run behaviour.
    #[serde(default)]
    pub replication: ReplicationConfig,
    /// Checkpointing behaviour.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    /// Output directory configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_tuning_interval() -> u64 {
    100
}

fn default_heat() -> f64 {
    1.0
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            generations: 1000,
            burn_in: 0,
            tuning_interval: default_tuning_interval(),
            schedule: ScheduleKind::default(),
            heat: default_heat(),
            under_prior: false,
            stopping: Vec::new(),
            seed_policy: SeedPolicy::default(),
            replication: ReplicationConfig::default(),
            checkpoint: CheckpointConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Loads and validates a configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self, BgmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            BgmError::Serde(
                ErrorInfo::new("config-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_yaml(&contents)
    }

    /// Parses and validates a configuration from YAML text.
    pub fn from_yaml(contents: &str) -> Result<Self, BgmError> {
        let config: Self = serde_yaml::from_str(contents).map_err(|err| {
            BgmError::Serde(ErrorInfo::new("config-parse", err.to_string()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints the schema cannot express.
    pub fn validate(&self) -> Result<(), BgmError> {
        if self.generations == 0 {
            return Err(BgmError::Serde(ErrorInfo::new(
                "config-invalid",
                "generations must be at least one",
            )));
        }
        if !(self.heat > 0.0) {
            return Err(BgmError::Serde(
                ErrorInfo::new("config-invalid", "heat must be positive")
                    .with_context("heat", self.heat.to_string()),
            ));
        }
        if self.replication.runs == 0 {
            return Err(BgmError::Serde(ErrorInfo::new(
                "config-invalid",
                "replication.runs must be at least one",
            )));
        }
        if self.output.sample_interval == 0 {
            return Err(BgmError::Serde(ErrorInfo::new(
                "config-invalid",
                "output.sample_interval must be at least one",
            )));
        }
        Ok(())
    }
}

/// Deterministic seeding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPolicy {
    /// Master seed for the analysis; run seeds are derived from it.
    #[serde(default = "default_master_seed")]
    pub master_seed: u64,
    /// Optional label recorded in manifests.
    #[serde(default)]
    pub label: Option<String>,
}

fn default_master_seed() -> u64 {
    0x05EE_D5EE_DD15_5EED_u64
}

impl Default for SeedPolicy {
    fn default() -> Self {
        Self {
            master_seed: default_master_seed(),
            label: None,
        }
    }
}

/// Replicated-run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Number of independent runs.
    #[serde(default = "default_runs")]
    pub runs: usize,
    /// How replicate traces are merged for reporting.
    #[serde(default)]
    pub combine: CombineMode,
}

fn default_runs() -> usize {
    1
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            runs: default_runs(),
            combine: CombineMode::default(),
        }
    }
}

/// Checkpointing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Interval in generations between checkpoint writes (0 disables).
    #[serde(default)]
    pub interval: u64,
    /// Directory where checkpoints are stored.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Maximum number of checkpoints to retain (0 keeps all).
    #[serde(default = "default_checkpoint_retention")]
    pub max_to_keep: usize,
    /// Treat a failed checkpoint write as fatal instead of a warning.
    #[serde(default)]
    pub required: bool,
}

fn default_checkpoint_retention() -> usize {
    4
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            directory: None,
            max_to_keep: default_checkpoint_retention(),
            required: false,
        }
    }
}

/// Output artefact layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory for run artefacts. Created if it does not exist.
    #[serde(default)]
    pub run_directory: Option<PathBuf>,
    /// Generations between trace samples.
    #[serde(default = "default_output_sample_interval")]
    pub sample_interval: u64,
    /// Trace filename relative to `run_directory`.
    #[serde(default = "default_trace_filename")]
    pub trace_file: PathBuf,
    /// Manifest filename relative to `run_directory`.
    #[serde(default = "default_manifest_filename")]
    pub manifest_file: PathBuf,
}

fn default_output_sample_interval() -> u64 {
    1
}

fn default_trace_filename() -> PathBuf {
    PathBuf::from("trace.csv")
}

fn default_manifest_filename() -> PathBuf {
    PathBuf::from("manifest.json")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            sample_interval: default_output_sample_interval(),
            trace_file: default_trace_filename(),
            manifest_file: default_manifest_filename(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_yaml_fills_defaults() {
        let config = RunConfig::from_yaml("generations: 500\n").unwrap();
        assert_eq!(config.generations, 500);
        assert_eq!(config.tuning_interval, 100);
        assert_eq!(config.schedule, ScheduleKind::Sequential);
        assert_eq!(config.heat, 1.0);
        assert_eq!(config.replication.runs, 1);
        assert_eq!(config.checkpoint.interval, 0);
    }

    #[test]
    fn tagged_stopping_rules_parse() {
        let config = RunConfig::from_yaml(concat!(
            "generations: 10\n",
            "stopping:\n",
            "  - rule: max-wall-clock\n",
            "    seconds: 3600\n",
            "  - rule: min-ess\n",
            "    target: 200.0\n",
        ))
        .unwrap();
        assert_eq!(config.stopping.len(), 2);
        assert!(matches!(
            config.stopping[0],
            StoppingRuleConfig::MaxWallClock { seconds: 3600 }
        ));
        assert!(matches!(
            config.stopping[1],
            StoppingRuleConfig::MinEss {
                check_interval: 100,
                ..
            }
        ));
    }

    #[test]
    fn kebab_case_schedule_names_parse() {
        let config =
            RunConfig::from_yaml("generations: 10\nschedule: random\n").unwrap();
        assert_eq!(config.schedule, ScheduleKind::Random);
    }

    #[test]
    fn invalid_heat_is_rejected() {
        let err = RunConfig::from_yaml("generations: 10\nheat: 0.0\n").unwrap_err();
        assert_eq!(err.info().code, "config-invalid");
    }
}
