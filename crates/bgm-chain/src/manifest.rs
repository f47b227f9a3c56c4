//! Run manifest serialization.

use std::fs;
use std::path::{Path, PathBuf};

use bgm_core::errors::ErrorInfo;
use bgm_core::BgmError;
use bgm_moves::OperatorStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;

/// Structured manifest describing a completed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Wall-clock time the manifest was written.
    pub created_at: DateTime<Utc>,
    /// Configuration used for the run.
    pub config: RunConfig,
    /// Master seed the run's substreams derive from.
    pub master_seed: u64,
    /// Optional seed label captured from the configuration.
    pub seed_label: Option<String>,
    /// Generations completed.
    pub generations_completed: u64,
    /// Log posterior of the terminal state.
    pub final_posterior: f64,
    /// Per-move acceptance summary.
    pub operator_stats: Vec<OperatorStats>,
    /// Trace file produced during the run (relative to the run directory).
    pub trace_file: Option<PathBuf>,
    /// Checkpoint files generated during the run, oldest first.
    pub checkpoints: Vec<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest to a JSON file, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), BgmError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                BgmError::Serde(
                    ErrorInfo::new("manifest-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            BgmError::Serde(
                ErrorInfo::new("manifest-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            BgmError::Serde(
                ErrorInfo::new("manifest-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Loads a manifest from disk.
    pub fn load(path: &Path) -> Result<Self, BgmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            BgmError::Serde(
                ErrorInfo::new("manifest-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            BgmError::Serde(
                ErrorInfo::new("manifest-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}
