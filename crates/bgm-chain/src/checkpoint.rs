//! Checkpoint serialization.
//!
//! A checkpoint holds node values and run coordinates, never RNG state:
//! because every proposal seed is derived from the master seed and its
//! (generation, slot) coordinates, a resumed run replays the exact random
//! stream the uninterrupted run would have used.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use bgm_core::errors::ErrorInfo;
use bgm_core::BgmError;
use bgm_graph::Value;
use serde::{Deserialize, Serialize};

use crate::schedule::ScheduleKind;

/// Serializable chain state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Generation the checkpoint was written at.
    pub generation: u64,
    /// Master seed of the run.
    pub master_seed: u64,
    /// Chain heat.
    pub heat: f64,
    /// Whether the chain samples under the prior.
    pub under_prior: bool,
    /// Move scheduling policy.
    pub schedule: ScheduleKind,
    /// Node values keyed by raw node identifier.
    pub values: BTreeMap<u64, Value>,
    /// Posterior trace collected up to the checkpoint.
    pub posterior_trace: Vec<f64>,
}

impl CheckpointPayload {
    /// Restores a payload from disk.
    pub fn load(path: &Path) -> Result<Self, BgmError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            BgmError::Checkpoint(
                ErrorInfo::new("checkpoint-read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        serde_json::from_str(&contents).map_err(|err| {
            BgmError::Serde(
                ErrorInfo::new("checkpoint-parse", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }

    /// Writes the payload to disk, creating parent directories as needed.
    pub fn store(&self, path: &Path) -> Result<(), BgmError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                BgmError::Checkpoint(
                    ErrorInfo::new("checkpoint-mkdir", err.to_string())
                        .with_context("path", parent.display().to_string()),
                )
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|err| {
            BgmError::Serde(
                ErrorInfo::new("checkpoint-serialize", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        fs::write(path, json).map_err(|err| {
            BgmError::Checkpoint(
                ErrorInfo::new("checkpoint-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })
    }
}

/// Checkpoint file path for a generation, under a deterministic numbering
/// scheme.
pub fn checkpoint_path(root: &Path, generation: u64) -> PathBuf {
    root.join(format!("ckpt_{generation:08}.json"))
}

/// Deletes the oldest checkpoints beyond the retention limit.
pub fn enforce_retention(paths: &mut Vec<PathBuf>, max_to_keep: usize) -> Result<(), BgmError> {
    if max_to_keep == 0 {
        return Ok(());
    }
    while paths.len() > max_to_keep {
        let oldest = paths.remove(0);
        fs::remove_file(&oldest).map_err(|err| {
            BgmError::Checkpoint(
                ErrorInfo::new("checkpoint-prune", err.to_string())
                    .with_context("path", oldest.display().to_string()),
            )
        })?;
    }
    Ok(())
}
