//! Deterministic seed derivation.
//!
//! Every random decision in a run draws from a seed derived purely from the
//! master seed and the decision's coordinates (run index, generation, slot).
//! No RNG state survives between generations, so resuming from a checkpoint
//! needs nothing beyond the master seed and the generation counter.

use bgm_core::derive_substream_seed;

/// Derives the master seed for one run of a replicated analysis.
pub fn run_seed(master_seed: u64, run_index: u64) -> u64 {
    derive_substream_seed(master_seed, run_index)
}

/// Derives the seed used to draw a generation's move schedule.
pub fn schedule_seed(master_seed: u64, generation: u64) -> u64 {
    derive_substream_seed(master_seed ^ 0x5C4E_D01E_5C4E_D01E, generation)
}

/// Derives the seed for the proposal executed at `slot` within a generation.
pub fn move_seed(master_seed: u64, generation: u64, slot: u64) -> u64 {
    derive_substream_seed(derive_substream_seed(master_seed, generation), slot)
}

/// Derives the seed for one attempt of the initialization redraw loop.
pub fn redraw_seed(master_seed: u64, attempt: u64) -> u64 {
    derive_substream_seed(master_seed ^ 0xD12A_77D1_2A77_D12A, attempt)
}
