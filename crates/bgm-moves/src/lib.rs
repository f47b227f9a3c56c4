#![deny(missing_docs)]

//! Metropolis-Hastings machinery over the model graph.
//!
//! A [`Proposal`] perturbs node values and reports its Hastings correction; a
//! [`Move`] wraps a proposal with the full accept/reject transaction against
//! the graph, plus acceptance bookkeeping and step-size tuning. Moves never
//! leave a transaction open: every `perform` call ends in either a commit or
//! a rollback.

pub mod mh;
pub mod proposal;
pub mod scalar;
pub mod tuning;
pub mod vector;

pub use mh::{Move, MoveOutcome, OperatorStats};
pub use proposal::Proposal;
pub use scalar::{ScaleProposal, SlideProposal};
pub use tuning::{retune_step, TARGET_RATE_BLOCK, TARGET_RATE_SCALAR};
pub use vector::VectorSlideProposal;
