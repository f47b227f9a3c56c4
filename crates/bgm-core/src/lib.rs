#![deny(missing_docs)]

//! Core identifiers, deterministic randomness, and error types shared by the
//! bgm engine crates.
//!
//! The engine samples posterior distributions by Markov chain Monte Carlo over
//! a directed acyclic graph of computational nodes. Everything downstream of
//! this crate (graph, moves, chain) refers to nodes through the opaque
//! [`NodeId`] handle and reports failures through [`BgmError`].

pub mod errors;
pub mod ids;
pub mod rng;

pub use errors::{BgmError, ErrorInfo};
pub use ids::NodeId;
pub use rng::{derive_substream_seed, uniform01, RngHandle};
