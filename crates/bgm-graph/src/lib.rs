#![deny(missing_docs)]

//! Computational node graph for incremental MCMC re-evaluation.
//!
//! A model is a DAG of constant, stochastic, and deterministic nodes. During
//! sampling, a proposal mutates one or more node values, `touch` propagates
//! dirtiness through the affected subgraph, the log-probability ratio is
//! computed incrementally over exactly those nodes, and the transaction ends
//! with either `keep` (commit) or `restore` (rollback). At rest every node is
//! clean and its cached value equals its stored baseline.

pub mod dist;
pub mod func;
pub mod interfaces;
pub mod model;
pub mod value;

pub use interfaces::{Distribution, NodeFunction};
pub use model::{ModelGraph, NodeKindTag, ProbabilitySummary};
pub use value::{Value, ValueKind};
