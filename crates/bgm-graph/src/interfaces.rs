//! Interfaces to the numerical collaborators of the graph.
//!
//! Distributions and deterministic functions are pure numerical code supplied
//! from outside the core: the graph only needs their densities, samples, and
//! evaluations. Parameters are passed as the parent values of the owning node
//! in registration order.

use bgm_core::BgmError;
use rand::RngCore;

use crate::value::Value;

/// A probability distribution attached to a stochastic node.
///
/// `ln_density` never fails: a value outside the support, or parameters
/// outside their domain, yield `-inf`. `NaN` must never escape; callers
/// sanitize it to `-inf` so a corrupted density can only ever cause a
/// rejection, not an acceptance.
pub trait Distribution: Send {
    /// Short identifier used in summaries and error contexts.
    fn name(&self) -> &'static str;

    /// Number of parameters (parent nodes) this distribution expects.
    fn arity(&self) -> usize;

    /// Validates parameter values at construction time.
    fn validate_parameters(&self, params: &[Value]) -> Result<(), BgmError>;

    /// Log density of `value` given the parameters.
    fn ln_density(&self, value: &Value, params: &[Value]) -> f64;

    /// Draws a fresh value from the distribution.
    fn sample(&self, params: &[Value], rng: &mut dyn RngCore) -> Result<Value, BgmError>;
}

/// A pure function attached to a deterministic node.
///
/// The node's cached value is `evaluate` applied to its parents' current
/// values; evaluation failures are construction-class errors (the model wired
/// incompatible kinds together), never sampling outcomes.
pub trait NodeFunction: Send {
    /// Short identifier used in summaries and error contexts.
    fn name(&self) -> &'static str;

    /// Number of arguments (parent nodes) this function expects; `None` for
    /// variadic functions taking one or more arguments.
    fn arity(&self) -> Option<usize>;

    /// Evaluates the function over the parent values.
    fn evaluate(&self, params: &[Value]) -> Result<Value, BgmError>;
}

/// Maps a possibly-NaN log density to the engine's sentinel policy.
///
/// Probabilities live in log space; `-inf` means "out of support, reject".
/// NaN is treated as a support violation.
pub fn sanitize_ln(ln: f64) -> f64 {
    if ln.is_nan() {
        f64::NEG_INFINITY
    } else {
        ln
    }
}
