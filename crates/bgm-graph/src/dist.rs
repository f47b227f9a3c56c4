//! Reference distributions.
//!
//! These cover what the engine's own tests and demos need; a production model
//! would link a full statistical library against the [`Distribution`] trait.
//! All densities are returned in log space with `-inf` for values or
//! parameters outside their domain.

use bgm_core::errors::ErrorInfo;
use bgm_core::{uniform01, BgmError};
use rand::RngCore;

use crate::interfaces::Distribution;
use crate::value::{Value, ValueKind};

const LN_TWO_PI: f64 = 1.837_877_066_409_345_5;

fn real_param(params: &[Value], index: usize) -> Option<f64> {
    params.get(index).and_then(Value::as_real)
}

fn expect_real(name: &'static str, params: &[Value], index: usize) -> Result<f64, BgmError> {
    real_param(params, index).ok_or_else(|| {
        BgmError::Construction(
            ErrorInfo::new("parameter-kind", "expected a real-valued parameter")
                .with_context("distribution", name)
                .with_context("parameter", index.to_string()),
        )
    })
}

/// Draws a standard normal variate by the Box-Muller transform.
pub fn standard_normal(rng: &mut dyn RngCore) -> f64 {
    let u1 = uniform01(rng).max(f64::MIN_POSITIVE);
    let u2 = uniform01(rng);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Normal distribution parameterized by `[mean, sd]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normal;

impl Distribution for Normal {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn arity(&self) -> usize {
        2
    }

    fn validate_parameters(&self, params: &[Value]) -> Result<(), BgmError> {
        expect_real(self.name(), params, 0)?;
        expect_real(self.name(), params, 1)?;
        Ok(())
    }

    fn ln_density(&self, value: &Value, params: &[Value]) -> f64 {
        let (Some(x), Some(mean), Some(sd)) =
            (value.as_real(), real_param(params, 0), real_param(params, 1))
        else {
            return f64::NEG_INFINITY;
        };
        if sd <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let z = (x - mean) / sd;
        -0.5 * LN_TWO_PI - sd.ln() - 0.5 * z * z
    }

    fn sample(&self, params: &[Value], rng: &mut dyn RngCore) -> Result<Value, BgmError> {
        let mean = expect_real(self.name(), params, 0)?;
        let sd = expect_real(self.name(), params, 1)?;
        Ok(Value::Real(mean + sd * standard_normal(rng)))
    }
}

/// Lognormal distribution parameterized by `[mu, sigma]` on the log scale.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lognormal;

impl Distribution for Lognormal {
    fn name(&self) -> &'static str {
        "lognormal"
    }

    fn arity(&self) -> usize {
        2
    }

    fn validate_parameters(&self, params: &[Value]) -> Result<(), BgmError> {
        expect_real(self.name(), params, 0)?;
        expect_real(self.name(), params, 1)?;
        Ok(())
    }

    fn ln_density(&self, value: &Value, params: &[Value]) -> f64 {
        let (Some(x), Some(mu), Some(sigma)) =
            (value.as_real(), real_param(params, 0), real_param(params, 1))
        else {
            return f64::NEG_INFINITY;
        };
        if x <= 0.0 || sigma <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let z = (x.ln() - mu) / sigma;
        -x.ln() - sigma.ln() - 0.5 * LN_TWO_PI - 0.5 * z * z
    }

    fn sample(&self, params: &[Value], rng: &mut dyn RngCore) -> Result<Value, BgmError> {
        let mu = expect_real(self.name(), params, 0)?;
        let sigma = expect_real(self.name(), params, 1)?;
        Ok(Value::Real((mu + sigma * standard_normal(rng)).exp()))
    }
}

/// Exponential distribution parameterized by `[rate]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential;

impl Distribution for Exponential {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn arity(&self) -> usize {
        1
    }

    fn validate_parameters(&self, params: &[Value]) -> Result<(), BgmError> {
        expect_real(self.name(), params, 0)?;
        Ok(())
    }

    fn ln_density(&self, value: &Value, params: &[Value]) -> f64 {
        let (Some(x), Some(rate)) = (value.as_real(), real_param(params, 0)) else {
            return f64::NEG_INFINITY;
        };
        if x < 0.0 || rate <= 0.0 {
            return f64::NEG_INFINITY;
        }
        rate.ln() - rate * x
    }

    fn sample(&self, params: &[Value], rng: &mut dyn RngCore) -> Result<Value, BgmError> {
        let rate = expect_real(self.name(), params, 0)?;
        if rate <= 0.0 {
            return Err(BgmError::Construction(
                ErrorInfo::new("parameter-domain", "exponential rate must be positive")
                    .with_context("rate", rate.to_string()),
            ));
        }
        let u = uniform01(rng).min(1.0 - f64::EPSILON);
        Ok(Value::Real(-(1.0 - u).ln() / rate))
    }
}

/// Continuous uniform distribution parameterized by `[lower, upper]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uniform;

impl Distribution for Uniform {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn arity(&self) -> usize {
        2
    }

    fn validate_parameters(&self, params: &[Value]) -> Result<(), BgmError> {
        let lower = expect_real(self.name(), params, 0)?;
        let upper = expect_real(self.name(), params, 1)?;
        if lower >= upper {
            return Err(BgmError::Construction(
                ErrorInfo::new("parameter-domain", "uniform bounds must satisfy lower < upper")
                    .with_context("lower", lower.to_string())
                    .with_context("upper", upper.to_string()),
            ));
        }
        Ok(())
    }

    fn ln_density(&self, value: &Value, params: &[Value]) -> f64 {
        let (Some(x), Some(lower), Some(upper)) =
            (value.as_real(), real_param(params, 0), real_param(params, 1))
        else {
            return f64::NEG_INFINITY;
        };
        if upper <= lower || x < lower || x > upper {
            return f64::NEG_INFINITY;
        }
        -(upper - lower).ln()
    }

    fn sample(&self, params: &[Value], rng: &mut dyn RngCore) -> Result<Value, BgmError> {
        let lower = expect_real(self.name(), params, 0)?;
        let upper = expect_real(self.name(), params, 1)?;
        Ok(Value::Real(lower + (upper - lower) * uniform01(rng)))
    }
}

/// Checks that a value kind is acceptable as an observation of the given
/// distribution. All reference distributions are over real scalars.
pub fn supports_kind(kind: ValueKind) -> bool {
    kind == ValueKind::Real
}
