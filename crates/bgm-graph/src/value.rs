//! Node value payloads.

use serde::{Deserialize, Serialize};

/// Kind tag for a [`Value`], used for construction-time compatibility checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Real-valued scalar.
    Real,
    /// Non-negative integer scalar.
    Natural,
    /// Boolean flag.
    Boolean,
    /// Dense vector of reals.
    RealVector,
    /// Vector of non-negative reals summing to one.
    Simplex,
}

/// Cached payload held by a node.
///
/// A closed set of variants rather than a type-erased box: the sampling loop
/// dispatches on values in its innermost hot path and the set of kinds the
/// engine understands is small and fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Real-valued scalar.
    Real(f64),
    /// Non-negative integer scalar.
    Natural(u64),
    /// Boolean flag.
    Boolean(bool),
    /// Dense vector of reals.
    RealVector(Vec<f64>),
    /// Vector of non-negative reals summing to one.
    Simplex(Vec<f64>),
}

impl Value {
    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Real(_) => ValueKind::Real,
            Value::Natural(_) => ValueKind::Natural,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::RealVector(_) => ValueKind::RealVector,
            Value::Simplex(_) => ValueKind::Simplex,
        }
    }

    /// Returns the scalar payload if this is a `Real` value.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            _ => None,
        }
    }

    /// Returns the vector payload if this is a `RealVector` or `Simplex`.
    pub fn as_real_vector(&self) -> Option<&[f64]> {
        match self {
            Value::RealVector(xs) | Value::Simplex(xs) => Some(xs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Real(x) => write!(f, "{x}"),
            Value::Natural(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::RealVector(xs) | Value::Simplex(xs) => {
                write!(f, "[")?;
                for (idx, x) in xs.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
        }
    }
}
