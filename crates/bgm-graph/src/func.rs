//! Reference deterministic node functions.

use bgm_core::errors::ErrorInfo;
use bgm_core::BgmError;

use crate::interfaces::NodeFunction;
use crate::value::Value;

fn reals(name: &'static str, params: &[Value]) -> Result<Vec<f64>, BgmError> {
    params
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            value.as_real().ok_or_else(|| {
                BgmError::Construction(
                    ErrorInfo::new("argument-kind", "expected a real-valued argument")
                        .with_context("function", name)
                        .with_context("argument", idx.to_string()),
                )
            })
        })
        .collect()
}

/// `exp(x)` over a single real argument.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exp;

impl NodeFunction for Exp {
    fn name(&self) -> &'static str {
        "exp"
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }

    fn evaluate(&self, params: &[Value]) -> Result<Value, BgmError> {
        let args = reals(self.name(), params)?;
        Ok(Value::Real(args[0].exp()))
    }
}

/// Sum of one or more real arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl NodeFunction for Sum {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn arity(&self) -> Option<usize> {
        None
    }

    fn evaluate(&self, params: &[Value]) -> Result<Value, BgmError> {
        let args = reals(self.name(), params)?;
        Ok(Value::Real(args.iter().sum()))
    }
}

/// Product of one or more real arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct Product;

impl NodeFunction for Product {
    fn name(&self) -> &'static str {
        "product"
    }

    fn arity(&self) -> Option<usize> {
        None
    }

    fn evaluate(&self, params: &[Value]) -> Result<Value, BgmError> {
        let args = reals(self.name(), params)?;
        Ok(Value::Real(args.iter().product()))
    }
}

/// `scale * x + offset` over a single real argument.
#[derive(Debug, Clone, Copy)]
pub struct Affine {
    /// Multiplicative coefficient.
    pub scale: f64,
    /// Additive offset.
    pub offset: f64,
}

impl NodeFunction for Affine {
    fn name(&self) -> &'static str {
        "affine"
    }

    fn arity(&self) -> Option<usize> {
        Some(1)
    }

    fn evaluate(&self, params: &[Value]) -> Result<Value, BgmError> {
        let args = reals(self.name(), params)?;
        Ok(Value::Real(self.scale * args[0] + self.offset))
    }
}
