//! Structured error types shared across bgm crates.
//!
//! Support violations (a proposed value outside a distribution's domain) are
//! deliberately NOT errors: they are signalled by a `-inf` log probability and
//! cause automatic rejection inside the sampling loop.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`BgmError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (node names, sizes, paths, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the bgm engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum BgmError {
    /// Model construction errors: unknown parents, arity or kind mismatches,
    /// parent swaps that would create a cycle. Fatal at build time, never
    /// raised mid-run.
    #[error("construction error: {0}")]
    Construction(ErrorInfo),
    /// Move transaction misuse: a proposal issued while another is pending,
    /// or commit/rollback without a matching touch. Indicates internal state
    /// corruption and terminates the run.
    #[error("transaction error: {0}")]
    Transaction(ErrorInfo),
    /// Checkpoint I/O failures. Soft unless checkpointing was required.
    #[error("checkpoint error: {0}")]
    Checkpoint(ErrorInfo),
    /// Failures raised inside a monitor callback. The offending monitor is
    /// disabled; sampling continues.
    #[error("monitor error: {0}")]
    Monitor(ErrorInfo),
    /// Non-computable numerical state, e.g. no computable starting
    /// probability after the initialization retry budget.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl BgmError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            BgmError::Construction(info)
            | BgmError::Transaction(info)
            | BgmError::Checkpoint(info)
            | BgmError::Monitor(info)
            | BgmError::Numeric(info)
            | BgmError::Serde(info) => info,
        }
    }

    /// True for errors that must terminate the run (state corruption or an
    /// unusable model), as opposed to conditions the chain can survive.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BgmError::Construction(_) | BgmError::Transaction(_))
    }
}
