//! Monitors observe the chain at sampling intervals.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use bgm_core::errors::ErrorInfo;
use bgm_core::{BgmError, NodeId};
use bgm_graph::{ModelGraph, ProbabilitySummary, Value};
use indexmap::IndexMap;

/// Read-only view of the chain handed to monitors.
///
/// Monitors cannot mutate the model; everything they need is reachable from
/// here.
pub struct ChainView<'a> {
    generation: u64,
    graph: &'a ModelGraph,
    summary: ProbabilitySummary,
}

impl<'a> ChainView<'a> {
    pub(crate) fn new(generation: u64, graph: &'a ModelGraph, summary: ProbabilitySummary) -> Self {
        Self {
            generation,
            graph,
            summary,
        }
    }

    /// Current generation number.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current value of a node.
    pub fn value(&self, id: NodeId) -> Result<&Value, BgmError> {
        self.graph.value(id)
    }

    /// Display name of a node.
    pub fn name(&self, id: NodeId) -> Result<&str, BgmError> {
        self.graph.name(id)
    }

    /// Joint log posterior of the current state.
    pub fn posterior(&self) -> f64 {
        self.summary.posterior
    }

    /// Log likelihood over clamped nodes.
    pub fn likelihood(&self) -> f64 {
        self.summary.likelihood
    }

    /// Log prior over unclamped stochastic nodes.
    pub fn prior(&self) -> f64 {
        self.summary.prior
    }
}

/// A chain observer invoked at its sampling interval.
///
/// A failing monitor is disabled for the rest of the run; it never aborts
/// sampling.
pub trait Monitor: Send {
    /// Name used when reporting a disabled monitor.
    fn name(&self) -> &str;

    /// Generations between samples.
    fn sample_interval(&self) -> u64;

    /// Observes the chain state at a sampling generation.
    fn on_generation(&mut self, view: &ChainView<'_>) -> Result<(), BgmError>;

    /// Flushes buffered output at the end of the run.
    fn finish(&mut self) -> Result<(), BgmError> {
        Ok(())
    }
}

/// One buffered row of a [`TraceMonitor`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRow {
    /// Generation the row was sampled at.
    pub generation: u64,
    /// Log posterior, likelihood, and prior at that generation.
    pub summary: (f64, f64, f64),
    /// Monitored node values in column order.
    pub values: Vec<Value>,
}

/// Buffers sampled node values and writes them as CSV at the end of the run.
#[derive(Debug)]
pub struct TraceMonitor {
    interval: u64,
    columns: IndexMap<String, NodeId>,
    rows: Vec<TraceRow>,
    output: Option<std::path::PathBuf>,
}

impl TraceMonitor {
    /// Creates a trace over the given nodes, sampling every `interval`
    /// generations. Column order follows the target order given here.
    pub fn new(
        graph: &ModelGraph,
        targets: &[NodeId],
        interval: u64,
    ) -> Result<Self, BgmError> {
        if interval == 0 {
            return Err(BgmError::Monitor(ErrorInfo::new(
                "zero-interval",
                "trace monitor interval must be at least one generation",
            )));
        }
        let mut columns = IndexMap::new();
        for id in targets {
            columns.insert(graph.name(*id)?.to_string(), *id);
        }
        Ok(Self {
            interval,
            columns,
            rows: Vec::new(),
            output: None,
        })
    }

    /// Writes the trace to `path` when the run finishes.
    pub fn with_output(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Buffered rows, in sampling order.
    pub fn rows(&self) -> &[TraceRow] {
        &self.rows
    }

    /// Writes the buffered trace as CSV.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), BgmError> {
        let path = path.as_ref();
        let mut file = File::create(path).map_err(|err| {
            BgmError::Monitor(
                ErrorInfo::new("trace-create", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        let mut header = String::from("generation,posterior,likelihood,prior");
        for name in self.columns.keys() {
            header.push(',');
            header.push_str(name);
        }
        writeln!(file, "{header}").map_err(|err| {
            BgmError::Monitor(
                ErrorInfo::new("trace-write", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        for row in &self.rows {
            let mut line = format!(
                "{},{:.6},{:.6},{:.6}",
                row.generation, row.summary.0, row.summary.1, row.summary.2
            );
            for value in &row.values {
                line.push(',');
                line.push_str(&value.to_string());
            }
            writeln!(file, "{line}").map_err(|err| {
                BgmError::Monitor(
                    ErrorInfo::new("trace-write", err.to_string())
                        .with_context("path", path.display().to_string()),
                )
            })?;
        }
        Ok(())
    }
}

impl Monitor for TraceMonitor {
    fn name(&self) -> &str {
        "trace"
    }

    fn sample_interval(&self) -> u64 {
        self.interval
    }

    fn on_generation(&mut self, view: &ChainView<'_>) -> Result<(), BgmError> {
        let values = self
            .columns
            .values()
            .map(|id| view.value(*id).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        self.rows.push(TraceRow {
            generation: view.generation(),
            summary: (view.posterior(), view.likelihood(), view.prior()),
            values,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), BgmError> {
        match &self.output {
            Some(path) => self.write_csv(path.clone()),
            None => Ok(()),
        }
    }
}
