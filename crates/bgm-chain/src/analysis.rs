//! Convergence diagnostics over posterior traces.

use serde::{Deserialize, Serialize};

/// How traces from replicate runs are merged for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombineMode {
    /// Concatenate run traces end to end, in run order.
    Sequential,
    /// Interleave the runs sample by sample.
    #[default]
    Mixed,
    /// Keep the traces separate.
    None,
}

fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

fn variance(samples: &[f64], mean: f64) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (samples.len() - 1) as f64
}

/// Effective sample size of a trace via summed autocorrelations.
///
/// The autocorrelation sum stops at the first non-positive lag estimate,
/// which keeps the noisy tail of the correlogram from inflating the result.
pub fn effective_sample_size(trace: &[f64]) -> f64 {
    let n = trace.len();
    if n < 2 {
        return n as f64;
    }
    let mu = mean(trace);
    let denom: f64 = trace.iter().map(|x| (x - mu).powi(2)).sum();
    if denom == 0.0 {
        // a perfectly flat trace carries no information about mixing
        return n as f64;
    }
    let mut rho_sum = 0.0;
    for lag in 1..n {
        let numer: f64 = trace[lag..]
            .iter()
            .zip(trace.iter())
            .map(|(a, b)| (a - mu) * (b - mu))
            .sum();
        let rho = numer / denom;
        if rho <= 0.0 {
            break;
        }
        rho_sum += rho;
    }
    (n as f64 / (1.0 + 2.0 * rho_sum)).clamp(1.0, n as f64)
}

/// Gelman-Rubin potential scale reduction factor over two or more traces.
///
/// Values near 1 indicate the runs have converged to the same distribution.
/// Returns `f64::NAN` when fewer than two non-trivial traces are supplied.
pub fn gelman_rubin(traces: &[Vec<f64>]) -> f64 {
    let m = traces.len();
    let n = traces.iter().map(Vec::len).min().unwrap_or(0);
    if m < 2 || n < 2 {
        return f64::NAN;
    }
    // truncate to a common length so the chains are comparable
    let means: Vec<f64> = traces.iter().map(|trace| mean(&trace[..n])).collect();
    let variances: Vec<f64> = traces
        .iter()
        .zip(&means)
        .map(|(trace, mu)| variance(&trace[..n], *mu))
        .collect();
    let grand_mean = mean(&means);
    let between = n as f64 / (m as f64 - 1.0)
        * means.iter().map(|mu| (mu - grand_mean).powi(2)).sum::<f64>();
    let within = mean(&variances);
    if within == 0.0 {
        return f64::NAN;
    }
    let pooled = (n as f64 - 1.0) / n as f64 * within + between / n as f64;
    (pooled / within).sqrt()
}

/// Merges replicate traces per the combine mode; `None` yields no merged
/// trace.
pub fn combine_traces(traces: &[Vec<f64>], mode: CombineMode) -> Option<Vec<f64>> {
    match mode {
        CombineMode::Sequential => Some(traces.concat()),
        CombineMode::Mixed => {
            let longest = traces.iter().map(Vec::len).max().unwrap_or(0);
            let mut merged = Vec::with_capacity(traces.iter().map(Vec::len).sum());
            for position in 0..longest {
                for trace in traces {
                    if let Some(sample) = trace.get(position) {
                        merged.push(*sample);
                    }
                }
            }
            Some(merged)
        }
        CombineMode::None => None,
    }
}
