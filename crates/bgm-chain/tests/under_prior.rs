use std::sync::{Arc, Mutex};

use bgm_chain::{Chain, ChainView, Monitor};
use bgm_core::errors::ErrorInfo;
use bgm_core::{BgmError, NodeId};
use bgm_graph::dist::Normal;
use bgm_graph::{ModelGraph, Value};
use bgm_moves::{Move, SlideProposal};

struct CollectMonitor {
    target: NodeId,
    samples: Arc<Mutex<Vec<f64>>>,
}

impl Monitor for CollectMonitor {
    fn name(&self) -> &str {
        "collect"
    }

    fn sample_interval(&self) -> u64 {
        5
    }

    fn on_generation(&mut self, view: &ChainView<'_>) -> Result<(), BgmError> {
        let value = view.value(self.target)?.as_real().ok_or_else(|| {
            BgmError::Monitor(ErrorInfo::new("non-real", "expected a real value"))
        })?;
        if let Ok(mut samples) = self.samples.lock() {
            samples.push(value);
        }
        Ok(())
    }
}

/// Same observed model as the posterior tests: mu ~ Normal(0, 1) with data
/// clamped far from the prior mean.
fn observed_chain(seed: u64) -> (Chain, NodeId) {
    let mut graph = ModelGraph::new();
    let zero = graph.add_constant("zero", Value::Real(0.0));
    let one = graph.add_constant("one", Value::Real(1.0));
    let mu = graph
        .add_stochastic("mu", Box::new(Normal), &[zero, one], Value::Real(0.0))
        .unwrap();
    let x = graph
        .add_stochastic("x", Box::new(Normal), &[mu, one], Value::Real(0.0))
        .unwrap();
    graph.clamp(x, Value::Real(4.0)).unwrap();

    let mut chain = Chain::new(graph, seed);
    chain
        .add_move(Move::new(Box::new(SlideProposal::new(mu, 2.0)), 1.0))
        .unwrap();
    (chain, mu)
}

#[test]
fn under_prior_sampling_ignores_the_data() {
    let (mut chain, mu) = observed_chain(31337);
    chain.set_under_prior(true);
    let samples = Arc::new(Mutex::new(Vec::new()));
    chain
        .add_monitor(Box::new(CollectMonitor {
            target: mu,
            samples: Arc::clone(&samples),
        }))
        .unwrap();

    chain.initialize().unwrap();
    chain.burnin(1_000, 100).unwrap();
    chain.run(50_000, &mut [], None).unwrap();

    let samples = samples.lock().unwrap();
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);

    // the prior is Normal(0, 1); the clamped observation at 4 must not pull
    // the samples toward 2 (the posterior mean)
    assert!(mean.abs() < 0.05, "prior mean was {mean}");
    assert!((variance - 1.0).abs() < 0.1, "prior variance was {variance}");
}

#[test]
fn cold_sampling_on_the_same_model_follows_the_posterior() {
    let (mut chain, mu) = observed_chain(31338);
    let samples = Arc::new(Mutex::new(Vec::new()));
    chain
        .add_monitor(Box::new(CollectMonitor {
            target: mu,
            samples: Arc::clone(&samples),
        }))
        .unwrap();

    chain.initialize().unwrap();
    chain.burnin(1_000, 100).unwrap();
    chain.run(50_000, &mut [], None).unwrap();

    let samples = samples.lock().unwrap();
    let mean = samples.iter().sum::<f64>() / samples.len() as f64;
    assert!((mean - 2.0).abs() < 0.05, "posterior mean was {mean}");
}
