use std::sync::{Arc, Mutex};

use bgm_core::{BgmError, NodeId, RngHandle};
use bgm_graph::dist::Normal;
use bgm_graph::{ModelGraph, Value};
use bgm_moves::{
    retune_step, Move, Proposal, ScaleProposal, SlideProposal, TARGET_RATE_BLOCK,
    TARGET_RATE_SCALAR,
};
use proptest::prelude::*;
use rand::RngCore;

proptest! {
    #[test]
    fn retuning_is_monotone_in_the_acceptance_rate(
        step in 1e-6f64..1e3,
        low in 0.0f64..1.0,
        high in 0.0f64..1.0,
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let a = retune_step(step, low, TARGET_RATE_SCALAR);
        let b = retune_step(step, high, TARGET_RATE_SCALAR);
        prop_assert!(a <= b + 1e-12);
        prop_assert!((1e-9..=1e9).contains(&a));
        prop_assert!((1e-9..=1e9).contains(&b));
    }
}

#[test]
fn high_acceptance_grows_the_step() {
    let tuned = retune_step(1.0, 0.6, TARGET_RATE_SCALAR);
    let expected = 1.0 * (1.0 + (0.6 - TARGET_RATE_SCALAR) / (1.0 - TARGET_RATE_SCALAR));
    assert!((tuned - expected).abs() < 1e-12);
    assert!(tuned > 1.0);
}

#[test]
fn low_acceptance_shrinks_the_step() {
    let tuned = retune_step(1.0, 0.1, TARGET_RATE_SCALAR);
    let expected = 1.0 / (2.0 - 0.1 / TARGET_RATE_SCALAR);
    assert!((tuned - expected).abs() < 1e-12);
    assert!(tuned < 1.0);
}

#[test]
fn on_target_acceptance_is_a_fixed_point() {
    for target in [TARGET_RATE_SCALAR, TARGET_RATE_BLOCK] {
        let tuned = retune_step(0.7, target, target);
        assert!((tuned - 0.7).abs() < 1e-12);
    }
}

#[test]
fn tuning_is_clamped_against_degenerate_epochs() {
    // full rejection can at most halve the step, and never below the floor
    assert!(retune_step(1e-9, 0.0, TARGET_RATE_SCALAR) >= 1e-9);
    // full acceptance cannot blow past the ceiling
    assert!(retune_step(1e9, 1.0, TARGET_RATE_SCALAR) <= 1e9);
}

#[test]
fn scale_and_slide_tune_toward_their_targets() {
    let node = NodeId::from_raw(0);
    let mut scale = ScaleProposal::new(node, 0.5);
    scale.tune(0.9);
    assert!(scale.lambda() > 0.5);
    scale.tune(0.05);

    let mut slide = SlideProposal::new(node, 2.0);
    slide.tune(0.05);
    assert!(slide.delta() < 2.0);
}

/// Proposal double that records the acceptance rates passed to `tune`.
struct TuneRecorder {
    targets: [NodeId; 1],
    observed: Arc<Mutex<Vec<f64>>>,
}

impl Proposal for TuneRecorder {
    fn name(&self) -> &'static str {
        "tune-recorder"
    }

    fn target_nodes(&self) -> &[NodeId] {
        &self.targets
    }

    fn propose(
        &mut self,
        graph: &mut ModelGraph,
        _rng: &mut dyn RngCore,
    ) -> Result<f64, BgmError> {
        // an unchanged value is always accepted (ratio 0, alpha 0 -> accept)
        let id = self.targets[0];
        let value = graph.value(id)?.clone();
        graph.set_stochastic_value(id, value)?;
        graph.touch(id)?;
        Ok(0.0)
    }

    fn is_tunable(&self) -> bool {
        true
    }

    fn tune(&mut self, acceptance_rate: f64) {
        if let Ok(mut observed) = self.observed.lock() {
            observed.push(acceptance_rate);
        }
    }

    fn parameter_summary(&self) -> String {
        String::new()
    }
}

#[test]
fn move_tune_reports_epoch_rates_and_resets() {
    let mut graph = ModelGraph::new();
    let mean = graph.add_constant("mean", Value::Real(0.0));
    let sd = graph.add_constant("sd", Value::Real(1.0));
    let x = graph
        .add_stochastic("x", Box::new(Normal), &[mean, sd], Value::Real(0.0))
        .unwrap();

    let observed = Arc::new(Mutex::new(Vec::new()));
    let mut mv = Move::new(
        Box::new(TuneRecorder {
            targets: [x],
            observed: Arc::clone(&observed),
        }),
        1.0,
    );
    let mut rng = RngHandle::from_seed(11);

    for _ in 0..4 {
        mv.perform(&mut graph, 1.0, false, &mut rng).unwrap();
    }
    mv.tune();
    // every identity proposal is accepted, so the first epoch rate is 1
    assert_eq!(observed.lock().unwrap().as_slice(), &[1.0]);

    // a tune call on an empty epoch must not report a rate
    mv.tune();
    assert_eq!(observed.lock().unwrap().len(), 1);

    for _ in 0..2 {
        mv.perform(&mut graph, 1.0, false, &mut rng).unwrap();
    }
    mv.tune();
    assert_eq!(observed.lock().unwrap().as_slice(), &[1.0, 1.0]);
    assert_eq!(mv.stats().tried, 6);
    assert_eq!(mv.stats().accepted, 6);
}
