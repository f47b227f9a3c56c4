use bgm_chain::{Chain, CheckpointPayload, CheckpointPlan};
use bgm_core::NodeId;
use bgm_graph::dist::{Exponential, Normal};
use bgm_graph::{ModelGraph, Value};
use bgm_moves::{Move, ScaleProposal, SlideProposal};

/// rate ~ Exponential(1); mu ~ Normal(0, 1); x ~ Normal(mu, 1) observed.
fn build_chain(seed: u64) -> (Chain, NodeId, NodeId) {
    let mut graph = ModelGraph::new();
    let one = graph.add_constant("one", Value::Real(1.0));
    let zero = graph.add_constant("zero", Value::Real(0.0));
    let rate = graph
        .add_stochastic("rate", Box::new(Exponential), &[one], Value::Real(1.0))
        .unwrap();
    let mu = graph
        .add_stochastic("mu", Box::new(Normal), &[zero, one], Value::Real(0.0))
        .unwrap();
    let x = graph
        .add_stochastic("x", Box::new(Normal), &[mu, one], Value::Real(0.0))
        .unwrap();
    graph.clamp(x, Value::Real(1.5)).unwrap();

    let mut chain = Chain::new(graph, seed);
    chain
        .add_move(Move::new(Box::new(ScaleProposal::new(rate, 0.5)), 1.0))
        .unwrap();
    chain
        .add_move(Move::new(Box::new(SlideProposal::new(mu, 1.0)), 1.0))
        .unwrap();
    (chain, rate, mu)
}

#[test]
fn resumed_run_reproduces_the_uninterrupted_run() {
    let (mut reference, ref_rate, ref_mu) = build_chain(555);
    reference.initialize().unwrap();
    reference.run(100, &mut [], None).unwrap();

    let (mut interrupted, _, _) = build_chain(555);
    interrupted.initialize().unwrap();
    interrupted.run(40, &mut [], None).unwrap();
    let payload = interrupted.checkpoint_payload();

    // resume into a freshly built chain, as a separate process would
    let (mut resumed, res_rate, res_mu) = build_chain(555);
    resumed.restore(&payload).unwrap();
    assert_eq!(resumed.generation(), 40);
    resumed.run(60, &mut [], None).unwrap();

    assert_eq!(resumed.generation(), reference.generation());
    // node values go through the same pure recomputation on both paths
    assert_eq!(
        resumed.graph().value(res_rate).unwrap(),
        reference.graph().value(ref_rate).unwrap()
    );
    assert_eq!(
        resumed.graph().value(res_mu).unwrap(),
        reference.graph().value(ref_mu).unwrap()
    );
    // the trace may differ by accumulated floating error only
    let reference_trace = reference.posterior_trace();
    let resumed_trace = resumed.posterior_trace();
    assert_eq!(reference_trace.len(), resumed_trace.len());
    for (a, b) in reference_trace.iter().zip(resumed_trace) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn payload_survives_a_disk_roundtrip() {
    let (mut chain, _, _) = build_chain(556);
    chain.initialize().unwrap();
    chain.run(25, &mut [], None).unwrap();
    let payload = chain.checkpoint_payload();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state").join("ckpt_00000025.json");
    payload.store(&path).unwrap();
    let loaded = CheckpointPayload::load(&path).unwrap();

    assert_eq!(loaded.generation, payload.generation);
    assert_eq!(loaded.master_seed, payload.master_seed);
    assert_eq!(loaded.values, payload.values);
    assert_eq!(loaded.posterior_trace, payload.posterior_trace);
}

#[test]
fn running_chain_writes_and_prunes_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let plan = CheckpointPlan {
        interval: 10,
        directory: dir.path().to_path_buf(),
        max_to_keep: 2,
        required: false,
    };
    let (mut chain, _, _) = build_chain(557);
    chain.initialize().unwrap();
    let report = chain.run(50, &mut [], Some(&plan)).unwrap();

    // five written, the retention limit keeps the newest two
    assert_eq!(report.checkpoints.len(), 2);
    let names: Vec<String> = report
        .checkpoints
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["ckpt_00000040.json", "ckpt_00000050.json"]);
    for path in &report.checkpoints {
        assert!(path.exists());
    }
    assert!(!dir.path().join("ckpt_00000010.json").exists());
}

#[test]
fn unwritable_checkpoint_directory_only_warns_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("state");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let plan = CheckpointPlan {
        interval: 10,
        directory: blocker.clone(),
        max_to_keep: 0,
        required: false,
    };
    let (mut chain, _, _) = build_chain(558);
    chain.initialize().unwrap();
    let report = chain.run(20, &mut [], Some(&plan)).unwrap();

    assert_eq!(report.generations_completed, 20);
    assert!(report.checkpoints.is_empty());
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings[0].contains("checkpoint skipped at generation 10"));

    let plan = CheckpointPlan { required: true, ..plan };
    let (mut chain, _, _) = build_chain(558);
    chain.initialize().unwrap();
    let err = chain.run(20, &mut [], Some(&plan)).unwrap_err();
    assert_eq!(err.info().code, "checkpoint-mkdir");
}

#[test]
fn missing_checkpoint_file_reports_a_checkpoint_error() {
    let err = CheckpointPayload::load(std::path::Path::new("/nonexistent/ckpt.json")).unwrap_err();
    assert_eq!(err.info().code, "checkpoint-read");
    assert!(!err.is_fatal());
}
