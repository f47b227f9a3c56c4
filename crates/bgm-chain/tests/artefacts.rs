use bgm_chain::{replicate, Chain, RunConfig, RunManifest, ScheduleKind, StoppingRuleConfig};
use bgm_graph::dist::Normal;
use bgm_graph::{ModelGraph, Value};
use bgm_moves::{Move, OperatorStats, SlideProposal};
use chrono::Utc;

/// mu ~ Normal(0, 1); x ~ Normal(mu, 1) observed at 1.
fn build_chain(seed: u64) -> Chain {
    let mut graph = ModelGraph::new();
    let zero = graph.add_constant("zero", Value::Real(0.0));
    let one = graph.add_constant("one", Value::Real(1.0));
    let mu = graph
        .add_stochastic("mu", Box::new(Normal), &[zero, one], Value::Real(0.0))
        .unwrap();
    let x = graph
        .add_stochastic("x", Box::new(Normal), &[mu, one], Value::Real(0.0))
        .unwrap();
    graph.clamp(x, Value::Real(1.0)).unwrap();
    let mut chain = Chain::new(graph, seed);
    chain
        .add_move(Move::new(Box::new(SlideProposal::new(mu, 1.0)), 1.0))
        .unwrap();
    chain
}

#[test]
fn config_loads_from_a_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("run.yaml");
    std::fs::write(
        &path,
        concat!(
            "generations: 2000\n",
            "burn_in: 200\n",
            "schedule: single\n",
            "seed_policy:\n",
            "  master_seed: 42\n",
            "  label: smoke\n",
            "replication:\n",
            "  runs: 4\n",
            "  combine: sequential\n",
            "checkpoint:\n",
            "  interval: 500\n",
        ),
    )
    .unwrap();

    let config = RunConfig::load(&path).unwrap();
    assert_eq!(config.generations, 2000);
    assert_eq!(config.burn_in, 200);
    assert_eq!(config.schedule, ScheduleKind::Single);
    assert_eq!(config.seed_policy.master_seed, 42);
    assert_eq!(config.seed_policy.label.as_deref(), Some("smoke"));
    assert_eq!(config.replication.runs, 4);
    assert_eq!(config.checkpoint.interval, 500);
    assert!(!config.checkpoint.required);
}

#[test]
fn replicated_runs_write_their_own_traces_and_manifests() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RunConfig::default();
    config.generations = 30;
    config.replication.runs = 3;
    config.output.run_directory = Some(dir.path().to_path_buf());

    let outcome = replicate(&config, |seed| Ok(build_chain(seed))).unwrap();
    assert_eq!(outcome.reports.len(), 3);

    for run_index in 0..3 {
        let run_dir = dir.path().join(format!("run_{run_index}"));
        let trace = std::fs::read_to_string(run_dir.join("trace.csv")).unwrap();
        let mut lines = trace.lines();
        assert_eq!(
            lines.next(),
            Some("generation,posterior,likelihood,prior,mu")
        );
        // one sampled row per generation at the default interval
        assert_eq!(lines.count(), 30);

        let manifest = RunManifest::load(&run_dir.join("manifest.json")).unwrap();
        assert_eq!(manifest.generations_completed, 30);
        assert_eq!(manifest.trace_file.as_deref(), Some("trace.csv".as_ref()));
        assert_eq!(manifest.operator_stats.len(), 1);
    }
    // run seeds differ, so the manifests record different terminal states
    let first = RunManifest::load(&dir.path().join("run_0").join("manifest.json")).unwrap();
    let second = RunManifest::load(&dir.path().join("run_1").join("manifest.json")).unwrap();
    assert_ne!(first.master_seed, second.master_seed);
}

#[test]
fn single_run_artefacts_land_in_the_run_directory_itself() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = RunConfig::default();
    config.generations = 10;
    config.output.run_directory = Some(dir.path().to_path_buf());
    config.output.sample_interval = 5;

    replicate(&config, |seed| Ok(build_chain(seed))).unwrap();

    let trace = std::fs::read_to_string(dir.path().join("trace.csv")).unwrap();
    // sampled at generations 5 and 10
    assert_eq!(trace.lines().count(), 3);
    assert!(dir.path().join("manifest.json").exists());
}

#[test]
fn configured_stopping_rules_end_each_run() {
    let mut config = RunConfig::default();
    config.generations = 100;
    config.stopping = vec![StoppingRuleConfig::MaxGenerations { limit: 10 }];

    let outcome = replicate(&config, |seed| Ok(build_chain(seed))).unwrap();
    assert_eq!(outcome.reports[0].generations_completed, 10);
    assert_eq!(
        outcome.reports[0].stopped_by.as_deref(),
        Some("max-generations")
    );
    assert_eq!(outcome.traces[0].len(), 10);
}

#[test]
fn manifest_roundtrips_through_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("manifest.json");

    let manifest = RunManifest {
        created_at: Utc::now(),
        config: RunConfig::default(),
        master_seed: 77,
        seed_label: Some("smoke".into()),
        generations_completed: 1000,
        final_posterior: -12.5,
        operator_stats: vec![OperatorStats {
            name: "slide".into(),
            weight: 1.0,
            tried: 1000,
            accepted: 440,
            parameters: "delta=1.000000".into(),
        }],
        trace_file: Some("trace.csv".into()),
        checkpoints: vec!["checkpoints/ckpt_00001000.json".into()],
    };
    manifest.write(&path).unwrap();

    let loaded = RunManifest::load(&path).unwrap();
    assert_eq!(loaded.master_seed, 77);
    assert_eq!(loaded.generations_completed, 1000);
    assert_eq!(loaded.operator_stats.len(), 1);
    assert!((loaded.operator_stats[0].acceptance_rate() - 0.44).abs() < 1e-12);
    assert_eq!(loaded.trace_file, manifest.trace_file);
}
