use bgm_chain::Chain;
use bgm_graph::dist::Normal;
use bgm_graph::func::Sum;
use bgm_graph::{ModelGraph, Value};
use bgm_moves::{Move, SlideProposal};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

/// A layered model: `width` latent means feeding a deterministic sum with an
/// observed child, one slide move per latent node.
fn build_chain(width: usize) -> Chain {
    let mut graph = ModelGraph::new();
    let zero = graph.add_constant("zero", Value::Real(0.0));
    let one = graph.add_constant("one", Value::Real(1.0));
    let mut latents = Vec::with_capacity(width);
    for index in 0..width {
        let node = graph
            .add_stochastic(
                format!("mu{index}"),
                Box::new(Normal),
                &[zero, one],
                Value::Real(0.0),
            )
            .unwrap();
        latents.push(node);
    }
    let total = graph
        .add_deterministic("total", Box::new(Sum), &latents)
        .unwrap();
    let x = graph
        .add_stochastic("x", Box::new(Normal), &[total, one], Value::Real(0.0))
        .unwrap();
    graph.clamp(x, Value::Real(1.0)).unwrap();

    let mut chain = Chain::new(graph, 12345);
    for node in latents {
        chain
            .add_move(Move::new(Box::new(SlideProposal::new(node, 1.0)), 1.0))
            .unwrap();
    }
    chain.initialize().unwrap();
    chain
}

fn generation_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation_throughput");
    for width in [4usize, 16, 64] {
        group.bench_function(format!("width_{width}"), |b| {
            b.iter_batched(
                || build_chain(width),
                |mut chain| {
                    chain.run(100, &mut [], None).unwrap();
                    chain
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, generation_throughput);
criterion_main!(benches);
