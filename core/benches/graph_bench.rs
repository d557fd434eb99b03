use criterion::{black_box, criterion_group, criterion_main, Criterion};
use semsearch::{build_graph, Embeddings, GraphConfig};

fn synthetic_embeddings(words: usize, dim: usize) -> Embeddings {
    (0..words)
        .map(|w| {
            let vector = (0..dim).map(|d| (((w * 31 + d * 17) % 97) as f32 / 97.0) - 0.5).collect();
            (format!("w{w}"), vector)
        })
        .collect()
}

fn bench_build_graph(c: &mut Criterion) {
    let embeddings = synthetic_embeddings(500, 50);
    let config = GraphConfig::default();
    c.bench_function("build_graph_500x50", |b| b.iter(|| build_graph(black_box(&embeddings), &config)));
}

criterion_group!(benches, bench_build_graph);
criterion_main!(benches);
