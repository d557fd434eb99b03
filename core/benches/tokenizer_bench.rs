use criterion::{criterion_group, criterion_main, Criterion};
use semsearch::tokenizer::normalize;

fn bench_tokenize(c: &mut Criterion) {
    let text = "Guide to late-night dining in NYC: pizza, bagels & ramen! ".repeat(200);
    c.bench_function("normalize_paragraph", |b| b.iter(|| normalize(&text)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
