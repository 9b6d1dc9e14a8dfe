//! Benchmark the pairwise grouping pass for both similarity backends.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use examlens_cluster::{cluster_scope, group_components, normalize_text, SimilarityBackend};
use examlens_core::{ExamLensConfig, QuestionView};
use uuid::Uuid;

const TOPICS: &[&str] = &[
    "define entropy",
    "explain the carnot cycle",
    "state the second law of thermodynamics",
    "describe the working of a heat pump",
    "what is enthalpy",
    "derive the clausius inequality",
];

fn questions(n: usize) -> Vec<QuestionView> {
    (0..n)
        .map(|i| {
            let text = format!("Q{}. {} in detail (5 marks)", i + 1, TOPICS[i % TOPICS.len()]);
            QuestionView::new(Uuid::from_u128(i as u128 + 1), text)
                .with_year(format!("{}", 2015 + i % 8))
        })
        .collect()
}

fn embeddings(n: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..n)
        .map(|i| (0..dim).map(|d| (((i % TOPICS.len()) * 31 + d) % 17) as f32).collect())
        .collect()
}

fn bench_keyword_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyword_grouping");
    for n in [50usize, 200, 500] {
        let qs = questions(n);
        let normalized: Vec<String> = qs.iter().map(|q| normalize_text(&q.raw_text)).collect();
        let backend = SimilarityBackend::keyword(&normalized);
        let mask = vec![true; n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| group_components(black_box(&backend), 0.70, &mask));
        });
    }
    group.finish();
}

fn bench_embedding_grouping(c: &mut Criterion) {
    let mut group = c.benchmark_group("embedding_grouping");
    for n in [50usize, 200, 500] {
        let vectors = embeddings(n, 384);
        let backend = SimilarityBackend::embedding(vectors.iter().map(Vec::as_slice).collect());
        let mask = vec![true; n];
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| group_components(black_box(&backend), 0.75, &mask));
        });
    }
    group.finish();
}

fn bench_full_scope(c: &mut Criterion) {
    let config = ExamLensConfig::default();
    let qs = questions(300);
    c.bench_function("cluster_scope_300", |b| {
        b.iter(|| cluster_scope(Uuid::nil(), None, black_box(&qs), &config));
    });
}

criterion_group!(
    benches,
    bench_keyword_grouping,
    bench_embedding_grouping,
    bench_full_scope
);
criterion_main!(benches);
