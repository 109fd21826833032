use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use djiki_diff::DiffEngine;

// ============================================================================
// Fixtures
// ============================================================================

fn document(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "Paragraph {} talks about revision {} of the wiki page and its history.\n\n",
                i,
                i * 7
            )
        })
        .collect()
}

/// Every tenth paragraph reworded
fn edited(text: &str) -> String {
    text.split("\n\n")
        .enumerate()
        .map(|(i, para)| {
            if i % 10 == 0 {
                para.replace("talks about", "describes")
            } else {
                para.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ============================================================================
// Benchmarks
// ============================================================================

fn benchmark_compute_diff(c: &mut Criterion) {
    let engine = DiffEngine::new();
    let mut group = c.benchmark_group("compute_diff");

    for size in [10, 100, 1000] {
        let old = document(size);
        let new = edited(&old);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| engine.compute_diff(black_box(&old), black_box(&new)));
        });
    }
    group.finish();
}

fn benchmark_make_patch(c: &mut Criterion) {
    let engine = DiffEngine::new();
    let mut group = c.benchmark_group("make_patch");

    for size in [10, 100, 1000] {
        let old = document(size);
        let new = edited(&old);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| engine.make_patch(black_box(&new), black_box(&old)));
        });
    }
    group.finish();
}

fn benchmark_apply_patch(c: &mut Criterion) {
    let engine = DiffEngine::new();
    let mut group = c.benchmark_group("apply_patch");

    for size in [10, 100, 1000] {
        let old = document(size);
        let new = edited(&old);
        let patch = engine.make_patch(&new, &old);
        // head drifted by an unrelated append at the top
        let head = format!("New intro line.\n\n{}", new);

        group.bench_with_input(BenchmarkId::new("exact", size), &size, |b, _| {
            b.iter(|| engine.apply_patch(black_box(&patch), black_box(&new)));
        });
        group.bench_with_input(BenchmarkId::new("drifted", size), &size, |b, _| {
            b.iter(|| engine.apply_patch(black_box(&patch), black_box(&head)));
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_compute_diff,
    benchmark_make_patch,
    benchmark_apply_patch
);
criterion_main!(benches);
