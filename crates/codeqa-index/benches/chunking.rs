use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use codeqa_index::IdScheme;
use codeqa_index::chunker::chunk_text;

fn generate_source(size: usize) -> String {
    let line = "    public int Add(int a, int b) { return a + b; } // arithmetic helper\n";
    line.repeat(size / line.len() + 1)[..size].to_string()
}

fn chunking(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunk_text");

    for size in [1_000, 10_000, 100_000] {
        let input = generate_source(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("ascii", size), &input, |b, input| {
            b.iter(|| chunk_text(black_box(input), 500));
        });
    }

    let pattern = "// Привет мир! 你好世界! こんにちは世界!\n";
    let input = pattern.repeat(2_000);
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_with_input(
        BenchmarkId::new("unicode", input.len()),
        &input,
        |b, input| {
            b.iter(|| chunk_text(black_box(input), 500));
        },
    );

    group.finish();
}

fn chunk_ids(c: &mut Criterion) {
    let input = generate_source(100_000);
    let chunks = chunk_text(&input, 500);

    let mut group = c.benchmark_group("chunk_ids");
    for scheme in [IdScheme::Content, IdScheme::Legacy] {
        group.bench_function(format!("{scheme:?}"), |b| {
            b.iter(|| {
                chunks
                    .iter()
                    .enumerate()
                    .map(|(i, chunk)| scheme.chunk_id("src/Calculator.cs", i, black_box(chunk)))
                    .collect::<Vec<_>>()
            });
        });
    }
    group.finish();
}

criterion_group!(benches, chunking, chunk_ids);
criterion_main!(benches);
