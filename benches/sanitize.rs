//! Benchmarks for diagram text sanitizing.

use codeatlas::sanitize::sanitize;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn bench_sanitize_fenced(c: &mut Criterion) {
    let raw = "Sure! Here is the architecture of the service:\n\n```mermaid\ngraph TD\n    Api-->Auth\n    Api-->Orders\n    Orders-->Db\n```\n\nLet me know if you want more detail.";
    c.bench_function("sanitize_fenced", |b| b.iter(|| sanitize(black_box(raw))));
}

fn bench_sanitize_large(c: &mut Criterion) {
    let mut raw = String::from("Preamble describing the system.\n```mermaid\nflowchart LR\n");
    for i in 0..2_000 {
        raw.push_str(&format!("    node{i}-->node{}\n", i + 1));
    }
    raw.push_str("```\n");
    c.bench_function("sanitize_large", |b| b.iter(|| sanitize(black_box(&raw))));
}

fn bench_sanitize_no_keyword(c: &mut Criterion) {
    let raw = "The model answered with prose only and no diagram at all.".repeat(50);
    c.bench_function("sanitize_no_keyword", |b| {
        b.iter(|| sanitize(black_box(&raw)))
    });
}

criterion_group!(
    benches,
    bench_sanitize_fenced,
    bench_sanitize_large,
    bench_sanitize_no_keyword
);
criterion_main!(benches);
