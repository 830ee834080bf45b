//! Criterion benchmarks for stockpeak hot paths.
//!
//! Benchmarks:
//! 1. Row parsing (batch, collected)
//! 2. Peak aggregation over pre-parsed records
//! 3. Streaming parse + aggregate in one pass

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stockpeak_core::{find_peak, parse_rows, peak_of_rows};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_rows(n: usize) -> Vec<Vec<String>> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let date = base_date + chrono::Duration::days(i as i64);
            vec![
                date.format("%Y/%m/%d").to_string(),
                format!("{close:.2}"),
                format!("{}", 1_000_000 + i % 500_000),
                format!("{:.2}", close - 0.3),
                format!("{:.2}", close + 1.5),
                format!("{:.2}", close - 1.5),
            ]
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_rows");
    for n in [1_000, 10_000, 100_000] {
        let rows = make_rows(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| parse_rows(black_box(rows)).unwrap())
        });
    }
    group.finish();
}

fn bench_find_peak(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_peak");
    for n in [1_000, 10_000, 100_000] {
        let records = parse_rows(make_rows(n)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &records, |b, records| {
            b.iter(|| find_peak(black_box(records)).unwrap())
        });
    }
    group.finish();
}

fn bench_streaming(c: &mut Criterion) {
    let rows = make_rows(100_000);
    c.bench_function("peak_of_rows_100k", |b| {
        b.iter(|| peak_of_rows(black_box(&rows)).unwrap())
    });
}

criterion_group!(benches, bench_parse, bench_find_peak, bench_streaming);
criterion_main!(benches);
