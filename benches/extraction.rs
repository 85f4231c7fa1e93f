//! Benchmarks for window selection, extraction and policy.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use ndefence::extractor::RedirectExtractor;
use ndefence::log_window::LogWindow;
use ndefence::policy::BlockPolicy;
use ndefence::validation::sort_addresses;
use ndefence::whois::CountryMap;

/// Two days of combined-log lines; every 10th line is a redirect.
fn generate_log(count: usize) -> Vec<String> {
    let mut lines: Vec<String> = (0..count)
        .map(|i| {
            let day = if i < count / 2 { 17 } else { 18 };
            let ip = format!("{}.{}.{}.{}", 1 + i % 223, (i / 7) % 256, (i / 13) % 256, i % 256);
            let (status, referrer) = if i % 10 == 0 { (302, "/login") } else { (200, "-") };
            format!(
                r#"{} - - [{}/Oct/2026:09:15:22 +0000] "GET / HTTP/1.1" {} 154 "{}" "Mozilla/5.0""#,
                ip, day, status, referrer
            )
        })
        .collect();
    lines.push(String::new());
    lines
}

fn bench_extract(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract");
    let extractor = RedirectExtractor::new().unwrap();

    for size in [1_000, 10_000, 100_000] {
        let lines = generate_log(size);
        group.bench_with_input(BenchmarkId::new("window_and_extract", size), &lines, |b, lines| {
            b.iter(|| {
                let window = LogWindow::select(lines).unwrap();
                black_box(extractor.extract(&window))
            });
        });
    }

    group.finish();
}

fn bench_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("policy");
    let extractor = RedirectExtractor::new().unwrap();

    for size in [1_000, 10_000] {
        let lines = generate_log(size);
        let window = LogWindow::select(&lines).unwrap();
        let extraction = extractor.extract(&window);

        let mut countries = CountryMap::new();
        for (i, ip) in extraction.counter.addresses().enumerate() {
            countries.insert(ip, if i % 3 == 0 { "RU" } else { "US" });
        }

        group.bench_with_input(BenchmarkId::new("decide", size), &size, |b, _| {
            b.iter(|| {
                black_box(BlockPolicy::default().decide(
                    &extraction.counter,
                    &countries,
                    &extraction.candidates,
                ))
            });
        });

        group.bench_with_input(BenchmarkId::new("sort_addresses", size), &size, |b, _| {
            b.iter(|| black_box(sort_addresses(extraction.counter.addresses())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_extract, bench_policy);
criterion_main!(benches);
