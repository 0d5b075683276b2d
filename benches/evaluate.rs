//! Performance benchmarks for aigov-decision
//!
//! Run with: cargo bench

use aigov_decision::{DecisionEngine, DecisionRequest, PatternDetector, PolicyConfig, SnapshotStore};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const PROMPT: &str = "Summarize the attached ticket. Customer jane@acme-corp.com called from \
415-867-5309 about card 4532015112830366; the server at 10.20.30.40 logged the error.";

fn bench_detector(c: &mut Criterion) {
    let detector = PatternDetector::with_defaults().unwrap();

    c.bench_function("detect short prompt", |b| {
        b.iter(|| detector.detect(black_box(PROMPT)));
    });

    let large = PROMPT.repeat(500);
    c.bench_function("detect 90KB paste", |b| {
        b.iter(|| detector.detect(black_box(&large)));
    });

    c.bench_function("redact short prompt", |b| {
        b.iter(|| detector.redact(black_box(PROMPT)));
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let store = SnapshotStore::new(PolicyConfig::default()).unwrap();
    let engine = DecisionEngine::new();

    let url_only = DecisionRequest::for_url("user@corp.io", "https://chatgpt.com/c/123");
    c.bench_function("evaluate url only", |b| {
        b.iter(|| {
            let snapshot = store.current().unwrap();
            engine.evaluate(black_box(&url_only), &snapshot)
        });
    });

    let with_content = url_only.clone().with_content(PROMPT);
    c.bench_function("evaluate with content", |b| {
        b.iter(|| {
            let snapshot = store.current().unwrap();
            engine.evaluate(black_box(&with_content), &snapshot)
        });
    });
}

fn bench_snapshot_publish(c: &mut Criterion) {
    let store = SnapshotStore::new(PolicyConfig::default()).unwrap();
    c.bench_function("publish default policy", |b| {
        b.iter(|| store.publish(PolicyConfig::default()).unwrap());
    });
}

criterion_group!(benches, bench_detector, bench_evaluate, bench_snapshot_publish);
criterion_main!(benches);
