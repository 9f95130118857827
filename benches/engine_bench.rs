//! Benchmark suite for recall-engine
//!
//! Run with: cargo bench

use chrono::{DateTime, Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use recall_engine::{
    EngineConfig, GroupBy, QuestionHistory, QuestionId, QuestionRecord, ReviewEngine,
    SelectionOptions,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap()
}

fn question_set(engine: &ReviewEngine, size: usize) -> Vec<QuestionRecord> {
    (0..size)
        .map(|i| {
            let mut history = QuestionHistory::new();
            // every seventh question stays unpracticed
            if i % 7 != 0 {
                for k in 0..(i % 12) {
                    let at = now() - Duration::days(40) + Duration::days((k * 3 + i % 5) as i64);
                    let score = ((i * 31 + k * 17) % 101) as f64 / 100.0;
                    history = engine
                        .record_attempt(&history, score, at, "")
                        .unwrap();
                }
            }
            QuestionRecord::new(
                QuestionId::new("bench", format!("s{}", i % 6), format!("{}", i % 10), i as u32),
                history,
            )
        })
        .collect()
}

fn bench_compute_mastery(c: &mut Criterion) {
    let engine = ReviewEngine::new(EngineConfig::default()).unwrap();
    let records = question_set(&engine, 64);
    let history = records
        .iter()
        .map(|r| &r.history)
        .max_by_key(|h| h.len())
        .cloned()
        .unwrap_or_default();

    c.bench_function("ReviewEngine::compute_mastery", |b| {
        b.iter(|| engine.compute_mastery(black_box(&history), now()))
    });
}

fn bench_select_practice_set(c: &mut Criterion) {
    let engine = ReviewEngine::new(EngineConfig::default()).unwrap();
    let options = SelectionOptions {
        limit: Some(20),
        ..Default::default()
    };
    let mut group = c.benchmark_group("select_practice_set");
    for size in [100usize, 1_000, 10_000] {
        let records = question_set(&engine, size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &records, |b, records| {
            b.iter(|| engine.select_practice_set(black_box(records), now(), &options))
        });
    }
    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let engine = ReviewEngine::new(EngineConfig::default()).unwrap();
    let records = question_set(&engine, 1_000);
    let estimates = engine.estimates(&records, now()).unwrap();

    c.bench_function("aggregate subject/week 1000", |b| {
        b.iter(|| engine.aggregate(black_box(&estimates), GroupBy::SubjectWeek))
    });
}

criterion_group!(
    benches,
    bench_compute_mastery,
    bench_select_practice_set,
    bench_aggregate
);
criterion_main!(benches);
