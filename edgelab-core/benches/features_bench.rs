//! Criterion benchmarks for EdgeLab hot paths.
//!
//! Benchmarks:
//! 1. Feature computation over one week of 1-minute bars
//! 2. Logistic fit on a walk-forward sized training window
//! 3. Backtest replay of a prediction stream

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use edgelab_core::domain::{Bar, Prediction};
use edgelab_core::engine::{run_backtest, RunLabel, SimulationConfig};
use edgelab_core::features::{compute_features, FeatureConfig};
use edgelab_core::kelly::KellyParams;
use edgelab_core::models::{LinearModel, LinearModelParams};
use edgelab_core::rng::SeededGaussian;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 40_000.0 + (i as f64 * 0.05).sin() * 200.0 + (i as f64 * 0.011).cos() * 50.0;
            let open = close - 3.0;
            let volume = 10.0 + (i % 17) as f64;
            Bar {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: close + 8.0,
                low: open - 8.0,
                close,
                volume,
                taker_buy_volume: volume * 0.5,
                num_trades: 200 + (i % 31) as u64,
            }
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_features(c: &mut Criterion) {
    let config = FeatureConfig::default();
    let mut group = c.benchmark_group("compute_features");
    for n in [1_440usize, 10_080] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| compute_features(black_box(bars), &config))
        });
    }
    group.finish();
}

fn bench_linear_fit(c: &mut Criterion) {
    let config = FeatureConfig::default();
    let table = compute_features(&make_bars(10_080), &config);
    let names = table.model_feature_names();
    let rows = table.clean_rows(0..table.len(), &names);
    let x: Vec<Vec<f64>> = rows
        .iter()
        .filter_map(|&i| table.feature_vector(i, &names))
        .collect();
    let y: Vec<u8> = rows.iter().filter_map(|&i| table.target(i)).collect();

    c.bench_function("linear_fit_10080", |b| {
        b.iter(|| {
            let mut model = LinearModel::new(LinearModelParams::default());
            let _ = model.fit_dense(black_box(&names), black_box(&x), black_box(&y));
        })
    });
}

fn bench_backtest(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let preds: Vec<Prediction> = (0..50_000)
        .map(|i| Prediction {
            timestamp: start + Duration::minutes(i as i64),
            prob_up: 0.5 + (i as f64 * 0.37).sin() * 0.2,
            target: u8::from(i % 3 != 0),
            forward_return: if i % 3 == 0 { -0.001 } else { 0.001 },
            close: 40_000.0,
        })
        .collect();
    let config = SimulationConfig::default();
    let sizing = KellyParams::default();

    c.bench_function("run_backtest_50000", |b| {
        b.iter(|| {
            run_backtest(
                RunLabel::new("BENCH", "bench"),
                black_box(&preds),
                &config,
                &sizing,
                &mut SeededGaussian::new(config.seed),
            )
        })
    });
}

criterion_group!(benches, bench_features, bench_linear_fit, bench_backtest);
criterion_main!(benches);
