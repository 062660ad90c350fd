//! Artifact export tests against a temporary directory.

use chrono::{Duration, TimeZone, Utc};
use edgelab_core::domain::Bar;
use edgelab_runner::config::BacktestConfig;
use edgelab_runner::export::{
    export_equity_csv, import_json, load_artifacts, save_artifacts, SCHEMA_VERSION,
};
use edgelab_runner::runner::{run_pipeline, ModelKind, RunOutput};

fn wavy_bars(n: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 2_000.0 + (t * 0.07).sin() * 15.0 + (t * 0.31).cos() * 4.0;
            let open = 2_000.0 + ((t - 1.0) * 0.07).sin() * 15.0 + ((t - 1.0) * 0.31).cos() * 4.0;
            let volume = 50.0 + (i % 11) as f64 * 3.0;
            Bar {
                timestamp: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume,
                taker_buy_volume: volume * if close > open { 0.6 } else { 0.4 },
                num_trades: 300 + (i % 17) as u64,
            }
        })
        .collect()
}

fn heuristic_run() -> RunOutput {
    run_pipeline(
        "ETHUSDT",
        &wavy_bars(1200),
        &BacktestConfig::default(),
        ModelKind::Heuristic,
    )
    .unwrap()
    .unwrap()
}

#[test]
fn save_writes_full_bundle() {
    let out = heuristic_run();
    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&out, dir.path()).unwrap();

    assert!(run_dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("ETHUSDT_heuristic_"));
    for name in ["result.json", "trades.csv", "equity.csv", "predictions.csv", "report.txt"] {
        assert!(run_dir.join(name).exists(), "missing {name}");
    }

    let trades_csv = std::fs::read_to_string(run_dir.join("trades.csv")).unwrap();
    assert_eq!(trades_csv.lines().count(), out.result.trades.len() + 1);
    let preds_csv = std::fs::read_to_string(run_dir.join("predictions.csv")).unwrap();
    assert_eq!(preds_csv.lines().count(), out.predictions.len() + 1);
    let report = std::fs::read_to_string(run_dir.join("report.txt")).unwrap();
    assert!(report.contains("BACKTEST REPORT: ETHUSDT (heuristic model)"));
}

#[test]
fn artifacts_roundtrip_through_json() {
    let out = heuristic_run();
    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&out, dir.path()).unwrap();

    let loaded = load_artifacts(&run_dir).unwrap();
    assert_eq!(loaded.schema_version, SCHEMA_VERSION);
    assert_eq!(loaded.run.kind, ModelKind::Heuristic);
    assert_eq!(loaded.run.result.trades.len(), out.result.trades.len());
    assert_eq!(loaded.run.result.equity_curve.len(), out.result.equity_curve.len());
    assert_eq!(loaded.run.config_hash, out.config_hash);
}

#[test]
fn newer_schema_version_rejected() {
    let out = heuristic_run();
    let dir = tempfile::tempdir().unwrap();
    let run_dir = save_artifacts(&out, dir.path()).unwrap();

    let text = std::fs::read_to_string(run_dir.join("result.json")).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
    value["schema_version"] = serde_json::json!(SCHEMA_VERSION + 1);
    let err = import_json(&value.to_string()).unwrap_err();
    assert!(err.to_string().contains("unsupported schema version"));
}

#[test]
fn equity_csv_aligns_timestamps() {
    let out = heuristic_run();
    let csv = export_equity_csv(&out.result).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "index,timestamp,equity");
    assert!(lines[1].starts_with("0,,1000.0000"));
    assert_eq!(lines.len(), out.result.equity_curve.len() + 1);
    if let Some(first_ts) = out.result.timestamps.first() {
        assert!(lines[2].contains(&first_ts.to_rfc3339()));
    }
}

#[test]
fn load_from_missing_dir_fails() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_artifacts(&dir.path().join("absent")).unwrap_err();
    assert!(err.to_string().contains("failed to read"));
}
