//! Artifact export — CSV ledgers and versioned JSON.
//!
//! Every persisted JSON document carries a `schema_version`. Unknown
//! (newer) versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use edgelab_core::domain::{Prediction, Trade};
use edgelab_core::engine::BacktestResult;

use crate::report::generate_report;
use crate::runner::RunOutput;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// JSON envelope around a run output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunArtifact {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run: RunOutput,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(output: &RunOutput) -> Result<String> {
    let artifact = RunArtifact {
        schema_version: SCHEMA_VERSION,
        run: output.clone(),
    };
    serde_json::to_string_pretty(&artifact).context("failed to serialize run output to JSON")
}

/// Deserialize a run artifact, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunArtifact> {
    let artifact: RunArtifact =
        serde_json::from_str(json).context("failed to deserialize run artifact from JSON")?;
    if artifact.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            artifact.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(artifact)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade ledger, one row per settled bet.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "direction",
        "our_prob",
        "market_price",
        "edge",
        "bet_size",
        "shares",
        "outcome",
        "pnl",
        "bankroll_after",
    ])?;
    for t in trades {
        wtr.write_record([
            &t.timestamp.to_rfc3339(),
            &t.direction.to_string(),
            &format!("{:.6}", t.our_prob),
            &format!("{:.6}", t.market_price),
            &format!("{:.6}", t.edge),
            &format!("{:.4}", t.bet_size),
            &format!("{:.6}", t.shares),
            &t.outcome.to_string(),
            &format!("{:.4}", t.pnl),
            &format!("{:.4}", t.bankroll_after),
        ])?;
    }
    finish(wtr)
}

/// Equity curve. The first row is the starting bankroll and has no timestamp.
pub fn export_equity_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "timestamp", "equity"])?;
    for (i, eq) in result.equity_curve.iter().enumerate() {
        let ts = i
            .checked_sub(1)
            .and_then(|k| result.timestamps.get(k))
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        wtr.write_record([&i.to_string(), &ts, &format!("{:.4}", eq)])?;
    }
    finish(wtr)
}

pub fn export_predictions_csv(predictions: &[Prediction]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "prob_up", "target", "forward_return", "close"])?;
    for p in predictions {
        wtr.write_record([
            &p.timestamp.to_rfc3339(),
            &format!("{:.6}", p.prob_up),
            &p.target.to_string(),
            &format!("{:.8}", p.forward_return),
            &format!("{:.6}", p.close),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one run.
///
/// Creates `{symbol}_{model}_{hash8}/` under `output_dir` containing:
/// - `result.json` — versioned run output
/// - `trades.csv` — trade ledger
/// - `equity.csv` — equity curve
/// - `predictions.csv` — prediction stream
/// - `report.txt` — text report
///
/// Returns the path to the created directory.
pub fn save_artifacts(output: &RunOutput, output_dir: &Path) -> Result<PathBuf> {
    let label = &output.result.label;
    let hash8: String = output.config_hash.chars().take(8).collect();
    let run_dir = output_dir.join(format!("{}_{}_{}", label.symbol, label.model, hash8));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir, "result.json", &export_json(output)?)?;
    write(&run_dir, "trades.csv", &export_trades_csv(&output.result.trades)?)?;
    write(&run_dir, "equity.csv", &export_equity_csv(&output.result)?)?;
    write(
        &run_dir,
        "predictions.csv",
        &export_predictions_csv(&output.predictions)?,
    )?;
    write(
        &run_dir,
        "report.txt",
        &generate_report(&output.result, &output.predictions),
    )?;

    Ok(run_dir)
}

/// Load a run from an artifact directory's `result.json`.
pub fn load_artifacts(dir: &Path) -> Result<RunArtifact> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<()> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use edgelab_core::domain::Direction;

    #[test]
    fn trades_csv_has_header_and_rows() {
        let t = Trade::settle(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap(),
            Direction::Down,
            0.7,
            0.5,
            50.0,
            true,
            1000.0,
        );
        let csv = export_trades_csv(&[t]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("timestamp,direction,"));
        assert!(lines[1].contains(",DOWN,"));
        assert!(lines[1].ends_with("1050.0000"));
    }

    #[test]
    fn empty_predictions_csv_is_header_only() {
        let csv = export_predictions_csv(&[]).unwrap();
        assert_eq!(csv.trim(), "timestamp,prob_up,target,forward_return,close");
    }
}
