//! Heuristic scorer — closed-form signal blend with no training step.
//!
//! Each signal maps one feature to a bounded score (positive = bullish):
//!
//! | signal        | score                                   |
//! |---------------|-----------------------------------------|
//! | momentum 5    | clip(ret_5 · 100, ±2)                   |
//! | momentum 1    | clip(ret_1 · 200, ±2)                   |
//! | MACD          | clip(macd_hist / atr_14, ±2)            |
//! | RSI reversion | −0.5 · rsi_norm if \|rsi_norm\| > 0.4   |
//! | BB reversion  | −0.3 · bb_zscore if \|bb_zscore\| > 1.5 |
//! | taker flow    | clip(net_taker_flow · 4, ±2)            |
//! | volume mom.   | clip(vol_weighted_ret_5 · 50, ±2)       |
//!
//! The summed score is scaled by a volatility-regime multiplier (1.3 when
//! vol_ratio > 1.2, 0.7 when < 0.8), then clip(candle_streak · 0.15, ±1) is
//! added. The total is averaged over the signals present, squashed with a
//! sigmoid and shrunk 40% toward 0.5.

use crate::features::FeatureRow;

use super::{sigmoid, ModelError, ProbabilityEstimator};

/// Fraction of the sigmoid's distance from 0.5 that survives shrinkage.
const SHRINK: f64 = 0.6;

#[derive(Debug, Clone, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// P(up) for one row. Undefined features are skipped; an empty row scores 0.5.
    pub fn score(&self, row: &FeatureRow) -> f64 {
        let mut tally = Tally::default();

        // Momentum
        tally.add(row.get("ret_5").map(|r| (r * 100.0).clamp(-2.0, 2.0)));
        tally.add(row.get("ret_1").map(|r| (r * 200.0).clamp(-2.0, 2.0)));
        let macd = match (row.get("macd_hist"), row.get("atr_14")) {
            (Some(h), Some(atr)) if atr > 0.0 => Some((h / atr).clamp(-2.0, 2.0)),
            _ => None,
        };
        tally.add(macd);

        // Mean reversion
        tally.add(row.get("rsi_norm").map(|r| threshold_reversion(r, 0.4, 0.5)));
        tally.add(row.get("bb_zscore").map(|z| threshold_reversion(z, 1.5, 0.3)));

        // Volume / flow
        tally.add(row.get("net_taker_flow").map(|f| (f * 4.0).clamp(-2.0, 2.0)));
        tally.add(row.get("vol_weighted_ret_5").map(|v| (v * 50.0).clamp(-2.0, 2.0)));

        // Volatility regime
        if let Some(vr) = row.get("vol_ratio") {
            tally.total *= if vr > 1.2 {
                1.3
            } else if vr < 0.8 {
                0.7
            } else {
                1.0
            };
        }

        // Candle structure
        tally.add(row.get("candle_streak").map(|s| (s * 0.15).clamp(-1.0, 1.0)));

        let avg = tally.total / tally.count.max(1) as f64;
        0.5 + (sigmoid(avg) - 0.5) * SHRINK
    }
}

#[derive(Default)]
struct Tally {
    total: f64,
    count: usize,
}

impl Tally {
    fn add(&mut self, score: Option<f64>) {
        if let Some(s) = score {
            self.total += s;
            self.count += 1;
        }
    }
}

/// `-weight * x` when `|x|` exceeds `threshold`, otherwise 0.
fn threshold_reversion(x: f64, threshold: f64, weight: f64) -> f64 {
    if x.abs() > threshold {
        -x * weight
    } else {
        0.0
    }
}

impl ProbabilityEstimator for HeuristicScorer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        Ok(self.score(row))
    }
}
