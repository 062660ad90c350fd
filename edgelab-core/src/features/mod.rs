//! Feature engine: OHLCV bars → named feature columns plus a binary target.
//!
//! Feature groups:
//! - Momentum: simple/log returns, return acceleration, MACD line/signal/histogram
//! - Mean reversion: Wilder RSI, Bollinger z-score and %B, rolling VWAP deviation
//! - Volatility: realized and Garman-Klass volatility per window, vol ratio, ATR
//! - Volume/flow: relative volume, taker-buy imbalance, volume-weighted momentum, OBV slope
//! - Microstructure: body/wick ratios, candle direction, streak, relative trade count
//!
//! Every feature at row `t` is computed from bars `0..=t` only. The target at
//! row `t` looks `horizon` bars ahead and is undefined for the final `horizon` rows.

pub mod compute;
pub mod series;
pub mod table;

pub use compute::compute_features;
pub use table::{FeatureRow, FeatureTable};

use serde::{Deserialize, Serialize};

/// The heuristic stream never starts scoring before this row.
pub const MIN_WARMUP_BARS: usize = 60;

/// Minutes in a 365-day year, used to annualize per-bar volatility.
pub const MINUTES_PER_YEAR: f64 = 525_600.0;

/// Window lengths and spans for every feature group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Lookbacks for `ret_{w}` and `logret_{w}`.
    pub momentum_windows: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub rsi_period: usize,
    pub bb_period: usize,
    /// Band width in standard deviations.
    pub bb_std: f64,
    pub vwap_period: usize,
    /// Windows for `rvol_{w}` and `gk_vol_{w}`. `vol_ratio` divides the first by the last.
    pub vol_windows: Vec<usize>,
    pub atr_period: usize,
    /// Moving-average length for relative volume and relative trade count.
    pub volume_ma_period: usize,
    pub obv_slope_window: usize,
    /// Return lookback for `vol_weighted_ret_{w}`.
    pub vw_momentum_window: usize,
    /// Bars ahead for the forward return and target.
    pub horizon: usize,
    /// Bar length in minutes, used for volatility annualization.
    pub bar_interval_minutes: f64,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            momentum_windows: vec![1, 2, 3, 5, 10, 15, 20],
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            rsi_period: 14,
            bb_period: 20,
            bb_std: 2.0,
            vwap_period: 60,
            vol_windows: vec![5, 15, 30, 60],
            atr_period: 14,
            volume_ma_period: 20,
            obv_slope_window: 10,
            vw_momentum_window: 5,
            horizon: 5,
            bar_interval_minutes: 1.0,
        }
    }
}

impl FeatureConfig {
    /// First row index at which every feature column can be defined.
    ///
    /// Columns built on one-bar returns (`ret_w`, `rvol_w`, `obv_slope_w`)
    /// start a bar later than columns built on raw bars.
    pub fn first_complete_row(&self) -> usize {
        let rows = [
            self.momentum_windows.iter().copied().max().unwrap_or(0),
            // ret_accel
            2,
            self.rsi_period.saturating_sub(1),
            self.bb_period.saturating_sub(1),
            self.vwap_period.saturating_sub(1),
            self.vol_windows.iter().copied().max().unwrap_or(0),
            self.atr_period.saturating_sub(1),
            self.volume_ma_period.saturating_sub(1),
            self.obv_slope_window,
            self.vw_momentum_window,
        ];
        rows.into_iter().max().unwrap_or(0)
    }

    /// Bars needed before every feature is defined.
    pub fn max_lookback(&self) -> usize {
        self.first_complete_row() + 1
    }

    /// Row index where the heuristic starts scoring.
    pub fn warmup(&self) -> usize {
        self.first_complete_row().max(MIN_WARMUP_BARS)
    }

    /// `sqrt(periods per year)` for one bar.
    pub fn annualization(&self) -> f64 {
        (MINUTES_PER_YEAR / self.bar_interval_minutes).sqrt()
    }
}

/// Create synthetic one-minute bars from close prices for testing.
///
/// open = prev_close (or close for the first bar), high = max(open,close) + 0.5,
/// low = min(open,close) - 0.5. Volume, taker-buy volume and trade count cycle
/// through small deterministic patterns so flow features are non-degenerate.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    use chrono::TimeZone;
    let start = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let volume = 1000.0 + (i % 7) as f64 * 50.0;
            Bar {
                timestamp: start + chrono::Duration::minutes(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume,
                taker_buy_volume: volume * (0.4 + (i % 5) as f64 * 0.05),
                num_trades: 100 + (i % 13) as u64,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for feature tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
