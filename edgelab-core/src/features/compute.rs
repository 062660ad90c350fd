//! Feature computation over a bar series.

use crate::domain::Bar;

use super::series::{
    diff, ema_span, log_return, pct_change, rolling_mean, rolling_slope, rolling_std,
    rolling_sum, safe_div, sign, true_range, wilder_rsi,
};
use super::{FeatureConfig, FeatureTable};

/// Garman-Klass open/close weight: 2 ln 2 - 1.
const GK_CO_WEIGHT: f64 = 2.0 * std::f64::consts::LN_2 - 1.0;

/// Raw OHLCV columns extracted once from the bar slice.
struct Columns {
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    taker_buy: Vec<f64>,
    trades: Vec<f64>,
}

impl Columns {
    fn from_bars(bars: &[Bar]) -> Self {
        Self {
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: bars.iter().map(|b| b.close).collect(),
            volume: bars.iter().map(|b| b.volume).collect(),
            taker_buy: bars.iter().map(|b| b.taker_buy_volume).collect(),
            trades: bars.iter().map(|b| b.num_trades as f64).collect(),
        }
    }
}

/// Compute every feature column and the forward target for `bars`.
///
/// Short series never fail: columns whose window cannot be filled are
/// undefined for the affected rows.
pub fn compute_features(bars: &[Bar], config: &FeatureConfig) -> FeatureTable {
    let cols = Columns::from_bars(bars);
    let mut table = FeatureTable::new(
        bars.iter().map(|b| b.timestamp).collect(),
        cols.close.clone(),
    );

    momentum(&mut table, &cols, config);
    mean_reversion(&mut table, &cols, config);
    volatility(&mut table, bars, &cols, config);
    volume_flow(&mut table, &cols, config);
    microstructure(&mut table, &cols, config);

    table.set_forward_returns(forward_returns(&cols.close, config.horizon));
    table
}

fn zip_map(a: &[f64], b: &[f64], f: impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b).map(|(&x, &y)| f(x, y)).collect()
}

// ── Momentum ──

fn momentum(table: &mut FeatureTable, cols: &Columns, config: &FeatureConfig) {
    for &w in &config.momentum_windows {
        table.push_column(format!("ret_{w}"), pct_change(&cols.close, w));
        table.push_column(format!("logret_{w}"), log_return(&cols.close, w));
    }

    table.push_column("ret_accel", diff(&pct_change(&cols.close, 1)));

    let ema_fast = ema_span(&cols.close, config.macd_fast);
    let ema_slow = ema_span(&cols.close, config.macd_slow);
    let macd = zip_map(&ema_fast, &ema_slow, |f, s| f - s);
    let signal = ema_span(&macd, config.macd_signal);
    let hist = zip_map(&macd, &signal, |m, s| m - s);
    let hist_accel = diff(&hist);

    table.push_column("macd", macd);
    table.push_column("macd_signal", signal);
    table.push_column("macd_hist", hist);
    table.push_column("macd_hist_accel", hist_accel);
}

// ── Mean reversion ──

fn mean_reversion(table: &mut FeatureTable, cols: &Columns, config: &FeatureConfig) {
    let rsi = wilder_rsi(&cols.close, config.rsi_period);
    let rsi_norm = rsi.iter().map(|r| (r - 50.0) / 50.0).collect();
    table.push_column("rsi", rsi);
    table.push_column("rsi_norm", rsi_norm);

    let k = config.bb_std;
    let ma = rolling_mean(&cols.close, config.bb_period);
    let sd = rolling_std(&cols.close, config.bb_period);
    let mut zscore = Vec::with_capacity(cols.close.len());
    let mut pctb = Vec::with_capacity(cols.close.len());
    for ((&c, &m), &s) in cols.close.iter().zip(&ma).zip(&sd) {
        zscore.push(safe_div(c - m, s));
        pctb.push(safe_div(c - (m - k * s), 2.0 * k * s));
    }
    table.push_column("bb_zscore", zscore);
    table.push_column("bb_pctb", pctb);

    let tp_vol: Vec<f64> = (0..cols.close.len())
        .map(|i| (cols.high[i] + cols.low[i] + cols.close[i]) / 3.0 * cols.volume[i])
        .collect();
    let vwap = zip_map(
        &rolling_sum(&tp_vol, config.vwap_period),
        &rolling_sum(&cols.volume, config.vwap_period),
        safe_div,
    );
    table.push_column(
        "vwap_dev",
        zip_map(&cols.close, &vwap, |c, v| safe_div(c - v, v)),
    );
}

// ── Volatility ──

fn volatility(table: &mut FeatureTable, bars: &[Bar], cols: &Columns, config: &FeatureConfig) {
    let ann = config.annualization();
    let log_ret = log_return(&cols.close, 1);
    let gk: Vec<f64> = (0..cols.close.len())
        .map(|i| {
            let hl = (cols.high[i] / cols.low[i]).ln();
            let co = (cols.close[i] / cols.open[i]).ln();
            0.5 * hl * hl - GK_CO_WEIGHT * co * co
        })
        .collect();

    let mut rvols = Vec::with_capacity(config.vol_windows.len());
    for &w in &config.vol_windows {
        let rvol: Vec<f64> = rolling_std(&log_ret, w).iter().map(|s| s * ann).collect();
        // Pre-sqrt term floored at 0: the estimator can go negative on tiny ranges.
        let gk_vol: Vec<f64> = rolling_mean(&gk, w)
            .iter()
            .map(|&m| if m.is_nan() { m } else { m.max(0.0).sqrt() * ann })
            .collect();
        table.push_column(format!("rvol_{w}"), rvol.clone());
        table.push_column(format!("gk_vol_{w}"), gk_vol);
        rvols.push(rvol);
    }

    if rvols.len() >= 2 {
        let ratio = zip_map(&rvols[0], &rvols[rvols.len() - 1], safe_div);
        table.push_column("vol_ratio", ratio);
    }

    let atr = rolling_mean(&true_range(bars), config.atr_period);
    let atr_pct = zip_map(&atr, &cols.close, safe_div);
    table.push_column(format!("atr_{}", config.atr_period), atr);
    table.push_column("atr_pct", atr_pct);
}

// ── Volume / order flow ──

fn volume_flow(table: &mut FeatureTable, cols: &Columns, config: &FeatureConfig) {
    let vol_ma = rolling_mean(&cols.volume, config.volume_ma_period);
    let vol_ratio_ma = zip_map(&cols.volume, &vol_ma, safe_div);
    let taker_ratio = zip_map(&cols.taker_buy, &cols.volume, safe_div);
    let net_flow: Vec<f64> = taker_ratio.iter().map(|r| r - 0.5).collect();
    let vw_ret = zip_map(
        &pct_change(&cols.close, config.vw_momentum_window),
        &vol_ratio_ma,
        |r, v| r * v,
    );

    table.push_column("vol_ratio_ma", vol_ratio_ma);
    table.push_column("taker_buy_ratio", taker_ratio);
    table.push_column("net_taker_flow", net_flow);
    table.push_column(format!("vol_weighted_ret_{}", config.vw_momentum_window), vw_ret);

    table.push_column(
        format!("obv_slope_{}", config.obv_slope_window),
        rolling_slope(&on_balance_volume(&cols.close, &cols.volume), config.obv_slope_window),
    );
}

/// Cumulative signed volume. Undefined at index 0 (no prior close).
fn on_balance_volume(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let mut obv = vec![f64::NAN; close.len()];
    let mut running = 0.0;
    for i in 1..close.len() {
        let step = sign(close[i] - close[i - 1]) * volume[i];
        if step.is_nan() {
            continue;
        }
        running += step;
        obv[i] = running;
    }
    obv
}

// ── Microstructure ──

fn microstructure(table: &mut FeatureTable, cols: &Columns, config: &FeatureConfig) {
    let n = cols.close.len();
    let mut body = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    let mut lower = Vec::with_capacity(n);
    let mut dir = Vec::with_capacity(n);
    for i in 0..n {
        let (o, h, l, c) = (cols.open[i], cols.high[i], cols.low[i], cols.close[i]);
        let range = h - l;
        body.push(safe_div((c - o).abs(), range));
        upper.push(safe_div(h - c.max(o), range));
        lower.push(safe_div(c.min(o) - l, range));
        dir.push(sign(c - o));
    }

    let streak = candle_streak(&dir);
    let trades_ratio = zip_map(
        &cols.trades,
        &rolling_mean(&cols.trades, config.volume_ma_period),
        safe_div,
    );

    table.push_column("body_ratio", body);
    table.push_column("candle_dir", dir);
    table.push_column("upper_wick", upper);
    table.push_column("lower_wick", lower);
    table.push_column("candle_streak", streak);
    table.push_column("trades_ratio", trades_ratio);
}

/// Signed run length of same-direction candles.
///
/// streak[0] = 0. A flat candle or a direction change restarts the count at
/// the current direction (0 for flat).
fn candle_streak(dir: &[f64]) -> Vec<f64> {
    let mut streak = vec![0.0; dir.len()];
    for i in 1..dir.len() {
        streak[i] = if dir[i] == dir[i - 1] && dir[i] != 0.0 {
            streak[i - 1] + dir[i]
        } else {
            dir[i]
        };
    }
    streak
}

// ── Target ──

/// `close[t + horizon] / close[t] - 1`, NaN for the last `horizon` rows.
fn forward_returns(close: &[f64], horizon: usize) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![f64::NAN; n];
    for t in 0..n.saturating_sub(horizon) {
        out[t] = safe_div(close[t + horizon], close[t]) - 1.0;
    }
    out
}
