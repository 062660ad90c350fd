//! NaN-propagating series primitives.
//!
//! Every function takes a slice and returns a `Vec<f64>` of the same length.
//! Positions that cannot be computed (insufficient history, NaN input, zero
//! denominator) are NaN. Output at index `t` depends only on inputs at indices
//! `<= t`.

use crate::domain::Bar;

/// `num / den`, NaN when the denominator is zero or either side is NaN.
pub fn safe_div(num: f64, den: f64) -> f64 {
    if den == 0.0 || den.is_nan() || num.is_nan() {
        f64::NAN
    } else {
        num / den
    }
}

/// Sign of `x` as -1, 0 or 1. NaN stays NaN.
pub fn sign(x: f64) -> f64 {
    if x.is_nan() {
        f64::NAN
    } else if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Simple return over `lag` bars: `v[t] / v[t-lag] - 1`.
pub fn pct_change(values: &[f64], lag: usize) -> Vec<f64> {
    assert!(lag >= 1, "pct_change lag must be >= 1");
    let mut out = vec![f64::NAN; values.len()];
    for t in lag..values.len() {
        out[t] = safe_div(values[t], values[t - lag]) - 1.0;
    }
    out
}

/// Log return over `lag` bars: `ln(v[t] / v[t-lag])`.
pub fn log_return(values: &[f64], lag: usize) -> Vec<f64> {
    assert!(lag >= 1, "log_return lag must be >= 1");
    let mut out = vec![f64::NAN; values.len()];
    for t in lag..values.len() {
        let ratio = safe_div(values[t], values[t - lag]);
        if ratio > 0.0 {
            out[t] = ratio.ln();
        }
    }
    out
}

/// First difference: `v[t] - v[t-1]`, NaN at index 0.
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    for t in 1..values.len() {
        out[t] = values[t] - values[t - 1];
    }
    out
}

/// Exponentially weighted mean without bias adjustment.
///
/// y[first] = x[first] at the first non-NaN input, then
/// y[t] = alpha * x[t] + (1 - alpha) * y[t-1].
/// Values are emitted once `min_periods` observations have been seen.
/// A NaN after the seed taints the rest of the series.
pub fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    assert!(alpha > 0.0 && alpha <= 1.0, "ewm alpha must be in (0, 1]");
    let n = values.len();
    let mut out = vec![f64::NAN; n];

    let Some(seed_idx) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };

    let mut prev = values[seed_idx];
    let mut seen = 1usize;
    if seen >= min_periods {
        out[seed_idx] = prev;
    }
    for t in (seed_idx + 1)..n {
        if values[t].is_nan() {
            return out;
        }
        prev = alpha * values[t] + (1.0 - alpha) * prev;
        seen += 1;
        if seen >= min_periods {
            out[t] = prev;
        }
    }
    out
}

/// EMA with `alpha = 2 / (span + 1)`, seeded with the first value.
pub fn ema_span(values: &[f64], span: usize) -> Vec<f64> {
    assert!(span >= 1, "EMA span must be >= 1");
    ewm(values, 2.0 / (span as f64 + 1.0), 1)
}

/// Apply `f` over each full trailing window of `window` values.
///
/// The window ending at `t` must be entirely non-NaN, otherwise the output is NaN.
pub fn rolling_apply<F>(values: &[f64], window: usize, f: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    assert!(window >= 1, "rolling window must be >= 1");
    let n = values.len();
    let mut out = vec![f64::NAN; n];
    if n < window {
        return out;
    }
    for t in (window - 1)..n {
        let slice = &values[t + 1 - window..=t];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[t] = f(slice);
    }
    out
}

pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().sum())
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

/// Rolling sample standard deviation (ddof = 1). NaN for windows shorter than 2.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, sample_std)
}

/// Least-squares slope of each trailing window against x = 0..window.
pub fn rolling_slope(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, ols_slope)
}

fn sample_std(w: &[f64]) -> f64 {
    let n = w.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = w.iter().sum::<f64>() / n as f64;
    let var = w.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    var.sqrt()
}

fn ols_slope(w: &[f64]) -> f64 {
    let n = w.len() as f64;
    if w.len() < 2 {
        return f64::NAN;
    }
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = w.iter().sum::<f64>() / n;
    let mut num = 0.0;
    let mut den = 0.0;
    for (i, &y) in w.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    num / den
}

/// True Range series.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    tr[0] = bars[0].high - bars[0].low;
    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder RSI over `period` bars.
///
/// Gains and losses are smoothed with `alpha = 1 / period`, seeded from the
/// first bar (whose change counts as zero). RSI is NaN while fewer than
/// `period` observations exist and whenever the average loss is zero.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    assert!(period >= 1, "RSI period must be >= 1");
    let delta = diff(closes);
    // NaN changes (index 0) count as neither gain nor loss.
    let gains: Vec<f64> = delta.iter().map(|&d| if d > 0.0 { d } else { 0.0 }).collect();
    let losses: Vec<f64> = delta.iter().map(|&d| if d < 0.0 { -d } else { 0.0 }).collect();

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm(&gains, alpha, period);
    let avg_loss = ewm(&losses, alpha, period);

    avg_gain
        .iter()
        .zip(&avg_loss)
        .map(|(&g, &l)| {
            let rs = safe_div(g, l);
            100.0 - 100.0 / (1.0 + rs)
        })
        .collect()
}
