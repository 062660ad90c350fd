//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function: trade ledger, equity curve or prediction
//! stream in, scalar out. Empty inputs return 0.0 sentinels.

use serde::{Deserialize, Serialize};

use edgelab_core::domain::{Direction, Prediction, Trade};
use edgelab_core::engine::{BacktestResult, SideStats};

/// Stake floor used when turning PnL into a return on stake.
const MIN_STAKE: f64 = 0.01;

/// Lower bound on gross loss in the profit factor denominator.
const MIN_GROSS_LOSS: f64 = 0.01;

/// Brier score of always predicting 0.5.
const COIN_FLIP_BRIER: f64 = 0.25;

/// Trades needed before the quartile edge analysis is meaningful.
pub const MIN_TRADES_FOR_EDGE_ANALYSIS: usize = 20;

/// Late-quartile win-rate drop (fraction) that counts as edge decay.
pub const EDGE_DECAY_THRESHOLD: f64 = 0.05;

/// Upper edges of the calibration buckets. The first bucket starts at 0.
pub const CALIBRATION_EDGES: [f64; 8] = [0.3, 0.4, 0.45, 0.5, 0.55, 0.6, 0.7, 1.0];

/// Aggregate performance metrics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub skipped: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub return_pct: f64,
    pub final_bankroll: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_edge: f64,
    pub profit_factor: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub up: SideStats,
    pub down: SideStats,
    pub pnl_percentiles: PnlPercentiles,
}

impl PerformanceMetrics {
    pub fn compute(result: &BacktestResult) -> Self {
        Self {
            total_trades: result.total_trades(),
            winning_trades: result.winning_trades(),
            skipped: result.skipped,
            win_rate: win_rate(&result.trades),
            total_pnl: result.total_pnl(),
            return_pct: result.return_pct(),
            final_bankroll: result.final_bankroll(),
            avg_win: result.avg_win(),
            avg_loss: result.avg_loss(),
            avg_edge: result.avg_edge(),
            profit_factor: profit_factor(&result.trades),
            sharpe: sharpe_ratio(&result.trade_returns(), result.periods_per_year),
            max_drawdown: max_drawdown(&result.equity_curve),
            up: result.side_stats(Direction::Up),
            down: result.side_stats(Direction::Down),
            pnl_percentiles: PnlPercentiles::from_pnls(&result.pnls()),
        }
    }
}

// ─── Trade metrics ──────────────────────────────────────────────────

/// Fraction of trades that won.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Return on stake per trade: pnl / max(bet, 0.01).
pub fn trade_returns(trades: &[Trade]) -> Vec<f64> {
    trades
        .iter()
        .map(|t| t.pnl / t.bet_size.max(MIN_STAKE))
        .collect()
}

/// Annualized Sharpe ratio of per-trade returns.
///
/// Sharpe = mean(r) / std(r) * sqrt(periods_per_year), population std.
/// Returns 0.0 for no trades or zero variance.
pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(returns);
    let std = population_std(returns, mean);
    if std < 1e-15 {
        return 0.0;
    }
    mean / std * periods_per_year.sqrt()
}

/// Maximum peak-to-trough decline as a positive fraction of the peak.
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let Some(&first) = equity_curve.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;
    for &eq in equity_curve {
        peak = peak.max(eq);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - eq) / peak);
        }
    }
    max_dd
}

/// Gross profit / max(gross loss, 0.01).
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.pnl < 0.0)
        .map(|t| t.pnl.abs())
        .sum();
    gross_profit / gross_loss.max(MIN_GROSS_LOSS)
}

// ─── Distribution ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PnlPercentiles {
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl PnlPercentiles {
    pub fn from_pnls(pnls: &[f64]) -> Self {
        if pnls.is_empty() {
            return Self::default();
        }
        let mut sorted = pnls.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            min: sorted[0],
            p25: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            p75: percentile(&sorted, 75.0),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Linear-interpolated percentile of already sorted values.
pub fn percentile(sorted: &[f64], pct: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (pct / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
        }
    }
}

// ─── Calibration ────────────────────────────────────────────────────

/// Mean squared error of P(up) against the realized target.
pub fn brier_score(predictions: &[Prediction]) -> f64 {
    let scored: Vec<f64> = predictions
        .iter()
        .filter(|p| p.prob_up.is_finite())
        .map(|p| (p.prob_up - f64::from(p.target)).powi(2))
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    mean_f64(&scored)
}

/// 1 − brier / brier(0.5). Positive beats a coin flip. 0.0 with no predictions.
pub fn brier_skill(predictions: &[Prediction]) -> f64 {
    if !predictions.iter().any(|p| p.prob_up.is_finite()) {
        return 0.0;
    }
    1.0 - brier_score(predictions) / COIN_FLIP_BRIER
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBucket {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Exclusive upper bound, except the last bucket, which includes 1.0.
    pub upper: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub realized_rate: f64,
}

impl CalibrationBucket {
    /// Realized minus predicted. Positive means the model was underconfident.
    pub fn gap(&self) -> f64 {
        self.realized_rate - self.mean_predicted
    }
}

/// Calibration table over [`CALIBRATION_EDGES`]. Empty buckets are omitted.
pub fn calibration(predictions: &[Prediction]) -> Vec<CalibrationBucket> {
    let mut sums = [(0usize, 0.0_f64, 0.0_f64); CALIBRATION_EDGES.len()];
    for p in predictions.iter().filter(|p| p.prob_up.is_finite()) {
        let prob = p.prob_up.clamp(0.0, 1.0);
        let idx = CALIBRATION_EDGES
            .iter()
            .position(|&upper| prob < upper)
            .unwrap_or(CALIBRATION_EDGES.len() - 1);
        sums[idx].0 += 1;
        sums[idx].1 += prob;
        sums[idx].2 += f64::from(p.target);
    }

    sums.iter()
        .enumerate()
        .filter(|(_, (count, _, _))| *count > 0)
        .map(|(i, &(count, pred_sum, hit_sum))| CalibrationBucket {
            lower: if i == 0 { 0.0 } else { CALIBRATION_EDGES[i - 1] },
            upper: CALIBRATION_EDGES[i],
            count,
            mean_predicted: pred_sum / count as f64,
            realized_rate: hit_sum / count as f64,
        })
        .collect()
}

// ─── Edge decay ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuartileStats {
    pub trades: usize,
    pub win_rate: f64,
    pub pnl: f64,
    pub avg_edge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeAnalysis {
    pub quartiles: Vec<QuartileStats>,
    pub early_win_rate: f64,
    pub late_win_rate: f64,
    /// Late win rate fell more than [`EDGE_DECAY_THRESHOLD`] below the early one.
    pub decaying: bool,
}

/// Split the ledger into four contiguous quartiles of `n / 4` trades each
/// (remainder trades fall off the end) and compare first against last.
///
/// `None` below [`MIN_TRADES_FOR_EDGE_ANALYSIS`] trades.
pub fn edge_analysis(trades: &[Trade]) -> Option<EdgeAnalysis> {
    if trades.len() < MIN_TRADES_FOR_EDGE_ANALYSIS {
        return None;
    }
    let size = trades.len() / 4;
    let quartiles: Vec<QuartileStats> = trades
        .chunks_exact(size)
        .take(4)
        .map(|chunk| QuartileStats {
            trades: chunk.len(),
            win_rate: win_rate(chunk),
            pnl: chunk.iter().map(|t| t.pnl).sum(),
            avg_edge: mean_f64(&chunk.iter().map(|t| t.edge).collect::<Vec<_>>()),
        })
        .collect();

    let early = quartiles.first()?.win_rate;
    let late = quartiles.last()?.win_rate;
    Some(EdgeAnalysis {
        early_win_rate: early,
        late_win_rate: late,
        decaying: late < early - EDGE_DECAY_THRESHOLD,
        quartiles,
    })
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_trade(won: bool, bet: f64, price: f64) -> Trade {
        Trade::settle(
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            Direction::Up,
            price + 0.05,
            price,
            bet,
            won,
            1000.0,
        )
    }

    fn make_pred(prob_up: f64, target: u8) -> Prediction {
        Prediction {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            prob_up,
            target,
            forward_return: if target == 1 { 0.001 } else { -0.001 },
            close: 100.0,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_ledger_sentinels() {
        assert_eq!(win_rate(&[]), 0.0);
        assert_eq!(sharpe_ratio(&[], 105_120.0), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(brier_score(&[]), 0.0);
        assert_eq!(brier_skill(&[]), 0.0);
        assert!(calibration(&[]).is_empty());
        assert!(edge_analysis(&[]).is_none());
        assert_eq!(PnlPercentiles::from_pnls(&[]), PnlPercentiles::default());
    }

    #[test]
    fn zero_variance_sharpe_is_zero() {
        assert_eq!(sharpe_ratio(&[0.5, 0.5, 0.5], 105_120.0), 0.0);
    }

    #[test]
    fn sharpe_uses_population_std() {
        // mean 0.5, population std 0.5
        let s = sharpe_ratio(&[1.0, 0.0], 100.0);
        assert!(approx(s, 10.0));
    }

    #[test]
    fn drawdown_from_running_peak() {
        let dd = max_drawdown(&[1000.0, 1100.0, 880.0, 1200.0, 1080.0]);
        assert!(approx(dd, 0.2));
        assert_eq!(max_drawdown(&[1000.0, 1010.0, 1020.0]), 0.0);
    }

    #[test]
    fn drawdown_to_zero_is_total() {
        assert!(approx(max_drawdown(&[1000.0, 0.0, 0.0]), 1.0));
    }

    #[test]
    fn profit_factor_floors_loss() {
        let all_wins = vec![make_trade(true, 10.0, 0.5), make_trade(true, 10.0, 0.5)];
        assert!(approx(profit_factor(&all_wins), 20.0 / 0.01));

        let mixed = vec![make_trade(true, 10.0, 0.5), make_trade(false, 5.0, 0.5)];
        assert!(approx(profit_factor(&mixed), 2.0));
    }

    #[test]
    fn trade_returns_floor_stake() {
        let r = trade_returns(&[make_trade(true, 10.0, 0.5), make_trade(false, 10.0, 0.5)]);
        assert_eq!(r, vec![1.0, -1.0]);
    }

    #[test]
    fn percentiles_interpolate_linearly() {
        let p = PnlPercentiles::from_pnls(&[5.0, -2.0, 1.0, 3.0, 10.0]);
        assert_eq!(p.min, -2.0);
        assert_eq!(p.median, 3.0);
        assert_eq!(p.max, 10.0);
        assert!(approx(p.p25, 1.0));
        assert!(approx(p.p75, 5.0));
        assert!(approx(percentile(&[0.0, 10.0], 25.0), 2.5));
    }

    #[test]
    fn brier_skill_of_base_rate_is_zero() {
        let preds: Vec<_> = (0..100).map(|i| make_pred(0.5, (i % 2) as u8)).collect();
        assert!(approx(brier_score(&preds), 0.25));
        assert!(approx(brier_skill(&preds), 0.0));
    }

    #[test]
    fn brier_skill_of_perfect_predictions_is_one() {
        let preds: Vec<_> = (0..100)
            .map(|i| {
                let t = (i % 2) as u8;
                make_pred(f64::from(t), t)
            })
            .collect();
        assert!(approx(brier_score(&preds), 0.0));
        assert!(approx(brier_skill(&preds), 1.0));
    }

    #[test]
    fn calibration_buckets_are_left_closed() {
        let preds = vec![
            make_pred(0.1, 0),
            make_pred(0.3, 1),
            make_pred(0.45, 0),
            make_pred(0.5, 1),
            make_pred(0.52, 0),
            make_pred(1.0, 1),
        ];
        let buckets = calibration(&preds);
        let bounds: Vec<(f64, f64, usize)> =
            buckets.iter().map(|b| (b.lower, b.upper, b.count)).collect();
        assert_eq!(
            bounds,
            vec![
                (0.0, 0.3, 1),
                (0.3, 0.4, 1),
                (0.45, 0.5, 1),
                (0.5, 0.55, 2),
                (0.7, 1.0, 1),
            ]
        );
        let mid = buckets[3];
        assert!(approx(mid.mean_predicted, 0.51));
        assert!(approx(mid.realized_rate, 0.5));
        assert!(approx(mid.gap(), -0.01));
    }

    #[test]
    fn edge_analysis_needs_twenty_trades() {
        let trades: Vec<_> = (0..19).map(|_| make_trade(true, 10.0, 0.5)).collect();
        assert!(edge_analysis(&trades).is_none());
    }

    #[test]
    fn edge_decay_detected() {
        // 22 trades → quartiles of 5, last two trades dropped
        let trades: Vec<_> = (0..22).map(|i| make_trade(i < 10, 10.0, 0.5)).collect();
        let ea = edge_analysis(&trades).unwrap();
        assert_eq!(ea.quartiles.len(), 4);
        assert!(ea.quartiles.iter().all(|q| q.trades == 5));
        assert!(approx(ea.early_win_rate, 1.0));
        assert!(approx(ea.late_win_rate, 0.0));
        assert!(ea.decaying);
        assert!(approx(ea.quartiles[0].pnl, 50.0));
        assert!(approx(ea.quartiles[0].avg_edge, 0.05));
    }

    #[test]
    fn steady_edge_not_flagged() {
        let trades: Vec<_> = (0..40).map(|i| make_trade(i % 2 == 0, 10.0, 0.5)).collect();
        let ea = edge_analysis(&trades).unwrap();
        assert!(!ea.decaying);
    }

    #[test]
    fn compute_aggregates_result() {
        use edgelab_core::engine::RunLabel;
        let mut r = BacktestResult::new(RunLabel::new("X", "m"), 1000.0, 100.0);
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        for (i, won) in [true, false, true].into_iter().enumerate() {
            let t = Trade::settle(
                start + Duration::minutes(i as i64 * 5),
                if i == 1 { Direction::Down } else { Direction::Up },
                0.6,
                0.5,
                10.0,
                won,
                r.final_bankroll(),
            );
            r.equity_curve.push(t.bankroll_after);
            r.timestamps.push(t.timestamp);
            r.trades.push(t);
        }
        let m = PerformanceMetrics::compute(&r);
        assert_eq!(m.total_trades, 3);
        assert_eq!(m.winning_trades, 2);
        assert!(approx(m.total_pnl, 10.0));
        assert!(approx(m.final_bankroll, 1010.0));
        assert!(approx(m.profit_factor, 2.0));
        assert_eq!(m.up.count, 2);
        assert_eq!(m.down.wins, 0);
        assert!(approx(m.pnl_percentiles.median, 10.0));
    }
}
