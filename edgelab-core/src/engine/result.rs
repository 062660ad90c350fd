//! Backtest result — trade ledger and equity curve for one (symbol, model) run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Direction, Trade};

/// Identifies a run in reports and seed derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunLabel {
    pub symbol: String,
    pub model: String,
}

impl RunLabel {
    pub fn new(symbol: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            model: model.into(),
        }
    }
}

/// Count and hit rate for one side of the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideStats {
    pub count: usize,
    pub wins: usize,
    pub win_rate: f64,
}

/// Output of a backtest run.
///
/// `equity_curve[0]` is the starting bankroll; `equity_curve[k + 1]` is the
/// bankroll after the evaluated bar at `timestamps[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub label: RunLabel,
    pub starting_bankroll: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<f64>,
    pub timestamps: Vec<DateTime<Utc>>,
    /// Evaluated bars where the sizer declined to bet.
    pub skipped: usize,
    /// Sampled predictions dropped because they were undefined.
    pub undefined: usize,
    /// Bets per year, for annualizing per-trade statistics.
    pub periods_per_year: f64,
}

impl BacktestResult {
    pub fn new(label: RunLabel, starting_bankroll: f64, periods_per_year: f64) -> Self {
        Self {
            label,
            starting_bankroll,
            trades: Vec::new(),
            equity_curve: vec![starting_bankroll],
            timestamps: Vec::new(),
            skipped: 0,
            undefined: 0,
            periods_per_year,
        }
    }

    pub fn total_trades(&self) -> usize {
        self.trades.len()
    }

    pub fn winning_trades(&self) -> usize {
        self.trades.iter().filter(|t| t.is_winner()).count()
    }

    pub fn total_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }

    pub fn final_bankroll(&self) -> f64 {
        self.equity_curve
            .last()
            .copied()
            .unwrap_or(self.starting_bankroll)
    }

    /// Total PnL as a percentage of the starting bankroll.
    pub fn return_pct(&self) -> f64 {
        if self.starting_bankroll <= 0.0 {
            return 0.0;
        }
        self.total_pnl() / self.starting_bankroll * 100.0
    }

    /// Mean PnL of winning trades, 0 if none.
    pub fn avg_win(&self) -> f64 {
        mean(self.trades.iter().filter(|t| t.is_winner()).map(|t| t.pnl))
    }

    /// Mean PnL of losing trades (negative), 0 if none.
    pub fn avg_loss(&self) -> f64 {
        mean(self.trades.iter().filter(|t| !t.is_winner()).map(|t| t.pnl))
    }

    pub fn avg_edge(&self) -> f64 {
        mean(self.trades.iter().map(|t| t.edge))
    }

    /// Per-trade return on stake.
    pub fn trade_returns(&self) -> Vec<f64> {
        self.trades.iter().map(Trade::return_on_stake).collect()
    }

    pub fn pnls(&self) -> Vec<f64> {
        self.trades.iter().map(|t| t.pnl).collect()
    }

    pub fn side_stats(&self, direction: Direction) -> SideStats {
        let (count, wins) = self
            .trades
            .iter()
            .filter(|t| t.direction == direction)
            .fold((0, 0), |(c, w), t| (c + 1, w + usize::from(t.is_winner())));
        SideStats {
            count,
            wins,
            win_rate: if count == 0 {
                0.0
            } else {
                wins as f64 / count as f64
            },
        }
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn trade(direction: Direction, won: bool, bet: f64, bankroll: f64) -> Trade {
        Trade::settle(
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            direction,
            0.6,
            0.5,
            bet,
            won,
            bankroll,
        )
    }

    fn sample() -> BacktestResult {
        let mut r = BacktestResult::new(RunLabel::new("BTCUSDT", "logistic"), 1000.0, 105_120.0);
        let t1 = trade(Direction::Up, true, 50.0, 1000.0);
        let t2 = trade(Direction::Down, false, 20.0, t1.bankroll_after);
        let t3 = trade(Direction::Up, false, 10.0, t2.bankroll_after);
        for t in [t1, t2, t3] {
            r.equity_curve.push(t.bankroll_after);
            r.timestamps.push(t.timestamp);
            r.trades.push(t);
        }
        r
    }

    #[test]
    fn empty_result_sentinels() {
        let r = BacktestResult::new(RunLabel::new("X", "m"), 1000.0, 1.0);
        assert_eq!(r.total_trades(), 0);
        assert_eq!(r.total_pnl(), 0.0);
        assert_eq!(r.avg_win(), 0.0);
        assert_eq!(r.avg_loss(), 0.0);
        assert_eq!(r.final_bankroll(), 1000.0);
        assert_eq!(r.side_stats(Direction::Up).win_rate, 0.0);
    }

    #[test]
    fn derived_statistics() {
        let r = sample();
        assert_eq!(r.total_trades(), 3);
        assert_eq!(r.winning_trades(), 1);
        assert!((r.total_pnl() - 20.0).abs() < 1e-9);
        assert!((r.final_bankroll() - 1020.0).abs() < 1e-9);
        assert!((r.return_pct() - 2.0).abs() < 1e-9);
        assert!((r.avg_win() - 50.0).abs() < 1e-9);
        assert!((r.avg_loss() + 15.0).abs() < 1e-9);
    }

    #[test]
    fn side_split() {
        let r = sample();
        let up = r.side_stats(Direction::Up);
        assert_eq!((up.count, up.wins), (2, 1));
        assert!((up.win_rate - 0.5).abs() < 1e-12);
        let down = r.side_stats(Direction::Down);
        assert_eq!((down.count, down.wins), (1, 0));
    }

    #[test]
    fn trade_returns_per_stake() {
        let r = sample();
        assert_eq!(r.trade_returns(), vec![1.0, -1.0, -1.0]);
    }
}
