//! Trade — one resolved binary bet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the up/down contract was bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// Choose the side implied by `prob_up` and return it with the probability
    /// of that side winning. Ties at 0.5 go to `Up`.
    pub fn from_prob_up(prob_up: f64) -> (Self, f64) {
        if prob_up >= 0.5 {
            (Direction::Up, prob_up)
        } else {
            (Direction::Down, 1.0 - prob_up)
        }
    }

    /// Resolve the bet against the realized forward return.
    ///
    /// A forward return of exactly zero counts as a `Down` win.
    pub fn wins(self, forward_return: f64) -> bool {
        match self {
            Direction::Up => forward_return > 0.0,
            Direction::Down => forward_return <= 0.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Up => write!(f, "UP"),
            Direction::Down => write!(f, "DOWN"),
        }
    }
}

/// A resolved bet: entry price, stake, outcome and the bankroll afterwards.
///
/// `market_price` is the slippage-adjusted execution price per share; a share
/// pays $1 if the chosen side wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub our_prob: f64,
    pub market_price: f64,
    pub edge: f64,
    pub bet_size: f64,
    pub shares: f64,
    pub outcome: u8,
    pub pnl: f64,
    pub bankroll_after: f64,
}

impl Trade {
    /// Settle a bet. `bankroll_before` is the bankroll the stake was sized from.
    #[allow(clippy::too_many_arguments)]
    pub fn settle(
        timestamp: DateTime<Utc>,
        direction: Direction,
        our_prob: f64,
        market_price: f64,
        bet_size: f64,
        won: bool,
        bankroll_before: f64,
    ) -> Self {
        let shares = bet_size / market_price;
        let pnl = if won {
            shares * (1.0 - market_price)
        } else {
            -bet_size
        };
        Self {
            timestamp,
            direction,
            our_prob,
            market_price,
            edge: our_prob - market_price,
            bet_size,
            shares,
            outcome: u8::from(won),
            pnl,
            bankroll_after: (bankroll_before + pnl).max(0.0),
        }
    }

    pub fn is_winner(&self) -> bool {
        self.outcome == 1
    }

    /// PnL per dollar staked. Stakes below one cent are treated as one cent.
    pub fn return_on_stake(&self) -> f64 {
        self.pnl / self.bet_size.max(0.01)
    }
}
