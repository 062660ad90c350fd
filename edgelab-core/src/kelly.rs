//! Fractional-Kelly bet sizing for binary contracts.
//!
//! A share bought at price `c` pays $1 if the chosen side wins. With win
//! probability `p` and net odds `b = (1 - c) / c`:
//! ```text
//! f* = (p·b − (1 − p)) / b
//! ```
//! The stake is `min(f*·kelly_fraction·bankroll, max_position_pct·bankroll)`,
//! dropped to zero when the edge `p − c` is below `min_edge` or the stake is
//! below `min_bet`.

use serde::{Deserialize, Serialize};

/// Absorbs float noise when the edge sits exactly on `min_edge`.
const EDGE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KellyParams {
    /// Fraction of full Kelly to stake (0.25 = quarter Kelly).
    pub kelly_fraction: f64,
    /// Hard cap on the stake as a fraction of bankroll.
    pub max_position_pct: f64,
    /// Minimum `our_prob − price` required to bet.
    pub min_edge: f64,
    /// Stakes below this dollar amount are not placed.
    pub min_bet: f64,
}

impl Default for KellyParams {
    fn default() -> Self {
        Self {
            kelly_fraction: 0.25,
            max_position_pct: 0.05,
            min_edge: 0.02,
            min_bet: 0.10,
        }
    }
}

/// Why a sizing call did or did not produce a stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizingReason {
    Placed,
    /// Price outside (0, 1), probability outside [0, 1], NaN, or empty bankroll.
    InvalidInputs,
    /// `our_prob <= price`.
    NoEdge,
    BelowMinEdge,
    BelowMinBet,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetDecision {
    pub stake: f64,
    pub edge: f64,
    /// Full Kelly fraction before scaling and capping.
    pub full_kelly: f64,
    pub reason: SizingReason,
}

impl BetDecision {
    fn skip(edge: f64, full_kelly: f64, reason: SizingReason) -> Self {
        Self {
            stake: 0.0,
            edge,
            full_kelly,
            reason,
        }
    }

    pub fn is_placed(&self) -> bool {
        self.reason == SizingReason::Placed
    }
}

/// Full Kelly fraction for a binary contract. Zero or negative means no bet.
pub fn full_kelly_fraction(our_prob: f64, price: f64) -> f64 {
    let b = (1.0 - price) / price;
    (our_prob * b - (1.0 - our_prob)) / b
}

/// Size a bet and report why.
pub fn size_bet(our_prob: f64, price: f64, bankroll: f64, params: &KellyParams) -> BetDecision {
    if !our_prob.is_finite()
        || !price.is_finite()
        || !bankroll.is_finite()
        || !(0.0..=1.0).contains(&our_prob)
        || price <= 0.0
        || price >= 1.0
        || bankroll <= 0.0
    {
        return BetDecision::skip(0.0, 0.0, SizingReason::InvalidInputs);
    }

    let edge = our_prob - price;
    if our_prob <= price {
        return BetDecision::skip(edge, 0.0, SizingReason::NoEdge);
    }
    let full_kelly = full_kelly_fraction(our_prob, price);
    if edge + EDGE_TOLERANCE < params.min_edge {
        return BetDecision::skip(edge, full_kelly, SizingReason::BelowMinEdge);
    }

    let stake = (full_kelly * params.kelly_fraction * bankroll)
        .min(params.max_position_pct * bankroll)
        .max(0.0);
    if stake < params.min_bet {
        return BetDecision::skip(edge, full_kelly, SizingReason::BelowMinBet);
    }

    BetDecision {
        stake,
        edge,
        full_kelly,
        reason: SizingReason::Placed,
    }
}

/// Dollar stake for a bet at `price` with win probability `our_prob`. Zero means skip.
pub fn kelly_size(our_prob: f64, price: f64, bankroll: f64, params: &KellyParams) -> f64 {
    size_bet(our_prob, price, bankroll, params).stake
}
