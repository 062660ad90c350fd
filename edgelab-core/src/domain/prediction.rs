//! Prediction — one out-of-sample probability estimate paired with its realized outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Out-of-sample P(up) for one bar, with the target and forward return it is scored against.
///
/// Produced by the walk-forward validator or the heuristic stream; consumed in
/// timestamp order by the backtest simulator and the calibration metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub timestamp: DateTime<Utc>,
    pub prob_up: f64,
    pub target: u8,
    pub forward_return: f64,
    pub close: f64,
}

impl Prediction {
    /// A prediction is usable when both the probability and the forward return are finite.
    pub fn is_defined(&self) -> bool {
        self.prob_up.is_finite() && self.forward_return.is_finite()
    }
}
