//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::features::MINUTES_PER_YEAR;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub starting_bankroll: f64,
    /// Added to the quoted ask, in dollars per share.
    pub slippage: f64,
    /// Bars between bets; also the contract duration.
    pub horizon: usize,
    /// Center of the synthetic ask.
    pub market_base: f64,
    /// Standard deviation of the Gaussian noise added to the ask.
    pub market_noise: f64,
    pub price_floor: f64,
    pub price_cap: f64,
    pub bar_interval_minutes: f64,
    /// Master seed for market noise.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            starting_bankroll: 1000.0,
            slippage: 0.01,
            horizon: 5,
            market_base: 0.5,
            market_noise: 0.03,
            price_floor: 0.05,
            price_cap: 0.95,
            bar_interval_minutes: 1.0,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    /// Bets per year if one is placed every `horizon` bars.
    pub fn periods_per_year(&self) -> f64 {
        MINUTES_PER_YEAR / (self.horizon as f64 * self.bar_interval_minutes)
    }
}
