//! Synthetic ask quotes for the binary contract.

use crate::rng::GaussianSource;

use super::SimulationConfig;

/// Ask = clip(base + N(0, noise), floor, cap).
#[derive(Debug, Clone, PartialEq)]
pub struct MarketModel {
    pub base: f64,
    pub noise: f64,
    pub floor: f64,
    pub cap: f64,
}

impl MarketModel {
    pub fn from_config(config: &SimulationConfig) -> Self {
        Self {
            base: config.market_base,
            noise: config.market_noise,
            floor: config.price_floor,
            cap: config.price_cap,
        }
    }

    pub fn ask(&self, rng: &mut dyn GaussianSource) -> f64 {
        rng.next_gaussian(self.base, self.noise)
            .clamp(self.floor, self.cap)
    }
}
