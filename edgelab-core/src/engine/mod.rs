//! Backtest simulator — replays a prediction stream against a synthetic binary market.
//!
//! For every `horizon`-th prediction:
//!
//! 1. Pick the side implied by P(up) (ties go UP)
//! 2. Quote a noisy ask around the market base rate, add slippage
//! 3. Size the stake with fractional Kelly at the current bankroll
//! 4. Resolve against the realized forward return and update the bankroll

pub mod config;
pub mod market;
pub mod result;
pub mod simulator;

pub use config::SimulationConfig;
pub use market::MarketModel;
pub use result::{BacktestResult, RunLabel, SideStats};
pub use simulator::run_backtest;
