//! Prediction-stream replay.

use tracing::{debug, info};

use crate::domain::{Direction, Prediction, Trade};
use crate::kelly::{kelly_size, KellyParams};
use crate::rng::GaussianSource;

use super::{BacktestResult, MarketModel, RunLabel, SimulationConfig};

/// Replay `predictions` in order, betting on every `horizon`-th row.
///
/// Sampled rows are indices 0, H, 2H, … with `index + H < len`. Undefined
/// rows are dropped without an equity snapshot; every other sampled row adds
/// one snapshot, whether or not a bet was placed. A zero bankroll and an
/// empty stream are not errors.
pub fn run_backtest(
    label: RunLabel,
    predictions: &[Prediction],
    config: &SimulationConfig,
    sizing: &KellyParams,
    rng: &mut dyn GaussianSource,
) -> BacktestResult {
    let market = MarketModel::from_config(config);
    let mut result = BacktestResult::new(label, config.starting_bankroll, config.periods_per_year());
    let mut bankroll = config.starting_bankroll;
    let step = config.horizon.max(1);

    let mut i = 0;
    while i + step < predictions.len() {
        let pred = &predictions[i];
        i += step;

        if !pred.is_defined() {
            result.undefined += 1;
            continue;
        }

        let (direction, our_prob) = Direction::from_prob_up(pred.prob_up);
        let price = market.ask(rng) + config.slippage;
        let stake = kelly_size(our_prob, price, bankroll, sizing);

        if stake == 0.0 {
            result.skipped += 1;
            result.equity_curve.push(bankroll);
            result.timestamps.push(pred.timestamp);
            continue;
        }

        let won = direction.wins(pred.forward_return);
        let trade = Trade::settle(
            pred.timestamp,
            direction,
            our_prob,
            price,
            stake,
            won,
            bankroll,
        );
        bankroll = trade.bankroll_after;
        debug!(
            ts = %trade.timestamp,
            direction = %trade.direction,
            price = trade.market_price,
            stake = trade.bet_size,
            pnl = trade.pnl,
            "trade"
        );
        result.trades.push(trade);
        result.equity_curve.push(bankroll);
        result.timestamps.push(pred.timestamp);
    }

    info!(
        symbol = %result.label.symbol,
        model = %result.label.model,
        trades = result.trades.len(),
        skipped = result.skipped,
        final_bankroll = bankroll,
        "backtest complete"
    );
    result
}
