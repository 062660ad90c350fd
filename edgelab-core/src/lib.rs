//! EdgeLab Core — domain types, features, probability models, Kelly sizing, bet simulation.
//!
//! This crate contains the pure computational pieces of the backtester:
//! - Domain types (bars, predictions, trades)
//! - Causal feature engineering over 1-minute OHLCV bars
//! - Probability estimators (heuristic, regularized logistic, weighted ensemble)
//! - Fractional-Kelly sizing for binary contracts
//! - Prediction-stream replay against a synthetic binary market
//! - Seeded randomness with per-run sub-seeds

pub mod domain;
pub mod engine;
pub mod features;
pub mod kelly;
pub mod models;
pub mod rng;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: core types can cross the walk-forward worker pool.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Bar>();
        require_sync::<domain::Bar>();
        require_send::<domain::Prediction>();
        require_sync::<domain::Prediction>();
        require_send::<domain::Trade>();
        require_sync::<domain::Trade>();

        // Features
        require_send::<features::FeatureConfig>();
        require_sync::<features::FeatureConfig>();
        require_send::<features::FeatureTable>();
        require_sync::<features::FeatureTable>();
        require_send::<features::FeatureRow>();
        require_sync::<features::FeatureRow>();

        // Models
        require_send::<models::LinearModel>();
        require_sync::<models::LinearModel>();
        require_send::<models::HeuristicScorer>();
        require_sync::<models::HeuristicScorer>();
        require_send::<models::Ensemble>();
        require_sync::<models::Ensemble>();
        require_send::<Box<dyn models::ProbabilityEstimator>>();
        require_sync::<Box<dyn models::ProbabilityEstimator>>();

        // Engine
        require_send::<engine::SimulationConfig>();
        require_sync::<engine::SimulationConfig>();
        require_send::<engine::BacktestResult>();
        require_sync::<engine::BacktestResult>();
        require_send::<kelly::KellyParams>();
        require_sync::<kelly::KellyParams>();

        // RNG
        require_send::<rng::RngHierarchy>();
        require_sync::<rng::RngHierarchy>();
        require_send::<rng::SeededGaussian>();
    }

    /// Estimators only see one feature row, never a future bar.
    #[test]
    fn estimator_trait_takes_single_row() {
        fn _check_trait_object_builds(
            est: &dyn models::ProbabilityEstimator,
            row: &features::FeatureRow,
        ) -> Result<f64, models::ModelError> {
            est.predict_proba(row)
        }
    }
}
