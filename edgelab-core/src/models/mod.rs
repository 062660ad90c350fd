//! Probability models: feature row → P(up).
//!
//! Three interchangeable estimators share the `ProbabilityEstimator` interface:
//! - `HeuristicScorer`: fixed, bounded signal scores; needs no fitting
//! - `LinearModel`: standardized L2 logistic regression with balanced class weights
//! - `Ensemble`: fixed weighted average of other estimators

pub mod ensemble;
pub mod heuristic;
pub mod linear;

pub use ensemble::{weighted, Ensemble, EnsembleWeights};
pub use heuristic::HeuristicScorer;
pub use linear::{LinearModel, LinearModelParams};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::features::FeatureRow;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("model has not been fitted")]
    NotFitted,

    #[error("training set is empty")]
    EmptyTrainingSet,

    #[error("training targets contain only class {class}")]
    SingleClass { class: u8 },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("feature '{0}' is missing or undefined")]
    MissingFeature(String),

    #[error("Newton system is singular (pivot {pivot:.3e} in column {column})")]
    Singular { column: usize, pivot: f64 },
}

/// Standardized coefficient magnitude for one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub importance: f64,
}

/// Scores a feature row into P(up).
///
/// Estimators that learn from data override `fit`; the default is a no-op so
/// stateless scorers can be used anywhere a fitted model is expected.
pub trait ProbabilityEstimator: Send + Sync {
    /// Short identifier used in logs, reports and seed derivation.
    fn name(&self) -> &str;

    /// Fit on dense training rows. `x[i]` holds the values of `names` in order.
    fn fit(&mut self, _names: &[String], _x: &[Vec<f64>], _y: &[u8]) -> Result<(), ModelError> {
        Ok(())
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError>;

    /// Ranked feature importances, when the estimator has any.
    fn feature_importances(&self) -> Option<Vec<FeatureImportance>> {
        None
    }
}

/// Entry point for live callers: P(up) for one feature row, clamped to [0, 1].
pub fn estimate_probability(
    estimator: &dyn ProbabilityEstimator,
    row: &FeatureRow,
) -> Result<f64, ModelError> {
    estimator.predict_proba(row).map(|p| p.clamp(0.0, 1.0))
}

/// Numerically stable logistic function.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
