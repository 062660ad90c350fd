//! Ensemble — fixed weighted average of member estimators.

use serde::{Deserialize, Serialize};

use crate::features::FeatureRow;

use super::{
    FeatureImportance, HeuristicScorer, LinearModel, LinearModelParams, ModelError,
    ProbabilityEstimator,
};

/// Blend weights for the default linear + heuristic ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleWeights {
    pub linear: f64,
    pub heuristic: f64,
}

impl Default for EnsembleWeights {
    fn default() -> Self {
        Self {
            linear: 0.7,
            heuristic: 0.3,
        }
    }
}

struct Member {
    estimator: Box<dyn ProbabilityEstimator>,
    weight: f64,
}

/// Box an estimator together with its blend weight.
pub fn weighted<E>(estimator: E, weight: f64) -> (Box<dyn ProbabilityEstimator>, f64)
where
    E: ProbabilityEstimator + 'static,
{
    (Box::new(estimator), weight)
}

/// Weighted average of member probabilities. Weights are normalized to sum to 1.
pub struct Ensemble {
    members: Vec<Member>,
}

impl Ensemble {
    pub fn new(members: Vec<(Box<dyn ProbabilityEstimator>, f64)>) -> Self {
        assert!(!members.is_empty(), "ensemble needs at least one member");
        assert!(
            members.iter().all(|(_, w)| w.is_finite() && *w >= 0.0),
            "ensemble weights must be finite and non-negative"
        );
        let total: f64 = members.iter().map(|(_, w)| w).sum();
        assert!(total > 0.0, "ensemble weights must not all be zero");
        Self {
            members: members
                .into_iter()
                .map(|(estimator, w)| Member {
                    estimator,
                    weight: w / total,
                })
                .collect(),
        }
    }

    /// Unfitted linear model blended with the heuristic scorer.
    pub fn linear_heuristic(params: LinearModelParams, weights: &EnsembleWeights) -> Self {
        Self::new(vec![
            weighted(LinearModel::new(params), weights.linear),
            weighted(HeuristicScorer::new(), weights.heuristic),
        ])
    }

    /// Normalized weights in member order.
    pub fn weights(&self) -> Vec<f64> {
        self.members.iter().map(|m| m.weight).collect()
    }

    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.estimator.name()).collect()
    }
}

impl std::fmt::Debug for Ensemble {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ensemble")
            .field("members", &self.member_names())
            .field("weights", &self.weights())
            .finish()
    }
}

impl ProbabilityEstimator for Ensemble {
    fn name(&self) -> &str {
        "ensemble"
    }

    fn fit(&mut self, names: &[String], x: &[Vec<f64>], y: &[u8]) -> Result<(), ModelError> {
        for member in &mut self.members {
            member.estimator.fit(names, x, y)?;
        }
        Ok(())
    }

    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, ModelError> {
        let mut p = 0.0;
        for member in &self.members {
            p += member.weight * member.estimator.predict_proba(row)?;
        }
        Ok(p)
    }

    fn feature_importances(&self) -> Option<Vec<FeatureImportance>> {
        self.members
            .iter()
            .find_map(|m| m.estimator.feature_importances())
    }
}
