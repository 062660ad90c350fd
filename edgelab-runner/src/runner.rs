//! Pipeline runner — wires features, predictions, simulation and metrics.
//!
//! bars → feature table → prediction stream → backtest → [`RunOutput`].
//! Market noise for each run comes from the config's master seed, split per
//! (symbol, model) so results do not depend on which runs execute together.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use edgelab_core::domain::{Bar, Prediction};
use edgelab_core::engine::{run_backtest, BacktestResult, RunLabel};
use edgelab_core::features::{compute_features, FeatureTable};
use edgelab_core::models::{FeatureImportance, ModelError};
use edgelab_core::rng::RngHierarchy;

use crate::config::{BacktestConfig, ConfigError};
use crate::metrics::PerformanceMetrics;
use crate::walk_forward::{
    heuristic_predict, walk_forward_ensemble, walk_forward_predict,
};

/// Number of averaged importances kept on a run.
pub const TOP_FEATURES: usize = 10;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("model error: {0}")]
    Model(#[from] ModelError),
}

/// Which prediction stream feeds the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Untrained rule-based scorer over every post-warmup row.
    Heuristic,
    /// Walk-forward regularized logistic regression.
    Logistic,
    /// Walk-forward blend of logistic and heuristic.
    Ensemble,
}

impl ModelKind {
    pub const ALL: [ModelKind; 3] = [ModelKind::Heuristic, ModelKind::Logistic, ModelKind::Ensemble];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelKind::Heuristic => "heuristic",
            ModelKind::Logistic => "logistic",
            ModelKind::Ensemble => "ensemble",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heuristic" => Ok(ModelKind::Heuristic),
            "logistic" | "linear" => Ok(ModelKind::Logistic),
            "ensemble" => Ok(ModelKind::Ensemble),
            other => Err(format!(
                "unknown model '{other}' (expected heuristic, logistic or ensemble)"
            )),
        }
    }
}

/// Everything one (symbol, model) run produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub kind: ModelKind,
    pub result: BacktestResult,
    pub metrics: PerformanceMetrics,
    pub predictions: Vec<Prediction>,
    /// Walk-forward importances averaged over steps, largest first.
    pub top_features: Vec<FeatureImportance>,
    pub walk_forward_steps: usize,
    pub walk_forward_skipped: usize,
    pub config_hash: String,
}

/// Run one model over raw bars. `Ok(None)` when no predictions could be made.
pub fn run_pipeline(
    symbol: &str,
    bars: &[Bar],
    config: &BacktestConfig,
    kind: ModelKind,
) -> Result<Option<RunOutput>, RunError> {
    config.validate()?;
    let table = compute_features(bars, &config.features);
    run_on_table(symbol, &table, config, kind)
}

/// Run several models over the same bars, computing features once.
///
/// Runs with an empty prediction stream are dropped with a warning.
pub fn run_models(
    symbol: &str,
    bars: &[Bar],
    config: &BacktestConfig,
    kinds: &[ModelKind],
) -> Result<Vec<RunOutput>, RunError> {
    config.validate()?;
    let table = compute_features(bars, &config.features);
    let mut outputs = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        if let Some(out) = run_on_table(symbol, &table, config, kind)? {
            outputs.push(out);
        }
    }
    Ok(outputs)
}

/// Run one model over a precomputed feature table.
pub fn run_on_table(
    symbol: &str,
    table: &FeatureTable,
    config: &BacktestConfig,
    kind: ModelKind,
) -> Result<Option<RunOutput>, RunError> {
    config.validate()?;
    let (predictions, wf) = match kind {
        ModelKind::Heuristic => (heuristic_predict(table, config.features.warmup()), None),
        ModelKind::Logistic => {
            let wf = walk_forward_predict(table, &config.walk_forward, &config.model.linear)?;
            (wf.predictions.clone(), Some(wf))
        }
        ModelKind::Ensemble => {
            let wf = walk_forward_ensemble(
                table,
                &config.walk_forward,
                &config.model.linear,
                &config.model.ensemble,
            )?;
            (wf.predictions.clone(), Some(wf))
        }
    };

    if predictions.is_empty() {
        warn!(symbol, model = %kind, rows = table.len(), "no predictions, skipping backtest");
        return Ok(None);
    }

    let label = RunLabel::new(symbol, kind.as_str());
    let mut rng = RngHierarchy::new(config.simulation.seed).gaussian_for(symbol, kind.as_str());
    let result = run_backtest(
        label,
        &predictions,
        &config.simulation,
        &config.sizing,
        &mut rng,
    );
    let metrics = PerformanceMetrics::compute(&result);

    info!(
        symbol,
        model = %kind,
        predictions = predictions.len(),
        trades = metrics.total_trades,
        return_pct = metrics.return_pct,
        sharpe = metrics.sharpe,
        "run complete"
    );

    Ok(Some(RunOutput {
        kind,
        result,
        metrics,
        predictions,
        top_features: wf
            .as_ref()
            .map(|w| w.top_features(TOP_FEATURES))
            .unwrap_or_default(),
        walk_forward_steps: wf.as_ref().map_or(0, |w| w.steps.len()),
        walk_forward_skipped: wf.as_ref().map_or(0, |w| w.skipped.len()),
        config_hash: config.config_hash()?,
    }))
}
