//! Walk-forward validation — rolling train/test windows over a feature table.
//!
//! Starting at `start = train_window`, each step fits a fresh estimator on the
//! clean rows of `[start - train_window, start)` and predicts the clean rows of
//! `[start, start + test_window)`. The window then advances by `test_window`
//! while `start + test_window <= rows`. A fitted estimator never outlives its
//! step.
//!
//! Steps with too few clean rows are skipped, not failed. A series shorter
//! than one train + test window yields an empty stream.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use edgelab_core::domain::Prediction;
use edgelab_core::features::FeatureTable;
use edgelab_core::models::{
    estimate_probability, Ensemble, EnsembleWeights, FeatureImportance, HeuristicScorer,
    LinearModel, LinearModelParams, ModelError, ProbabilityEstimator,
};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    /// Rows in each training window (default 10 080 = 7 days of minutes).
    pub train_window: usize,
    /// Rows in each test window (default 1 440 = 1 day of minutes).
    pub test_window: usize,
    /// Steps with fewer clean training rows are skipped.
    pub min_train_rows: usize,
    /// Steps with fewer clean test rows are skipped.
    pub min_test_rows: usize,
    /// Run steps on the rayon pool. Output order is unaffected.
    pub parallel: bool,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            train_window: 10_080,
            test_window: 1_440,
            min_train_rows: 100,
            min_test_rows: 10,
            parallel: true,
        }
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Row ranges of a single step (start inclusive, end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepWindow {
    pub step: usize,
    pub train_start: usize,
    pub train_end: usize,
    pub test_start: usize,
    pub test_end: usize,
}

/// Why a step produced no predictions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SkipReason {
    TooFewTrainRows { clean: usize },
    TooFewTestRows { clean: usize },
    /// Training targets held a single class.
    Degenerate(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub window: StepWindow,
    pub train_rows: usize,
    pub test_rows: usize,
    pub importances: Option<Vec<FeatureImportance>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardOutput {
    pub predictions: Vec<Prediction>,
    pub steps: Vec<StepSummary>,
    pub skipped: Vec<(StepWindow, SkipReason)>,
}

impl WalkForwardOutput {
    /// Importance per feature averaged over every step that reported any,
    /// largest first.
    pub fn mean_importances(&self) -> Vec<FeatureImportance> {
        let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for imp in self.steps.iter().filter_map(|s| s.importances.as_ref()).flatten() {
            let entry = totals.entry(imp.name.as_str()).or_insert((0.0, 0));
            entry.0 += imp.importance;
            entry.1 += 1;
        }
        let mut out: Vec<FeatureImportance> = totals
            .into_iter()
            .map(|(name, (sum, n))| FeatureImportance {
                name: name.to_string(),
                importance: sum / n as f64,
            })
            .collect();
        out.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        out
    }

    pub fn top_features(&self, n: usize) -> Vec<FeatureImportance> {
        let mut all = self.mean_importances();
        all.truncate(n);
        all
    }
}

// ─── Step planning ───────────────────────────────────────────────────

/// All step windows that fit in `rows`.
pub fn plan_steps(rows: usize, config: &WalkForwardConfig) -> Vec<StepWindow> {
    let mut steps = Vec::new();
    if config.train_window == 0 || config.test_window == 0 {
        return steps;
    }
    let mut start = config.train_window;
    while start + config.test_window <= rows {
        steps.push(StepWindow {
            step: steps.len(),
            train_start: start - config.train_window,
            train_end: start,
            test_start: start,
            test_end: start + config.test_window,
        });
        start += config.test_window;
    }
    steps
}

// ─── Walk-forward driver ─────────────────────────────────────────────

enum StepOutcome {
    Done(StepSummary, Vec<Prediction>),
    Skipped(StepWindow, SkipReason),
}

/// Run walk-forward with a fresh estimator from `factory` at every step.
///
/// Fit failures caused by the training window itself (empty or single-class)
/// skip the step; any other model error aborts the run.
pub fn walk_forward<F>(
    table: &FeatureTable,
    config: &WalkForwardConfig,
    factory: F,
) -> Result<WalkForwardOutput, ModelError>
where
    F: Fn() -> Box<dyn ProbabilityEstimator> + Sync,
{
    let names = table.model_feature_names();
    let windows = plan_steps(table.len(), config);
    info!(
        rows = table.len(),
        steps = windows.len(),
        features = names.len(),
        train_window = config.train_window,
        test_window = config.test_window,
        "walk-forward start"
    );

    let run = |w: &StepWindow| run_step(table, &names, *w, config, &factory);
    let outcomes: Vec<Result<StepOutcome, ModelError>> = if config.parallel {
        windows.par_iter().map(run).collect()
    } else {
        windows.iter().map(run).collect()
    };

    let mut out = WalkForwardOutput::default();
    for outcome in outcomes {
        match outcome? {
            StepOutcome::Done(summary, preds) => {
                out.predictions.extend(preds);
                out.steps.push(summary);
            }
            StepOutcome::Skipped(window, reason) => {
                warn!(step = window.step, ?reason, "walk-forward step skipped");
                out.skipped.push((window, reason));
            }
        }
    }

    info!(
        steps = out.steps.len(),
        skipped = out.skipped.len(),
        predictions = out.predictions.len(),
        "walk-forward complete"
    );
    Ok(out)
}

fn run_step<F>(
    table: &FeatureTable,
    names: &[String],
    window: StepWindow,
    config: &WalkForwardConfig,
    factory: &F,
) -> Result<StepOutcome, ModelError>
where
    F: Fn() -> Box<dyn ProbabilityEstimator>,
{
    let train_rows = table.clean_rows(window.train_start..window.train_end, names);
    if train_rows.len() < config.min_train_rows {
        return Ok(StepOutcome::Skipped(
            window,
            SkipReason::TooFewTrainRows {
                clean: train_rows.len(),
            },
        ));
    }
    let test_rows = table.clean_rows(window.test_start..window.test_end, names);
    if test_rows.len() < config.min_test_rows {
        return Ok(StepOutcome::Skipped(
            window,
            SkipReason::TooFewTestRows {
                clean: test_rows.len(),
            },
        ));
    }

    let mut x = Vec::with_capacity(train_rows.len());
    let mut y = Vec::with_capacity(train_rows.len());
    for &i in &train_rows {
        if let (Some(v), Some(t)) = (table.feature_vector(i, names), table.target(i)) {
            x.push(v);
            y.push(t);
        }
    }

    let mut estimator = factory();
    match estimator.fit(names, &x, &y) {
        Ok(()) => {}
        Err(e @ (ModelError::SingleClass { .. } | ModelError::EmptyTrainingSet)) => {
            return Ok(StepOutcome::Skipped(window, SkipReason::Degenerate(e.to_string())));
        }
        Err(e) => return Err(e),
    }

    let predictions = test_rows
        .iter()
        .map(|&i| predict_row(estimator.as_ref(), table, names, i))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect::<Vec<_>>();

    debug!(
        step = window.step,
        train = x.len(),
        test = predictions.len(),
        "walk-forward step"
    );

    Ok(StepOutcome::Done(
        StepSummary {
            window,
            train_rows: x.len(),
            test_rows: predictions.len(),
            importances: estimator.feature_importances(),
        },
        predictions,
    ))
}

/// Prediction for one clean row. `None` when the row has no realized target.
fn predict_row(
    estimator: &dyn ProbabilityEstimator,
    table: &FeatureTable,
    names: &[String],
    i: usize,
) -> Result<Option<Prediction>, ModelError> {
    let (Some(target), Some(forward_return)) = (table.target(i), table.forward_return(i)) else {
        return Ok(None);
    };
    let prob_up = estimate_probability(estimator, &table.row_subset(i, names))?;
    Ok(Some(Prediction {
        timestamp: table.timestamp(i),
        prob_up,
        target,
        forward_return,
        close: table.close(i),
    }))
}

/// Walk-forward with a fresh regularized logistic model per step.
pub fn walk_forward_predict(
    table: &FeatureTable,
    config: &WalkForwardConfig,
    params: &LinearModelParams,
) -> Result<WalkForwardOutput, ModelError> {
    walk_forward(table, config, || Box::new(LinearModel::new(params.clone())))
}

/// Walk-forward with a fresh linear + heuristic ensemble per step.
pub fn walk_forward_ensemble(
    table: &FeatureTable,
    config: &WalkForwardConfig,
    params: &LinearModelParams,
    weights: &EnsembleWeights,
) -> Result<WalkForwardOutput, ModelError> {
    walk_forward(table, config, || {
        Box::new(Ensemble::linear_heuristic(params.clone(), weights))
    })
}

/// Score every clean row at or after `warmup` with the heuristic scorer.
///
/// The heuristic needs no training, so there are no windows.
pub fn heuristic_predict(table: &FeatureTable, warmup: usize) -> Vec<Prediction> {
    let scorer = HeuristicScorer::new();
    let names = table.model_feature_names();
    let predictions: Vec<Prediction> = table
        .clean_rows(warmup..table.len(), &names)
        .into_iter()
        .filter_map(|i| predict_row(&scorer, table, &names, i).ok().flatten())
        .collect();
    info!(
        rows = table.len(),
        warmup,
        predictions = predictions.len(),
        "heuristic predictions"
    );
    predictions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(train: usize, test: usize) -> WalkForwardConfig {
        WalkForwardConfig {
            train_window: train,
            test_window: test,
            ..WalkForwardConfig::default()
        }
    }

    #[test]
    fn steps_tile_the_series() {
        let steps = plan_steps(1000, &cfg(400, 200));
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[0],
            StepWindow {
                step: 0,
                train_start: 0,
                train_end: 400,
                test_start: 400,
                test_end: 600
            }
        );
        assert_eq!(steps[2].test_end, 1000);
        assert_eq!(steps[1].train_start, 200);
    }

    #[test]
    fn partial_last_window_dropped() {
        let steps = plan_steps(999, &cfg(400, 200));
        assert_eq!(steps.len(), 2);
        assert_eq!(steps.last().unwrap().test_end, 800);
    }

    #[test]
    fn short_series_has_no_steps() {
        assert!(plan_steps(500, &cfg(400, 200)).is_empty());
        assert!(plan_steps(0, &cfg(400, 200)).is_empty());
        assert!(plan_steps(100, &cfg(0, 10)).is_empty());
    }

    #[test]
    fn test_windows_never_overlap_training() {
        for s in plan_steps(5000, &cfg(700, 300)) {
            assert_eq!(s.train_end, s.test_start);
            assert_eq!(s.train_end - s.train_start, 700);
        }
    }

    #[test]
    fn mean_importances_average_across_steps() {
        let step = |a: f64, b: f64| StepSummary {
            window: plan_steps(10, &cfg(5, 5))[0],
            train_rows: 5,
            test_rows: 5,
            importances: Some(vec![
                FeatureImportance {
                    name: "ret_1".into(),
                    importance: a,
                },
                FeatureImportance {
                    name: "rsi".into(),
                    importance: b,
                },
            ]),
        };
        let out = WalkForwardOutput {
            predictions: vec![],
            steps: vec![step(1.0, 0.2), step(3.0, 0.4)],
            skipped: vec![],
        };
        let imp = out.mean_importances();
        assert_eq!(imp[0].name, "ret_1");
        assert!((imp[0].importance - 2.0).abs() < 1e-12);
        assert!((imp[1].importance - 0.3).abs() < 1e-12);
        assert_eq!(out.top_features(1).len(), 1);
    }

    #[test]
    fn empty_output_has_no_importances() {
        assert!(WalkForwardOutput::default().mean_importances().is_empty());
    }
}
