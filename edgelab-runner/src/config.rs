//! Serializable backtest configuration.
//!
//! Every section is optional in the TOML file; missing sections and fields
//! take their defaults, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use edgelab_core::engine::SimulationConfig;
use edgelab_core::features::FeatureConfig;
use edgelab_core::kelly::KellyParams;
use edgelab_core::models::{EnsembleWeights, LinearModelParams};

use crate::walk_forward::WalkForwardConfig;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Model hyperparameters shared by the logistic and ensemble runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub linear: LinearModelParams,
    pub ensemble: EnsembleWeights,
}

/// Complete configuration for a backtest session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub features: FeatureConfig,
    pub model: ModelConfig,
    pub walk_forward: WalkForwardConfig,
    pub sizing: KellyParams,
    pub simulation: SimulationConfig,
}

impl BacktestConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject knobs the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.sizing;
        unit_interval("sizing.kelly_fraction", s.kelly_fraction)?;
        unit_interval("sizing.max_position_pct", s.max_position_pct)?;
        non_negative("sizing.min_edge", s.min_edge)?;
        non_negative("sizing.min_bet", s.min_bet)?;

        let sim = &self.simulation;
        if !(sim.starting_bankroll.is_finite() && sim.starting_bankroll > 0.0) {
            return Err(invalid("simulation.starting_bankroll", "must be positive"));
        }
        non_negative("simulation.slippage", sim.slippage)?;
        non_negative("simulation.market_noise", sim.market_noise)?;
        if !(0.0 < sim.price_floor && sim.price_floor <= sim.price_cap && sim.price_cap < 1.0) {
            return Err(invalid(
                "simulation.price_floor",
                format!(
                    "need 0 < floor <= cap < 1, got floor {} and cap {}",
                    sim.price_floor, sim.price_cap
                ),
            ));
        }
        if sim.horizon == 0 {
            return Err(invalid("simulation.horizon", "must be at least 1"));
        }
        if !(sim.bar_interval_minutes.is_finite() && sim.bar_interval_minutes > 0.0) {
            return Err(invalid("simulation.bar_interval_minutes", "must be positive"));
        }

        let f = &self.features;
        if f.horizon == 0 {
            return Err(invalid("features.horizon", "must be at least 1"));
        }
        if f.horizon != sim.horizon {
            return Err(invalid(
                "features.horizon",
                format!(
                    "target horizon {} differs from simulation horizon {}",
                    f.horizon, sim.horizon
                ),
            ));
        }
        if f.bar_interval_minutes != sim.bar_interval_minutes {
            return Err(invalid(
                "features.bar_interval_minutes",
                "must match simulation.bar_interval_minutes",
            ));
        }
        if f.momentum_windows.contains(&0) {
            return Err(invalid("features.momentum_windows", "window lengths must be at least 1"));
        }
        if f.vol_windows.contains(&0) {
            return Err(invalid("features.vol_windows", "window lengths must be at least 1"));
        }
        at_least_one("features.macd_fast", f.macd_fast)?;
        at_least_one("features.macd_slow", f.macd_slow)?;
        at_least_one("features.macd_signal", f.macd_signal)?;
        at_least_one("features.rsi_period", f.rsi_period)?;
        at_least_one("features.bb_period", f.bb_period)?;
        at_least_one("features.vwap_period", f.vwap_period)?;
        at_least_one("features.atr_period", f.atr_period)?;
        at_least_one("features.volume_ma_period", f.volume_ma_period)?;
        at_least_one("features.obv_slope_window", f.obv_slope_window)?;
        at_least_one("features.vw_momentum_window", f.vw_momentum_window)?;
        if !(f.bb_std.is_finite() && f.bb_std > 0.0) {
            return Err(invalid("features.bb_std", format!("must be positive, got {}", f.bb_std)));
        }

        let wf = &self.walk_forward;
        if wf.train_window == 0 || wf.test_window == 0 {
            return Err(invalid("walk_forward", "train and test windows must be at least 1"));
        }

        let m = &self.model;
        if !(m.linear.c.is_finite() && m.linear.c > 0.0) {
            return Err(invalid("model.linear.c", "must be positive"));
        }
        if !(m.linear.tol.is_finite() && m.linear.tol > 0.0) {
            return Err(invalid("model.linear.tol", "must be positive"));
        }
        non_negative("model.ensemble.linear", m.ensemble.linear)?;
        non_negative("model.ensemble.heuristic", m.ensemble.heuristic)?;
        if m.ensemble.linear + m.ensemble.heuristic <= 0.0 {
            return Err(invalid("model.ensemble", "weights must not all be zero"));
        }
        Ok(())
    }

    /// BLAKE3 digest of the canonical JSON form. Identical configs share a hash.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Fractions must lie in (0, 1].
fn unit_interval(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v > 0.0 && v <= 1.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be in (0, 1], got {v}")))
    }
}

fn at_least_one(field: &'static str, v: usize) -> Result<(), ConfigError> {
    if v >= 1 {
        Ok(())
    } else {
        Err(invalid(field, "must be at least 1"))
    }
}

fn non_negative(field: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be non-negative, got {v}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = BacktestConfig::from_toml("").unwrap();
        assert_eq!(cfg, BacktestConfig::default());
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.sizing.kelly_fraction, 0.25);
        assert_eq!(cfg.walk_forward.train_window, 10_080);
    }

    #[test]
    fn partial_sections_override_fields() {
        let cfg = BacktestConfig::from_toml(
            r#"
            [sizing]
            kelly_fraction = 0.5

            [model.linear]
            c = 1.0

            [simulation]
            seed = 7
            "#,
        )
        .unwrap();
        assert_eq!(cfg.sizing.kelly_fraction, 0.5);
        assert_eq!(cfg.sizing.max_position_pct, 0.05);
        assert_eq!(cfg.model.linear.c, 1.0);
        assert_eq!(cfg.model.ensemble.linear, 0.7);
        assert_eq!(cfg.simulation.seed, 7);
    }

    #[test]
    fn toml_roundtrip() {
        let cfg = BacktestConfig::default();
        let s = cfg.to_toml().unwrap();
        assert_eq!(BacktestConfig::from_toml(&s).unwrap(), cfg);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let err = BacktestConfig::from_toml("[sizing\nkelly_fraction = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_fraction_rejected() {
        let mut cfg = BacktestConfig::default();
        cfg.sizing.kelly_fraction = 1.5;
        match cfg.validate() {
            Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, "sizing.kelly_fraction"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_horizons_rejected() {
        let mut cfg = BacktestConfig::default();
        cfg.simulation.horizon = 10;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { field: "features.horizon", .. })
        ));
    }

    #[test]
    fn zero_horizon_and_bankroll_rejected() {
        let mut cfg = BacktestConfig::default();
        cfg.simulation.starting_bankroll = -5.0;
        assert!(cfg.validate().is_err());

        let mut cfg = BacktestConfig::default();
        cfg.features.horizon = 0;
        cfg.simulation.horizon = 0;
        assert!(cfg.validate().is_err());
    }

    fn rejected_field(cfg: &BacktestConfig) -> &'static str {
        match cfg.validate() {
            Err(ConfigError::Invalid { field, .. }) => field,
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn zero_feature_windows_rejected() {
        let cases: [(&str, fn(&mut FeatureConfig)); 12] = [
            ("features.momentum_windows", |f| f.momentum_windows = vec![1, 0]),
            ("features.vol_windows", |f| f.vol_windows = vec![0, 60]),
            ("features.macd_fast", |f| f.macd_fast = 0),
            ("features.macd_slow", |f| f.macd_slow = 0),
            ("features.macd_signal", |f| f.macd_signal = 0),
            ("features.rsi_period", |f| f.rsi_period = 0),
            ("features.bb_period", |f| f.bb_period = 0),
            ("features.vwap_period", |f| f.vwap_period = 0),
            ("features.atr_period", |f| f.atr_period = 0),
            ("features.volume_ma_period", |f| f.volume_ma_period = 0),
            ("features.obv_slope_window", |f| f.obv_slope_window = 0),
            ("features.vw_momentum_window", |f| f.vw_momentum_window = 0),
        ];
        for (expected, mutate) in cases {
            let mut cfg = BacktestConfig::default();
            mutate(&mut cfg.features);
            assert_eq!(rejected_field(&cfg), expected);
        }
    }

    #[test]
    fn zero_rsi_period_from_toml_rejected() {
        let cfg = BacktestConfig::from_toml("[features]\nrsi_period = 0\n").unwrap();
        assert_eq!(rejected_field(&cfg), "features.rsi_period");
    }

    #[test]
    fn bad_band_width_rejected() {
        for width in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut cfg = BacktestConfig::default();
            cfg.features.bb_std = width;
            assert_eq!(rejected_field(&cfg), "features.bb_std", "bb_std {width}");
        }
    }

    #[test]
    fn non_finite_ensemble_weights_rejected() {
        for w in [f64::NAN, f64::INFINITY, -0.1] {
            let mut cfg = BacktestConfig::default();
            cfg.model.ensemble.linear = w;
            assert_eq!(rejected_field(&cfg), "model.ensemble.linear", "weight {w}");

            let mut cfg = BacktestConfig::default();
            cfg.model.ensemble.heuristic = w;
            assert_eq!(rejected_field(&cfg), "model.ensemble.heuristic", "weight {w}");
        }
    }

    #[test]
    fn all_zero_ensemble_weights_rejected() {
        let mut cfg = BacktestConfig::default();
        cfg.model.ensemble.linear = 0.0;
        cfg.model.ensemble.heuristic = 0.0;
        assert_eq!(rejected_field(&cfg), "model.ensemble");
    }

    #[test]
    fn bad_linear_params_rejected() {
        let mut cfg = BacktestConfig::default();
        cfg.model.linear.c = f64::NAN;
        assert_eq!(rejected_field(&cfg), "model.linear.c");

        let mut cfg = BacktestConfig::default();
        cfg.model.linear.tol = 0.0;
        assert_eq!(rejected_field(&cfg), "model.linear.tol");
    }

    #[test]
    fn config_hash_deterministic_and_sensitive() {
        let a = BacktestConfig::default();
        let b = BacktestConfig::default();
        assert_eq!(a.config_hash().unwrap(), b.config_hash().unwrap());
        assert_eq!(a.config_hash().unwrap().len(), 64);

        let mut c = BacktestConfig::default();
        c.simulation.seed = 43;
        assert_ne!(a.config_hash().unwrap(), c.config_hash().unwrap());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = BacktestConfig::load(Path::new("/nonexistent/edgelab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
