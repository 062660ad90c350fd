//! EdgeLab Runner — walk-forward validation, orchestration, metrics, reports.
//!
//! This crate builds on `edgelab-core` to provide:
//! - CSV bar loading with gap detection
//! - TOML configuration with validation and content hashing
//! - Walk-forward validation with a fresh estimator per step
//! - Pipeline runner for heuristic, logistic and ensemble streams
//! - Performance metrics, calibration and edge-decay analysis
//! - Text reports and CSV/JSON artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod report;
pub mod runner;
pub mod walk_forward;

pub use config::{BacktestConfig, ConfigError, ModelConfig};
pub use data_loader::{load_bars_csv, read_bars, Gap, LoadError, LoadedBars};
pub use export::{save_artifacts, RunArtifact, SCHEMA_VERSION};
pub use metrics::PerformanceMetrics;
pub use report::{comparison_table, equity_curve_ascii, generate_report};
pub use runner::{run_models, run_on_table, run_pipeline, ModelKind, RunError, RunOutput};
pub use walk_forward::{
    heuristic_predict, walk_forward, walk_forward_ensemble, walk_forward_predict,
    WalkForwardConfig, WalkForwardOutput,
};
