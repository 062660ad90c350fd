//! EdgeLab CLI — backtest and bet-sizing commands.
//!
//! Commands:
//! - `run` — load minute bars from CSV, run the selected models, print reports
//!   and a comparison table, optionally save artifacts
//! - `kelly` — size a single bet on a binary contract

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use edgelab_core::kelly::{size_bet, KellyParams, SizingReason};
use edgelab_runner::{
    comparison_table, equity_curve_ascii, generate_report, load_bars_csv, run_models,
    save_artifacts, BacktestConfig, ModelKind, RunOutput,
};

/// Width of the ASCII equity chart printed with `--chart`.
const CHART_WIDTH: usize = 60;

#[derive(Parser)]
#[command(
    name = "edgelab",
    about = "EdgeLab CLI — walk-forward backtester for binary up/down markets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest one or more CSV bar files.
    Run {
        /// CSV files with timestamp,open,high,low,close,volume,taker_buy_volume,num_trades.
        #[arg(long = "data", required = true)]
        data: Vec<PathBuf>,

        /// Symbol label. Defaults to each file's stem. Only valid with a single file.
        #[arg(long)]
        symbol: Option<String>,

        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Models to run: heuristic, logistic, ensemble. Defaults to all three.
        #[arg(long, value_delimiter = ',')]
        models: Vec<ModelKind>,

        /// Override the simulation seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Directory to write result bundles into.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print an ASCII equity curve per run.
        #[arg(long, default_value_t = false)]
        chart: bool,
    },
    /// Size a single bet with fractional Kelly.
    Kelly {
        /// Estimated probability that the chosen side wins.
        #[arg(long)]
        prob: f64,

        /// Execution price of one share, in (0, 1).
        #[arg(long)]
        price: f64,

        /// Current bankroll in dollars.
        #[arg(long, default_value_t = 1000.0)]
        bankroll: f64,

        /// Fraction of full Kelly to stake.
        #[arg(long, default_value_t = 0.25)]
        kelly_fraction: f64,

        /// Stake cap as a fraction of bankroll.
        #[arg(long, default_value_t = 0.05)]
        max_position_pct: f64,

        /// Minimum edge (prob − price) required to bet.
        #[arg(long, default_value_t = 0.02)]
        min_edge: f64,

        /// Smallest stake worth placing, in dollars.
        #[arg(long, default_value_t = 0.10)]
        min_bet: f64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            symbol,
            config,
            models,
            seed,
            output_dir,
            chart,
        } => run_backtest_cmd(data, symbol, config, models, seed, output_dir, chart),
        Commands::Kelly {
            prob,
            price,
            bankroll,
            kelly_fraction,
            max_position_pct,
            min_edge,
            min_bet,
        } => {
            let params = KellyParams {
                kelly_fraction,
                max_position_pct,
                min_edge,
                min_bet,
            };
            run_kelly(prob, price, bankroll, &params)
        }
    }
}

fn run_backtest_cmd(
    data: Vec<PathBuf>,
    symbol: Option<String>,
    config_path: Option<PathBuf>,
    models: Vec<ModelKind>,
    seed: Option<u64>,
    output_dir: Option<PathBuf>,
    chart: bool,
) -> Result<()> {
    if symbol.is_some() && data.len() > 1 {
        bail!("--symbol can only be used with a single --data file");
    }

    let mut config = match &config_path {
        Some(path) => BacktestConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BacktestConfig::default(),
    };
    if let Some(seed) = seed {
        config.simulation.seed = seed;
    }

    let kinds: Vec<ModelKind> = if models.is_empty() {
        ModelKind::ALL.to_vec()
    } else {
        dedup_kinds(models)
    };

    let hash = config.config_hash()?;
    info!(config_hash = %&hash[..8], models = kinds.len(), files = data.len(), "starting run");

    let mut outputs: Vec<RunOutput> = Vec::new();
    for path in &data {
        let sym = match &symbol {
            Some(s) => s.clone(),
            None => symbol_from_path(path)?,
        };
        let loaded = load_bars_csv(path, config.simulation.bar_interval_minutes)
            .with_context(|| format!("loading bars from {}", path.display()))?;
        info!(
            symbol = %sym,
            bars = loaded.bars.len(),
            gaps = loaded.gaps.len(),
            missing = loaded.missing_bars(),
            "bars loaded"
        );

        let runs = run_models(&sym, &loaded.bars, &config, &kinds)
            .with_context(|| format!("running models on {sym}"))?;
        if runs.is_empty() {
            eprintln!("{sym}: not enough data to produce any predictions");
        }
        outputs.extend(runs);
    }

    for out in &outputs {
        println!("{}", generate_report(&out.result, &out.predictions));
        if !out.top_features.is_empty() {
            println!("Top features ({}):", out.kind);
            for f in &out.top_features {
                println!("  {:<20} {:.4}", f.name, f.importance);
            }
            println!();
        }
        if chart {
            println!("{}", equity_curve_ascii(&out.result, CHART_WIDTH));
        }
    }

    if outputs.len() > 1 {
        let results: Vec<_> = outputs.iter().map(|o| &o.result).collect();
        println!("{}", comparison_table(&results));
    }

    if let Some(dir) = output_dir {
        for out in &outputs {
            let run_dir = save_artifacts(out, &dir)?;
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }

    Ok(())
}

fn run_kelly(prob: f64, price: f64, bankroll: f64, params: &KellyParams) -> Result<()> {
    let decision = size_bet(prob, price, bankroll, params);

    println!("Probability:   {prob:.4}");
    println!("Price:         {price:.4}");
    println!("Edge:          {:+.4}", decision.edge);
    println!("Full Kelly:    {:.4}", decision.full_kelly);
    println!("Bankroll:      ${bankroll:.2}");

    let verdict = match decision.reason {
        SizingReason::Placed => format!("BET ${:.2}", decision.stake),
        SizingReason::InvalidInputs => "SKIP (invalid inputs)".to_string(),
        SizingReason::NoEdge => "SKIP (no edge)".to_string(),
        SizingReason::BelowMinEdge => {
            format!("SKIP (edge below minimum {:.4})", params.min_edge)
        }
        SizingReason::BelowMinBet => format!("SKIP (stake below ${:.2})", params.min_bet),
    };
    println!("Decision:      {verdict}");

    Ok(())
}

fn symbol_from_path(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a symbol from {}", path.display()))
}

fn dedup_kinds(kinds: Vec<ModelKind>) -> Vec<ModelKind> {
    let mut out = Vec::with_capacity(kinds.len());
    for k in kinds {
        if !out.contains(&k) {
            out.push(k);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn models_parse_comma_separated() {
        let cli = Cli::try_parse_from([
            "edgelab", "run", "--data", "btc.csv", "--models", "heuristic,linear",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { models, .. } => {
                assert_eq!(models, vec![ModelKind::Heuristic, ModelKind::Logistic]);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn unknown_model_rejected() {
        assert!(
            Cli::try_parse_from(["edgelab", "run", "--data", "x.csv", "--models", "forest"])
                .is_err()
        );
    }

    #[test]
    fn symbol_defaults_to_file_stem() {
        let sym = symbol_from_path(Path::new("data/BTCUSDT.csv")).unwrap();
        assert_eq!(sym, "BTCUSDT");
    }

    #[test]
    fn duplicate_models_collapse() {
        let kinds = dedup_kinds(vec![
            ModelKind::Ensemble,
            ModelKind::Heuristic,
            ModelKind::Ensemble,
        ]);
        assert_eq!(kinds, vec![ModelKind::Ensemble, ModelKind::Heuristic]);
    }
}
