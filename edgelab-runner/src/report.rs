//! Plain-text backtest reports.
//!
//! Sections: overview, performance, probability calibration, edge analysis,
//! trade distribution and key takeaways. A run with no trades stops after
//! the overview. Report generation is pure: the same inputs always render
//! the same text.

use edgelab_core::domain::Prediction;
use edgelab_core::engine::BacktestResult;

use crate::metrics::{
    brier_score, brier_skill, calibration, edge_analysis, PerformanceMetrics,
};

const RULE_WIDTH: usize = 70;
const SECTION_WIDTH: usize = 40;
const CHART_HEIGHT: usize = 20;

/// Full report for one run.
pub fn generate_report(result: &BacktestResult, predictions: &[Prediction]) -> String {
    let m = PerformanceMetrics::compute(result);
    let mut out = String::with_capacity(4096);

    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str(&format!(
        "  BACKTEST REPORT: {} ({} model)\n",
        result.label.symbol, result.label.model
    ));
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');

    section(&mut out, "OVERVIEW");
    out.push_str(&format!("  Starting Bankroll:   ${:.2}\n", result.starting_bankroll));
    out.push_str(&format!("  Ending Bankroll:     ${:.2}\n", m.final_bankroll));
    out.push_str(&format!("  Total Return:        {:+.2}%\n", m.return_pct));
    out.push_str(&format!("  Total PnL:           ${:+.2}\n", m.total_pnl));
    out.push_str(&format!("  Total Trades:        {}\n", m.total_trades));
    out.push_str(&format!("  Skipped Bars:        {}\n", m.skipped));

    if m.total_trades == 0 {
        out.push_str("\n  No trades executed. Edge threshold may be too high.\n");
        // Calibration depends only on the predictions.
        if !predictions.is_empty() {
            write_calibration(&mut out, predictions);
        }
        return out;
    }

    section(&mut out, "PERFORMANCE METRICS");
    out.push_str(&format!("  Win Rate:            {:.1}%\n", m.win_rate * 100.0));
    out.push_str(&format!("  Avg Win:             ${:+.2}\n", m.avg_win));
    out.push_str(&format!("  Avg Loss:            ${:+.2}\n", m.avg_loss));
    out.push_str(&format!("  Profit Factor:       {:.2}\n", m.profit_factor));
    out.push_str(&format!("  Sharpe Ratio:        {:.2}\n", m.sharpe));
    out.push_str(&format!("  Max Drawdown:        {:.1}%\n", m.max_drawdown * 100.0));
    out.push_str(&format!("  Avg Edge:            {:.3}\n", m.avg_edge));

    if !predictions.is_empty() {
        write_calibration(&mut out, predictions);
    }

    if let Some(ea) = edge_analysis(&result.trades) {
        section(&mut out, "EDGE ANALYSIS");
        for (i, q) in ea.quartiles.iter().enumerate() {
            out.push_str(&format!(
                "  Q{}: WR={:.1}%  PnL=${:+.2}  Avg Edge={:.3}  Trades={}\n",
                i + 1,
                q.win_rate * 100.0,
                q.pnl,
                q.avg_edge,
                q.trades
            ));
        }
        if ea.decaying {
            out.push_str("\n  WARNING: Possible edge decay detected\n");
            out.push_str(&format!(
                "    Early WR: {:.1}% -> Late WR: {:.1}%\n",
                ea.early_win_rate * 100.0,
                ea.late_win_rate * 100.0
            ));
        }
    }

    section(&mut out, "TRADE DISTRIBUTION");
    out.push_str(&format!(
        "  UP bets:   {} (WR: {:.1}%)\n",
        m.up.count,
        m.up.win_rate * 100.0
    ));
    out.push_str(&format!(
        "  DOWN bets: {} (WR: {:.1}%)\n",
        m.down.count,
        m.down.win_rate * 100.0
    ));
    let p = m.pnl_percentiles;
    out.push_str("\n  PnL Distribution:\n");
    out.push_str(&format!("    Min:     ${:+.2}\n", p.min));
    out.push_str(&format!("    P25:     ${:+.2}\n", p.p25));
    out.push_str(&format!("    Median:  ${:+.2}\n", p.median));
    out.push_str(&format!("    P75:     ${:+.2}\n", p.p75));
    out.push_str(&format!("    Max:     ${:+.2}\n", p.max));

    section(&mut out, "KEY TAKEAWAYS");
    for line in takeaways(&m) {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }

    out.push('\n');
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    out
}

fn section(out: &mut String, title: &str) {
    let rule = "-".repeat(SECTION_WIDTH);
    out.push_str(&format!("\n{rule}\n  {title}\n{rule}\n"));
}

fn write_calibration(out: &mut String, predictions: &[Prediction]) {
    let buckets = calibration(predictions);
    if buckets.is_empty() {
        return;
    }
    let brier = brier_score(predictions);
    section(out, "PROBABILITY CALIBRATION");
    out.push_str(&format!("  Brier Score:         {brier:.4}\n"));
    out.push_str("  Baseline Brier:      0.2500\n");
    out.push_str(&format!("  Brier Skill Score:   {:.4}\n", brier_skill(predictions)));
    out.push_str("    (>0 = better than coin flip, <0 = worse)\n");

    out.push_str("\n  Calibration Table (predicted vs actual):\n");
    out.push_str(&format!(
        "  {:>12} {:>8} {:>8} {:>8} {:>8}\n",
        "Bucket", "Count", "Pred", "Actual", "Gap"
    ));
    for b in &buckets {
        let label = format!("[{:.2}, {:.2})", b.lower, b.upper);
        out.push_str(&format!(
            "  {:>12} {:>8} {:>8.3} {:>8.3} {:>+8.3}\n",
            label,
            b.count,
            b.mean_predicted,
            b.realized_rate,
            b.gap()
        ));
    }
}

fn takeaways(m: &PerformanceMetrics) -> Vec<&'static str> {
    let sharpe = if m.sharpe > 2.0 {
        "[+] Excellent Sharpe ratio: strong risk-adjusted returns"
    } else if m.sharpe > 1.0 {
        "[+] Good Sharpe ratio: decent risk-adjusted returns"
    } else if m.sharpe > 0.0 {
        "[~] Positive but modest Sharpe: might not survive costs"
    } else {
        "[-] Negative Sharpe: strategy is losing money risk-adjusted"
    };
    let drawdown = if m.max_drawdown > 0.3 {
        "[-] Drawdown >30%: too risky for most allocators"
    } else if m.max_drawdown > 0.15 {
        "[~] Drawdown 15-30%: acceptable but monitor closely"
    } else {
        "[+] Drawdown <15%: well controlled risk"
    };
    let win_rate = if m.win_rate > 0.55 {
        "[+] Win rate >55%: meaningful predictive edge"
    } else if m.win_rate > 0.50 {
        "[~] Win rate 50-55%: edge is thin, execution matters"
    } else {
        "[-] Win rate <50%: need to review signal quality"
    };
    let profit_factor = if m.profit_factor > 1.5 {
        "[+] Profit factor >1.5: wins meaningfully exceed losses"
    } else if m.profit_factor > 1.0 {
        "[~] Profit factor 1-1.5: profitable but slim margin"
    } else {
        "[-] Profit factor <1: losing money on average"
    };
    vec![sharpe, drawdown, win_rate, profit_factor]
}

// ─── Comparison ─────────────────────────────────────────────────────

/// Side-by-side table of several runs, one row per run.
pub fn comparison_table(results: &[&BacktestResult]) -> String {
    let mut out = String::new();
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push_str("\n  STRATEGY COMPARISON\n");
    out.push_str(&"=".repeat(RULE_WIDTH));
    out.push('\n');
    out.push_str(&format!(
        "  {:<24} {:>7} {:>7} {:>10} {:>9} {:>7} {:>7}\n",
        "Run", "Trades", "WR", "Return", "Sharpe", "MaxDD", "PF"
    ));
    out.push_str(&format!("  {}\n", "-".repeat(RULE_WIDTH - 4)));
    for r in results {
        let m = PerformanceMetrics::compute(r);
        let name = format!("{} {}", r.label.symbol, r.label.model);
        out.push_str(&format!(
            "  {:<24} {:>7} {:>6.1}% {:>+9.2}% {:>9.2} {:>6.1}% {:>7.2}\n",
            name,
            m.total_trades,
            m.win_rate * 100.0,
            m.return_pct,
            m.sharpe,
            m.max_drawdown * 100.0,
            m.profit_factor
        ));
    }
    out
}

// ─── Equity chart ───────────────────────────────────────────────────

/// Column chart of the equity curve, at most `width` columns wide.
pub fn equity_curve_ascii(result: &BacktestResult, width: usize) -> String {
    let curve = &result.equity_curve;
    if curve.is_empty() || width == 0 {
        return String::new();
    }
    let min = curve.iter().copied().fold(f64::INFINITY, f64::min);
    let max = curve.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = if max > min { max - min } else { 1.0 };

    let step = (curve.len() / width).max(1);
    let sampled: Vec<f64> = curve.iter().step_by(step).take(width).copied().collect();

    let mut out = format!(
        "\n  Equity Curve ({} - {})\n  {:>10} +\n",
        result.label.symbol,
        result.label.model,
        format!("${max:.0}")
    );
    for row in (0..=CHART_HEIGHT).rev() {
        let threshold = min + (row as f64 / CHART_HEIGHT as f64) * range;
        let label = if row == CHART_HEIGHT / 2 {
            format!("${:.0}", min + 0.5 * range)
        } else {
            String::new()
        };
        let bars: String = sampled
            .iter()
            .map(|&v| if v >= threshold { '#' } else { ' ' })
            .collect();
        out.push_str(&format!("  {label:>10} |{bars}\n"));
    }
    out.push_str(&format!(
        "  {:>10} +{}\n",
        format!("${min:.0}"),
        "-".repeat(sampled.len())
    ));
    out
}
