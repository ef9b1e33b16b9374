//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest reports:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade tape, portfolio series, order-level history and
//!   per-bar transactions
//! - **Markdown**: human-readable single-run summary
//!
//! Persisted reports include a `schema_version` field. Newer versions than
//! this build understands are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tradelab_core::domain::TradeValuation;
use tradelab_core::engine::PortfolioPoint;
use tradelab_core::history::History;
use tradelab_core::transaction::Transaction;

use crate::runner::{BacktestReport, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestReport` to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a `BacktestReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestReport> {
    let report: BacktestReport =
        serde_json::from_str(json).context("failed to deserialize BacktestReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export per-trade valuations as CSV, one row per trade.
///
/// Columns: trade_index, open, close, exit_reason, status, legs, pnl, cost,
/// net_pnl, mae, mfe, bars_held
pub fn export_trades_csv(valuations: &[TradeValuation]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "trade_index",
        "open",
        "close",
        "exit_reason",
        "status",
        "legs",
        "pnl",
        "cost",
        "net_pnl",
        "mae",
        "mfe",
        "bars_held",
    ])?;

    for v in valuations {
        let legs = v
            .legs
            .iter()
            .map(|l| format!("{}:{}", l.asset, l.quantity))
            .collect::<Vec<_>>()
            .join(";");
        wtr.write_record::<[&str; 12], &str>([
            &v.trade_index.to_string(),
            &v.open.to_string(),
            &v.close.to_string(),
            v.exit_reason.as_str(),
            if v.is_closed() { "realized" } else { "unrealized" },
            &legs,
            &format!("{:.6}", v.pnl.value()),
            &format!("{:.6}", v.cost),
            &format!("{:.6}", v.net_pnl()),
            &format!("{:.6}", v.mae),
            &format!("{:.6}", v.mfe),
            &v.bars_held.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the portfolio series as CSV.
pub fn export_portfolio_csv(portfolio: &[PortfolioPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "value",
        "wealth",
        "net_exposure",
        "gross_exposure",
        "open_trades",
    ])?;
    for p in portfolio {
        wtr.write_record([
            &p.timestamp.to_string(),
            &format!("{:.6}", p.value),
            &format!("{:.6}", p.wealth),
            &format!("{:.6}", p.net_exposure),
            &format!("{:.6}", p.gross_exposure),
            &p.open_trades.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the order-level history, one row per trade leg.
pub fn export_history_csv(history: &History) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in &history.rows {
        wtr.serialize(row).context("failed to write history row")?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export net lots traded per (timestamp, asset).
pub fn export_transaction_csv(transaction: &Transaction) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in &transaction.rows {
        wtr.serialize(row).context("failed to write transaction row")?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates a directory named `{strategy}_{run_id prefix}/` under
/// `output_dir` containing:
/// - `report.json`: the full `BacktestReport`
/// - `trades.csv`: one row per valued trade
/// - `portfolio.csv`: portfolio, wealth and exposure series
/// - `history.csv`: one row per trade leg
/// - `transaction.csv`: net lot traded per timestamp and asset
/// - `summary.md`: Markdown summary
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = report.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("{}_{}", report.strategy, short_id));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let history = History::from_result(&report.result);
    let transaction = Transaction::from_result(&report.result);
    let files = [
        ("report.json", export_json(report)?),
        ("trades.csv", export_trades_csv(&report.result.valuations)?),
        ("portfolio.csv", export_portfolio_csv(&report.result.portfolio)?),
        ("history.csv", export_history_csv(&history)?),
        ("transaction.csv", export_transaction_csv(&transaction)?),
        ("summary.md", generate_report(report)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Load a `BacktestReport` from an artifact directory's report.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let report_path = dir.join("report.json");
    let json = std::fs::read_to_string(&report_path)
        .with_context(|| format!("failed to read {}", report_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a single run.
pub fn generate_report(report: &BacktestReport) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run ID | {} |\n", report.run_id));
    md.push_str(&format!("| Strategy | {} |\n", report.strategy));
    md.push_str(&format!("| Cost Model | {} |\n", report.cost_model));
    md.push_str(&format!("| Period | {} to {} |\n", report.start, report.end));
    md.push_str(&format!(
        "| Universe | {} assets x {} timestamps |\n",
        report.n_assets, report.n_timestamps
    ));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    if report.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    let s = &report.result.summary;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Total Return | {:.4} |\n", s.total_return));
    md.push_str(&format!("| Total P&L | {:.4} |\n", s.total_pnl));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate * 100.0));
    md.push_str(&format!("| Max Trade Loss | {:.4} |\n", s.max_trade_loss));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", s.profit_factor));
    md.push_str(&format!("| Max Drawdown | {:.4} |\n", s.max_drawdown));
    md.push_str(&format!(
        "| Trades | {} ({} closed, {} open) |\n",
        s.trade_count, s.closed_count, s.open_count
    ));
    md.push_str(&format!("| Avg Bars Held | {:.1} |\n", s.avg_bars_held));
    md.push('\n');

    if !report.result.failures.is_empty() {
        md.push_str(&format!(
            "## Rejected Trades ({})\n\n",
            report.result.failures.len()
        ));
        for f in &report.result.failures {
            md.push_str(&format!("- trade {}: {}\n", f.trade_index, f.error));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CostConfig, DataConfig, EngineSettings, OutputConfig, RunConfig, StrategyConfig,
    };
    use crate::runner::run_from_config;
    use tradelab_core::data::RandomWalkParams;

    fn report() -> BacktestReport {
        run_from_config(&RunConfig {
            data: DataConfig::RandomWalk(RandomWalkParams {
                n_bars: 40,
                n_assets: 2,
                ..RandomWalkParams::default()
            }),
            strategy: StrategyConfig::Random {
                n_trades: 10,
                max_holding: 5,
                lot: 1.0,
                allow_short: true,
                seed: 9,
            },
            engine: EngineSettings::default(),
            cost: CostConfig::Proportional { commission_bps: 1.0 },
            output: OutputConfig::default(),
        })
        .unwrap()
    }

    #[test]
    fn json_round_trip() {
        let r = report();
        let json = export_json(&r).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, r.run_id);
        assert_eq!(back.config, r.config);
        assert_eq!(back.result.valuations.len(), r.result.valuations.len());
        assert_eq!(back.result.failures, r.result.failures);
        assert!((back.result.summary.total_pnl - r.result.summary.total_pnl).abs() < 1e-9);
    }

    #[test]
    fn newer_schema_is_rejected() {
        let mut r = report();
        r.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&r).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn trades_csv_has_one_row_per_valuation() {
        let r = report();
        let csv = export_trades_csv(&r.result.valuations).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + r.result.valuations.len());
        assert!(lines[0].starts_with("trade_index,open,close,exit_reason"));
    }

    #[test]
    fn history_csv_header_from_serde() {
        let r = report();
        let csv = export_history_csv(&History::from_result(&r.result)).unwrap();
        let header = csv.lines().next().unwrap();
        assert!(header.starts_with("trade_index,order_index,asset,lot"));
        assert!(header.ends_with("exit_reason,realized"));
    }

    #[test]
    fn transaction_csv_rows_sorted_by_time() {
        let r = report();
        let tx = Transaction::from_result(&r.result);
        assert!(!tx.is_empty());
        let csv = export_transaction_csv(&tx).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("timestamp,asset,lot"));
        let stamps: Vec<i64> = lines
            .map(|l| l.split(',').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(stamps.len(), tx.len());
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn markdown_names_strategy_and_cost() {
        let md = generate_report(&report());
        assert!(md.contains("| Strategy | random_trader |"));
        assert!(md.contains("| Cost Model | bps |"));
        assert!(md.contains("**SYNTHETIC**"));
    }
}
