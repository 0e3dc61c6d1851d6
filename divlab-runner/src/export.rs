//! Reporting and export — CSV tables and JSON reports.
//!
//! Provides two export formats:
//! - **CSV**: trade log, sweep table and capital curve
//! - **JSON**: the full optimization report with schema versioning
//!
//! Percentages are rounded to 2 dp and dividends to 3 dp on export only;
//! every in-memory value stays unrounded.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use divlab_core::domain::Trade;
use divlab_core::equity::EquityCurve;

use crate::report::round_dp;
use crate::runner::SCHEMA_VERSION;
use crate::sweep::{OptimizationReport, SweepResult};

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_json(report: &OptimizationReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize OptimizationReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<OptimizationReport> {
    let report: OptimizationReport =
        serde_json::from_str(json).context("failed to deserialize OptimizationReport from JSON")?;
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

/// Columns: Ticker, Buy Date, Sell Date, Dividend, Price Return %, Total Return %
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Ticker",
        "Buy Date",
        "Sell Date",
        "Dividend",
        "Price Return %",
        "Total Return %",
    ])?;

    for t in trades {
        wtr.write_record([
            t.ticker.clone(),
            t.entry_date.to_string(),
            t.exit_date.to_string(),
            round_dp(t.dividend, 3).to_string(),
            round_dp(t.price_return * 100.0, 2).to_string(),
            round_dp(t.total_return * 100.0, 2).to_string(),
        ])?;
    }

    finish(wtr)
}

/// Columns: Buy Days, Sell Days, Trades, Total Return %
pub fn export_sweep_csv(results: &[SweepResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Buy Days", "Sell Days", "Trades", "Total Return %"])?;
    for r in results {
        wtr.write_record([
            r.params.buy_offset_days().to_string(),
            r.params.sell_offset_days().to_string(),
            r.trade_count.to_string(),
            round_dp(r.total_return * 100.0, 2).to_string(),
        ])?;
    }
    finish(wtr)
}

/// Columns: Date, Multiplier, Capital
pub fn export_equity_csv(curve: &EquityCurve, starting_capital: f64) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Date", "Multiplier", "Capital"])?;
    for p in &curve.points {
        wtr.write_record([
            p.date.to_string(),
            format!("{:.6}", p.multiplier),
            format!("{:.2}", starting_capital * p.multiplier),
        ])?;
    }
    finish(wtr)
}

/// Same columns as [`export_equity_csv`], from a `(date, capital)` series.
pub fn export_capital_csv(points: &[(NaiveDate, f64)], starting_capital: f64) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Date", "Multiplier", "Capital"])?;
    for (date, capital) in points {
        wtr.write_record([
            date.to_string(),
            format!("{:.6}", capital / starting_capital),
            format!("{:.2}", capital),
        ])?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the artifact set for an optimization run.
///
/// Creates `optimize_{timestamp}/` under `output_dir` containing:
/// - `report.json` — the full `OptimizationReport`
/// - `sweep.csv` — every scored pair in grid order
/// - `trades.csv` — the best pair's trade log
/// - `equity.csv` — the best pair's capital curve
///
/// Returns the path to the created directory.
pub fn save_artifacts(report: &OptimizationReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("optimize_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.json"), export_json(report)?)?;
    std::fs::write(run_dir.join("sweep.csv"), export_sweep_csv(&report.sweep)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&report.best_trades)?)?;

    let equity = export_capital_csv(&report.capital_curve, report.stats.starting_capital)?;
    std::fs::write(run_dir.join("equity.csv"), equity)?;

    Ok(run_dir)
}

/// Load a report from an artifact directory's report.json.
pub fn load_artifacts(dir: &Path) -> Result<OptimizationReport> {
    let path = dir.join("report.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

/// Write a single CSV string to `path`, creating parent directories.
pub fn write_csv(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}
