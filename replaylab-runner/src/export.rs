//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides the artifact set for a finished run:
//! - **JSON**: the full `BacktestReport`, with schema versioning
//! - **CSV**: equity snapshots, fill tape and rejected signals
//! - **Markdown**: a human-readable run summary
//!
//! Persisted reports carry a `schema_version`. Newer versions are rejected on
//! load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use replaylab_core::domain::FillEvent;
use replaylab_core::portfolio::{PortfolioSnapshot, RejectedSignal};
use tracing::info;

use crate::runner::{BacktestReport, SCHEMA_VERSION};

pub const REPORT_JSON: &str = "report.json";
pub const REPORT_MD: &str = "report.md";
pub const EQUITY_CSV: &str = "equity.csv";
pub const FILLS_CSV: &str = "fills.csv";
pub const REJECTIONS_CSV: &str = "rejections.csv";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a report to pretty JSON.
pub fn export_json(report: &BacktestReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize BacktestReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
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

/// One row per snapshot.
///
/// Columns: timestamp, cash, total_equity, positions (`SYM:VOL;SYM:VOL`)
pub fn export_equity_csv(snapshots: &[PortfolioSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "cash", "total_equity", "positions"])?;
    for snap in snapshots {
        let positions = snap
            .positions
            .iter()
            .map(|(symbol, volume)| format!("{symbol}:{volume}"))
            .collect::<Vec<_>>()
            .join(";");
        wtr.write_record([
            &snap.timestamp.to_string(),
            &snap.cash.to_string(),
            &snap.total_equity.to_string(),
            &positions,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Fill tape.
///
/// Columns: timestamp, symbol, direction, volume, price, trade_value,
/// commission, cash_delta
pub fn export_fills_csv(fills: &[FillEvent]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "symbol",
        "direction",
        "volume",
        "price",
        "trade_value",
        "commission",
        "cash_delta",
    ])?;
    for f in fills {
        wtr.write_record([
            &f.timestamp.to_string(),
            &f.symbol,
            &f.direction.to_string(),
            &f.volume.to_string(),
            &f.price.to_string(),
            &f.trade_value().to_string(),
            &f.commission.to_string(),
            &f.cash_delta().to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Signals the portfolio declined.
///
/// Columns: timestamp, symbol, direction, reason
pub fn export_rejections_csv(rejections: &[RejectedSignal]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "symbol", "direction", "reason"])?;
    for r in rejections {
        wtr.write_record([
            &r.timestamp.to_string(),
            &r.symbol,
            &r.direction.to_string(),
            &r.reason.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Markdown report ────────────────────────────────────────────────

/// Markdown summary of a single run.
pub fn generate_report(report: &BacktestReport) -> String {
    let s = &report.summary;
    let mut md = String::with_capacity(2048);

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Run | {} |\n", report.run_id.short()));
    md.push_str(&format!("| Strategy | {} |\n", s.strategy));
    md.push_str(&format!("| Instruments | {} |\n", s.symbols.join(", ")));
    md.push_str(&format!("| Data | {} |\n", s.data_source));
    let period = match (s.start, s.end) {
        (Some(start), Some(end)) => format!("{start} to {end}"),
        _ => "(empty)".to_string(),
    };
    md.push_str(&format!("| Period | {period} |\n"));
    md.push_str(&format!("| Ticks | {} |\n", s.timeline_len));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash.short()));
    md.push_str(&format!("| Result Hash | {} |\n", report.result_hash.short()));
    md.push('\n');

    md.push_str("## Capital\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Initial Capital | {} |\n", s.initial_capital));
    md.push_str(&format!("| Final Cash | {} |\n", s.final_cash));
    md.push_str(&format!("| Final Equity | {} |\n", s.final_equity));
    md.push_str(&format!("| Net P&L | {} |\n", s.net_pnl));
    md.push_str(&format!("| Realized P&L | {} |\n", s.realized_pnl));
    md.push_str(&format!("| Commission | {} |\n", s.total_commission));
    md.push('\n');

    md.push_str("## Activity\n\n");
    md.push_str("| Stage | Count |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Market events | {} |\n", report.engine_stats.market_events));
    md.push_str(&format!("| Signals | {} |\n", s.signals));
    md.push_str(&format!("| Signals rejected | {} |\n", s.signals_rejected));
    md.push_str(&format!("| Orders | {} |\n", s.orders));
    md.push_str(&format!("| Orders rejected | {} |\n", s.orders_rejected));
    md.push_str(&format!("| Fills | {} |\n", s.fills));
    md.push('\n');

    if !report.execution_stats.rejections.is_empty() {
        md.push_str("### Execution rejections\n\n");
        for (reason, count) in &report.execution_stats.rejections {
            md.push_str(&format!("- {reason}: {count}\n"));
        }
        md.push('\n');
    }

    md.push_str("## Open Positions\n\n");
    if s.final_positions.is_empty() {
        md.push_str("None.\n");
    } else {
        md.push_str("| Symbol | Volume |\n");
        md.push_str("| --- | --- |\n");
        for (symbol, volume) in &s.final_positions {
            md.push_str(&format!("| {symbol} | {volume} |\n"));
        }
    }

    md
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates `{output_dir}/{run_id_short}/` containing:
/// - `report.json`: the full `BacktestReport`
/// - `report.md`: Markdown summary
/// - `equity.csv`: per-event portfolio snapshots
/// - `fills.csv`: fill tape
/// - `rejections.csv`: declined signals
///
/// The directory name is content-addressed, so re-running an identical
/// config overwrites the same directory. Returns its path.
pub fn save_artifacts(report: &BacktestReport, output_dir: &Path) -> Result<PathBuf> {
    let run_dir = output_dir.join(report.run_id.short());
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    write(&run_dir.join(REPORT_JSON), &export_json(report)?)?;
    write(&run_dir.join(REPORT_MD), &generate_report(report))?;
    write(&run_dir.join(EQUITY_CSV), &export_equity_csv(&report.snapshots)?)?;
    write(&run_dir.join(FILLS_CSV), &export_fills_csv(&report.fills)?)?;
    write(
        &run_dir.join(REJECTIONS_CSV),
        &export_rejections_csv(&report.rejections)?,
    )?;

    info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

fn write(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

/// Load a report from an artifact directory's `report.json`.
pub fn load_artifacts(dir: &Path) -> Result<BacktestReport> {
    let path = dir.join(REPORT_JSON);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
