//! Backtest runner: wires config, data, kernel and reporting together.
//!
//! Three entry points:
//! - `run_backtest()`: builds the configured bar source, then runs. Used by CLI.
//! - `run_with_source()`: takes any `BarSource`; used by tests and embedders.
//! - `run_batch()`: independent configs in parallel on the rayon pool. Each run
//!   owns its own cursor, portfolio and simulator; nothing is shared.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use replaylab_core::data::{BarSource, CursorError, DataCursor, DataError};
use replaylab_core::domain::FillEvent;
use replaylab_core::engine::{Engine, EngineError, EngineStats, EventRecord, RunResult};
use replaylab_core::execution::{ExecutionError, ExecutionSimulator, ExecutionStats};
use replaylab_core::fingerprint::{dataset_hash, result_hash, Fingerprint};
use replaylab_core::portfolio::{
    Portfolio, PortfolioError, PortfolioSnapshot, PortfolioStats, RejectedSignal,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, info_span, warn};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{build_source, load_series};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("cursor error: {0}")]
    Cursor(#[from] CursorError),
    #[error("portfolio error: {0}")]
    Portfolio(#[from] PortfolioError),
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),
    #[error("backtest failed: {0}")]
    Engine(#[from] EngineError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Headline numbers of one run, straight from the ledgers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub strategy: String,
    pub symbols: Vec<String>,
    pub data_source: String,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub timeline_len: usize,
    pub initial_capital: Decimal,
    pub final_cash: Decimal,
    pub final_equity: Decimal,
    pub net_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub total_commission: Decimal,
    pub final_positions: BTreeMap<String, u64>,
    pub signals: u64,
    pub signals_rejected: u64,
    pub orders: u64,
    pub orders_rejected: u64,
    pub fills: u64,
}

/// Complete, serializable record of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: Fingerprint,
    pub dataset_hash: Fingerprint,
    pub result_hash: Fingerprint,
    pub config: BacktestConfig,
    pub summary: RunSummary,
    pub engine_stats: EngineStats,
    pub portfolio_stats: PortfolioStats,
    pub execution_stats: ExecutionStats,
    pub snapshots: Vec<PortfolioSnapshot>,
    pub fills: Vec<FillEvent>,
    pub rejections: Vec<RejectedSignal>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub event_trace: Vec<EventRecord>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run one backtest with the bar source named in the config.
pub fn run_backtest(config: &BacktestConfig) -> Result<BacktestReport, RunError> {
    let source = build_source(&config.data);
    run_with_source(config, source.as_ref())
}

/// Run one backtest against an explicit bar source.
pub fn run_with_source(
    config: &BacktestConfig,
    source: &dyn BarSource,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let span = info_span!("run", run = run_id.short());
    let _guard = span.enter();

    let range = config.date_range()?;
    let series = load_series(source, &config.backtest.symbols, &range)?;
    let dataset_hash = dataset_hash(&series)?;

    let cursor = DataCursor::new(series, range)?;
    let strategy = config.strategy.build().map_err(ConfigError::from)?;
    let portfolio = Portfolio::new(config.portfolio.clone())?;
    let execution = ExecutionSimulator::new(config.execution.clone())?;

    info!(
        strategy = strategy.name(),
        symbols = config.backtest.symbols.len(),
        source = source.name(),
        dataset = dataset_hash.short(),
        "running backtest"
    );

    let result = Engine::new(cursor, strategy, portfolio, execution)
        .with_event_trace(config.backtest.event_trace)
        .run_to_completion()?;
    let result_hash = result_hash(&result)?;

    if result.fills.is_empty() {
        warn!("run produced no fills");
    }
    info!(
        final_equity = %result.final_equity,
        net_pnl = %result.net_pnl(),
        fills = result.fills.len(),
        "backtest complete"
    );

    Ok(build_report(config, source.name(), run_id, dataset_hash, result_hash, result))
}

fn build_report(
    config: &BacktestConfig,
    source: &str,
    run_id: Fingerprint,
    dataset_hash: Fingerprint,
    result_hash: Fingerprint,
    result: RunResult,
) -> BacktestReport {
    let summary = RunSummary {
        strategy: result.strategy.clone(),
        symbols: config.backtest.symbols.clone(),
        data_source: source.to_string(),
        start: result.start,
        end: result.end,
        timeline_len: result.timeline_len,
        initial_capital: result.initial_capital,
        final_cash: result.final_cash,
        final_equity: result.final_equity,
        net_pnl: result.net_pnl(),
        realized_pnl: result.portfolio_stats.realized_pnl,
        total_commission: result.portfolio_stats.total_commission,
        final_positions: result.final_positions.clone(),
        signals: result.portfolio_stats.signals_processed,
        signals_rejected: result.portfolio_stats.signals_rejected,
        orders: result.execution_stats.orders_received,
        orders_rejected: result.execution_stats.orders_rejected,
        fills: result.fills.len() as u64,
    };

    BacktestReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        dataset_hash,
        result_hash,
        config: config.clone(),
        summary,
        engine_stats: result.engine_stats,
        portfolio_stats: result.portfolio_stats,
        execution_stats: result.execution_stats,
        snapshots: result.snapshots,
        fills: result.fills,
        rejections: result.rejections,
        event_trace: result.event_trace,
    }
}

/// Run many configs in parallel. Results are returned in input order; one
/// failing run does not stop the others.
pub fn run_batch(configs: &[BacktestConfig]) -> Vec<Result<BacktestReport, RunError>> {
    info!(runs = configs.len(), "starting batch");
    configs.par_iter().map(run_backtest).collect()
}
