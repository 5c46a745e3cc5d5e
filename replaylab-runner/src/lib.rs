//! ReplayLab Runner: backtest orchestration on top of `replaylab-core`.
//!
//! This crate builds on the kernel to provide:
//! - TOML run configuration with validation and a content-addressed run id
//! - Bar sources: CSV directories and a seeded synthetic generator
//! - Single and batch (parallel) backtest runs
//! - Artifact export: JSON report, CSV ledgers, Markdown summary

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{BacktestConfig, BacktestSection, ConfigError, DataConfig, StrategyConfig};
pub use data_loader::{build_source, load_series, CsvBarSource, SyntheticSource};
pub use export::{generate_report, load_artifacts, save_artifacts};
pub use runner::{
    run_backtest, run_batch, run_with_source, BacktestReport, RunError, RunSummary,
    SCHEMA_VERSION,
};
