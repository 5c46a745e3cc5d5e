//! ReplayLab Core: event-driven backtest kernel.
//!
//! This crate contains the heart of the replay engine:
//! - Record model (bars and the Market/Signal/Order/Fill events)
//! - Time-aligned multi-instrument data cursor with a look-ahead-free view
//! - Portfolio accounting with risk gating and lot-based sizing
//! - Execution simulator with slippage and minimum-commission rules
//! - Single-queue event dispatcher
//! - Strategy trait and example strategies

pub mod data;
pub mod domain;
pub mod engine;
pub mod execution;
pub mod fingerprint;
pub mod portfolio;
pub mod strategy;

pub use data::{BarSource, DataCursor, DataView, DateRange};
pub use domain::{Bar, Direction, Event, FillEvent, MarketEvent, OrderEvent, OrderType, SignalEvent};
pub use engine::{Engine, EngineError, EngineState, RunResult};
pub use execution::{ExecutionConfig, ExecutionSimulator};
pub use portfolio::{Portfolio, PortfolioConfig};
pub use strategy::{Strategy, StrategyError};
