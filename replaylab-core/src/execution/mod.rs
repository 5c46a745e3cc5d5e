//! Execution simulator: order + market view → fill.
//!
//! Fill rules:
//! - Market orders execute at the current close, adjusted for slippage
//! - Limit orders execute at the limit price when the bar's range contains it
//! - Commission = max(trade value × rate, minimum), rounded to cents
//! - Full volume or nothing; no partial fills

pub mod config;
pub mod costs;
pub mod simulator;
pub mod slippage;
pub mod stats;

pub use config::ExecutionConfig;
pub use costs::TradeCosts;
pub use simulator::ExecutionSimulator;
pub use slippage::{FixedSlippage, NoSlippage, RateSlippage, SlippageConfig, SlippageModel};
pub use stats::{ExecutionStats, OrderRejection};

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("invalid execution config: {0}")]
    InvalidConfig(String),
}
