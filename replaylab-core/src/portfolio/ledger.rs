//! Append-only records the portfolio keeps for reporting.

use crate::domain::Direction;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Portfolio state recorded after each Market event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub timestamp: NaiveDateTime,
    pub cash: Decimal,
    pub total_equity: Decimal,
    /// Volume held per instrument.
    pub positions: BTreeMap<String, u64>,
}

/// Why a signal did not become an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectionReason {
    NoPrice,
    CashFloor,
    AlreadyHolding,
    NoPosition,
    ZeroVolume,
    BelowMinTradeValue,
    OrderPending,
    /// Even one lot would cost more than the cash available.
    InsufficientCash,
    /// Volatility sizing needs more bars than the instrument has.
    InsufficientHistory,
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::NoPrice => write!(f, "no known price"),
            RejectionReason::CashFloor => write!(f, "cash ratio below floor"),
            RejectionReason::AlreadyHolding => write!(f, "position already open"),
            RejectionReason::NoPosition => write!(f, "no position to close"),
            RejectionReason::ZeroVolume => write!(f, "sized to zero lots"),
            RejectionReason::BelowMinTradeValue => write!(f, "below minimum trade value"),
            RejectionReason::OrderPending => write!(f, "order already in flight"),
            RejectionReason::InsufficientCash => write!(f, "cash does not cover fill cost"),
            RejectionReason::InsufficientHistory => write!(f, "not enough bars to size"),
        }
    }
}

/// An order issued but not yet filled or refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
    pub direction: Direction,
    pub volume: u64,
    /// Cash earmarked until the fill: the full cost of a buy, or for a sell
    /// the amount by which its commission exceeds its value.
    pub reserved: Decimal,
}

/// A rejected signal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedSignal {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub direction: Direction,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub signals_processed: u64,
    pub signals_rejected: u64,
    pub orders_generated: u64,
    pub fills_processed: u64,
    pub total_commission: Decimal,
    pub realized_pnl: Decimal,
}
