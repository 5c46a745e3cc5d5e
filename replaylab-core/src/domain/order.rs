//! Order events: trading direction, order kind and the sized order itself.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Trading direction. The kernel is long-only, so `Short` means "close the
/// open long position", never "open a short".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// True for the cash-consuming side.
    pub fn is_buy(self) -> bool {
        matches!(self, Direction::Long)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    /// Fill at the current close.
    Market,
    /// Fill at `limit_price` only if the current bar traded through it.
    Limit { limit_price: Decimal },
}

impl OrderType {
    pub fn limit_price(&self) -> Option<Decimal> {
        match self {
            OrderType::Market => None,
            OrderType::Limit { limit_price } => Some(*limit_price),
        }
    }
}

/// A capital-constrained instruction produced by the portfolio.
///
/// `volume` is an integer count of shares and, once validated, a positive
/// multiple of the round lot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub order_type: OrderType,
    pub direction: Direction,
    pub volume: u64,
}

impl OrderEvent {
    pub fn market(
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        direction: Direction,
        volume: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            order_type: OrderType::Market,
            direction,
            volume,
        }
    }

    pub fn limit(
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        direction: Direction,
        volume: u64,
        limit_price: Decimal,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            order_type: OrderType::Limit { limit_price },
            direction,
            volume,
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self.order_type, OrderType::Limit { .. })
    }
}
