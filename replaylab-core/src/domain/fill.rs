use crate::domain::order::Direction;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Execution report for one order. Always the full ordered volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    pub volume: u64,
    /// Slippage-adjusted execution price.
    pub price: Decimal,
    pub commission: Decimal,
}

impl FillEvent {
    /// `price * volume`, before commission.
    pub fn trade_value(&self) -> Decimal {
        self.price * Decimal::from(self.volume)
    }

    /// Signed change in cash this fill causes. Commission always reduces cash.
    pub fn cash_delta(&self) -> Decimal {
        match self.direction {
            Direction::Long => -(self.trade_value() + self.commission),
            Direction::Short => self.trade_value() - self.commission,
        }
    }
}
