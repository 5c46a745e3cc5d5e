//! Trade cost estimates shared by order sizing and the fill simulator.
//!
//! The portfolio sizes and reserves buys with the same price and commission
//! rules the simulator later fills them with, so a sized order can always
//! be paid for out of the cash it reserved.

use super::slippage::SlippageConfig;
use crate::domain::Direction;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCosts {
    pub commission_rate: Decimal,
    pub min_commission: Decimal,
    pub slippage: SlippageConfig,
}

impl TradeCosts {
    pub fn frictionless() -> Self {
        Self {
            commission_rate: Decimal::ZERO,
            min_commission: Decimal::ZERO,
            slippage: SlippageConfig::None,
        }
    }

    /// `max(trade_value * rate, min_commission)`, rounded to cents.
    pub fn commission(&self, trade_value: Decimal) -> Decimal {
        (trade_value * self.commission_rate)
            .max(self.min_commission)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Price an order fills at if it fills on a bar closing at `close`:
    /// the limit itself for limit orders, the slipped close otherwise.
    pub fn fill_price(
        &self,
        close: Decimal,
        limit: Option<Decimal>,
        direction: Direction,
    ) -> Decimal {
        match limit {
            Some(limit) => limit,
            None => self.slippage.apply(close, direction),
        }
    }

    /// Cash a buy of `volume` at `price` takes out of the account.
    pub fn buy_cost(&self, price: Decimal, volume: u64) -> Decimal {
        let value = price * Decimal::from(volume);
        value + self.commission(value)
    }

    /// Cash a sell of `volume` at `price` puts into the account. Negative
    /// when the commission exceeds the trade value.
    pub fn sell_proceeds(&self, price: Decimal, volume: u64) -> Decimal {
        let value = price * Decimal::from(volume);
        value - self.commission(value)
    }
}
