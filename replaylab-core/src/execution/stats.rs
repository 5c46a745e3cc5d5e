use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Why the simulator refused an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderRejection {
    /// Failed `validate_order`.
    InvalidOrder,
    /// No bar has been replayed for the instrument yet.
    NoMarketData,
    /// Limit price outside the current bar's `[low, high]`.
    LimitUnreachable,
    /// Bar closed at the exchange limit against the order's side.
    PriceLimit,
    /// Slippage pushed the execution price to zero or below.
    NonPositivePrice,
}

impl std::fmt::Display for OrderRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            OrderRejection::InvalidOrder => "invalid order",
            OrderRejection::NoMarketData => "no market data",
            OrderRejection::LimitUnreachable => "limit price not reached",
            OrderRejection::PriceLimit => "blocked by price limit",
            OrderRejection::NonPositivePrice => "non-positive execution price",
        };
        f.write_str(text)
    }
}

/// Counters kept beside the simulator. They never influence a fill decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub orders_received: u64,
    pub orders_executed: u64,
    pub orders_rejected: u64,
    pub total_commission: Decimal,
    pub rejections: BTreeMap<OrderRejection, u64>,
}

impl ExecutionStats {
    pub(crate) fn record_received(&mut self) {
        self.orders_received = self.orders_received.saturating_add(1);
    }

    pub(crate) fn record_executed(&mut self, commission: Decimal) {
        self.orders_executed = self.orders_executed.saturating_add(1);
        self.total_commission += commission;
    }

    pub(crate) fn record_rejected(&mut self, reason: OrderRejection) {
        self.orders_rejected = self.orders_rejected.saturating_add(1);
        *self.rejections.entry(reason).or_insert(0) += 1;
    }

    /// Executed / received, or 0 when nothing was received.
    pub fn execution_rate(&self) -> f64 {
        if self.orders_received == 0 {
            0.0
        } else {
            self.orders_executed as f64 / self.orders_received as f64
        }
    }
}
