//! Order → fill simulation against the current market view.
//!
//! The simulator holds configuration and statistics only; it never owns
//! financial state. An order either fills completely at one price or is
//! refused. Refused orders are not queued for later bars.

use super::config::ExecutionConfig;
use super::slippage::SlippageModel;
use super::stats::{ExecutionStats, OrderRejection};
use super::ExecutionError;
use crate::data::DataView;
use crate::domain::{Bar, Direction, FillEvent, OrderEvent, OrderType};
use rust_decimal::Decimal;
use tracing::{debug, info};

pub struct ExecutionSimulator {
    config: ExecutionConfig,
    slippage: Box<dyn SlippageModel>,
    stats: ExecutionStats,
}

impl std::fmt::Debug for ExecutionSimulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionSimulator")
            .field("config", &self.config)
            .field("slippage", &self.slippage.name())
            .field("stats", &self.stats)
            .finish()
    }
}

impl ExecutionSimulator {
    pub fn new(config: ExecutionConfig) -> Result<Self, ExecutionError> {
        config.validate()?;
        let slippage = config.slippage.build();
        Ok(Self {
            config,
            slippage,
            stats: ExecutionStats::default(),
        })
    }

    /// Replaces the configured slippage model. Portfolio sizing still prices
    /// with `config().slippage`.
    pub fn with_slippage_model(mut self, model: Box<dyn SlippageModel>) -> Self {
        self.slippage = model;
        self
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    /// Positive volume in whole lots; limit orders need a positive price.
    pub fn validate_order(&self, order: &OrderEvent) -> bool {
        if order.symbol.is_empty() || order.volume == 0 {
            return false;
        }
        if order.volume % self.config.lot_size != 0 {
            return false;
        }
        match order.order_type {
            OrderType::Market => true,
            OrderType::Limit { limit_price } => limit_price > Decimal::ZERO,
        }
    }

    /// Fills `order` against the latest bar in `view`, or refuses it.
    pub fn execute_order(&mut self, order: &OrderEvent, view: &dyn DataView) -> Option<FillEvent> {
        self.stats.record_received();
        match self.try_fill(order, view) {
            Ok(fill) => {
                self.stats.record_executed(fill.commission);
                info!(
                    symbol = %fill.symbol,
                    direction = %fill.direction,
                    volume = fill.volume,
                    price = %fill.price,
                    commission = %fill.commission,
                    "order filled"
                );
                Some(fill)
            }
            Err(reason) => {
                self.stats.record_rejected(reason);
                info!(
                    symbol = %order.symbol,
                    direction = %order.direction,
                    volume = order.volume,
                    %reason,
                    "order rejected"
                );
                None
            }
        }
    }

    fn try_fill(&self, order: &OrderEvent, view: &dyn DataView) -> Result<FillEvent, OrderRejection> {
        if !self.validate_order(order) {
            return Err(OrderRejection::InvalidOrder);
        }
        let bar = view
            .latest(&order.symbol)
            .ok_or(OrderRejection::NoMarketData)?;

        if self.config.enforce_price_limits && blocked_by_limit(bar, order.direction) {
            return Err(OrderRejection::PriceLimit);
        }

        let price = match order.order_type {
            OrderType::Market => self.slippage.apply(bar.close, order.direction),
            OrderType::Limit { limit_price } => {
                if !bar.contains_price(limit_price) {
                    debug!(
                        symbol = %order.symbol,
                        limit = %limit_price,
                        low = %bar.low,
                        high = %bar.high,
                        "limit outside bar range"
                    );
                    return Err(OrderRejection::LimitUnreachable);
                }
                limit_price
            }
        };
        if price <= Decimal::ZERO {
            return Err(OrderRejection::NonPositivePrice);
        }

        let trade_value = price * Decimal::from(order.volume);
        let timestamp = view
            .current_time()
            .map_or(order.timestamp, |now| now.max(order.timestamp));

        Ok(FillEvent {
            symbol: order.symbol.clone(),
            timestamp,
            direction: order.direction,
            volume: order.volume,
            price,
            commission: self.config.commission_for(trade_value),
        })
    }
}

fn blocked_by_limit(bar: &Bar, direction: Direction) -> bool {
    match direction {
        Direction::Long => bar.is_limit_up(),
        Direction::Short => bar.is_limit_down(),
    }
}
