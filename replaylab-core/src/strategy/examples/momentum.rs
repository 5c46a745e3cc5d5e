//! Intrabar momentum strategy
//!
//! Signals on the bar's own move from open to close:
//! - Long when the bar gained more than `threshold_pct` percent
//! - Short when it lost more than `threshold_pct` percent

use crate::data::DataView;
use crate::domain::{MarketEvent, SignalEvent};
use crate::strategy::{Strategy, StrategyError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
pub struct MomentumStrategy {
    threshold_pct: Decimal,
    strength: f64,
}

impl Default for MomentumStrategy {
    fn default() -> Self {
        Self {
            threshold_pct: dec!(0.3),
            strength: 0.8,
        }
    }
}

impl MomentumStrategy {
    pub fn new(threshold_pct: Decimal, strength: f64) -> Result<Self, StrategyError> {
        if threshold_pct < Decimal::ZERO {
            return Err(StrategyError::InvalidParameter(format!(
                "threshold_pct must not be negative, got {threshold_pct}"
            )));
        }
        if !(strength.is_finite() && (0.0..=1.0).contains(&strength)) {
            return Err(StrategyError::InvalidParameter(format!(
                "strength must be in [0, 1], got {strength}"
            )));
        }
        Ok(Self {
            threshold_pct,
            strength,
        })
    }
}

impl Strategy for MomentumStrategy {
    fn on_market(
        &self,
        event: &MarketEvent,
        _view: &dyn DataView,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        let bar = &event.bar;
        if bar.open.is_zero() {
            return Ok(Vec::new());
        }
        let change_pct = (bar.close - bar.open) / bar.open * dec!(100);

        let signal = if change_pct > self.threshold_pct {
            SignalEvent::long(event.symbol(), event.timestamp(), self.strength)
        } else if change_pct < -self.threshold_pct {
            SignalEvent::short(event.symbol(), event.timestamp(), self.strength)
        } else {
            return Ok(Vec::new());
        };
        Ok(vec![signal])
    }

    fn name(&self) -> &str {
        "momentum"
    }
}
