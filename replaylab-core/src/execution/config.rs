use super::costs::TradeCosts;
use super::slippage::SlippageConfig;
use super::ExecutionError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Friction and validation parameters for the execution simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Commission as a fraction of trade value.
    pub commission_rate: Decimal,
    /// Floor applied to every commission.
    pub min_commission: Decimal,
    pub slippage: SlippageConfig,
    /// Orders must be a positive multiple of this.
    pub lot_size: u64,
    /// Refuse buys at limit-up and sells at limit-down closes.
    pub enforce_price_limits: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            commission_rate: dec!(0.0003),
            min_commission: dec!(5.00),
            slippage: SlippageConfig::Rate { rate: dec!(0.001) },
            lot_size: 100,
            enforce_price_limits: false,
        }
    }
}

impl ExecutionConfig {
    /// No commission, no slippage.
    pub fn frictionless() -> Self {
        Self {
            commission_rate: Decimal::ZERO,
            min_commission: Decimal::ZERO,
            slippage: SlippageConfig::None,
            ..Self::default()
        }
    }

    pub fn trade_costs(&self) -> TradeCosts {
        TradeCosts {
            commission_rate: self.commission_rate,
            min_commission: self.min_commission,
            slippage: self.slippage,
        }
    }

    /// `max(trade_value * rate, min_commission)`, rounded to cents.
    pub fn commission_for(&self, trade_value: Decimal) -> Decimal {
        self.trade_costs().commission(trade_value)
    }

    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.commission_rate < Decimal::ZERO {
            return Err(ExecutionError::InvalidConfig(format!(
                "commission_rate must not be negative, got {}",
                self.commission_rate
            )));
        }
        if self.min_commission < Decimal::ZERO {
            return Err(ExecutionError::InvalidConfig(format!(
                "min_commission must not be negative, got {}",
                self.min_commission
            )));
        }
        if !self.slippage.is_valid() {
            return Err(ExecutionError::InvalidConfig(format!(
                "slippage out of range: {:?}",
                self.slippage
            )));
        }
        if self.lot_size == 0 {
            return Err(ExecutionError::InvalidConfig("lot_size must be positive".into()));
        }
        Ok(())
    }
}
