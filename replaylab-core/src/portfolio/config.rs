use super::sizing::SizingPolicy;
use super::PortfolioError;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Capital and risk-gating parameters for one portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub initial_capital: Decimal,
    /// Share of current cash an opening position may consume.
    pub capital_fraction: Decimal,
    /// Opening Longs are refused while `cash / total_equity` is below this.
    pub min_cash_ratio: Decimal,
    pub lot_size: u64,
    /// Closing orders with a smaller notional are refused. Zero disables.
    pub min_trade_value: Decimal,
    pub sizing: SizingPolicy,
}

impl Default for PortfolioConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(100000),
            capital_fraction: dec!(0.90),
            min_cash_ratio: dec!(0.05),
            lot_size: 100,
            min_trade_value: Decimal::ZERO,
            sizing: SizingPolicy::default(),
        }
    }
}

impl PortfolioConfig {
    pub fn with_capital(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), PortfolioError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(PortfolioError::InvalidConfig(format!(
                "initial_capital must be positive, got {}",
                self.initial_capital
            )));
        }
        if self.capital_fraction <= Decimal::ZERO || self.capital_fraction > Decimal::ONE {
            return Err(PortfolioError::InvalidConfig(format!(
                "capital_fraction must be in (0, 1], got {}",
                self.capital_fraction
            )));
        }
        if self.min_cash_ratio < Decimal::ZERO || self.min_cash_ratio >= Decimal::ONE {
            return Err(PortfolioError::InvalidConfig(format!(
                "min_cash_ratio must be in [0, 1), got {}",
                self.min_cash_ratio
            )));
        }
        if self.lot_size == 0 {
            return Err(PortfolioError::InvalidConfig("lot_size must be positive".into()));
        }
        if self.min_trade_value < Decimal::ZERO {
            return Err(PortfolioError::InvalidConfig(format!(
                "min_trade_value must not be negative, got {}",
                self.min_trade_value
            )));
        }
        if let SizingPolicy::EqualWeight { max_positions: 0 } = self.sizing {
            return Err(PortfolioError::InvalidConfig(
                "equal-weight sizing needs max_positions > 0".into(),
            ));
        }
        if let SizingPolicy::Atr {
            period,
            base_risk_amount,
            risk_per_unit,
        } = self.sizing
        {
            if period < 2 {
                return Err(PortfolioError::InvalidConfig(format!(
                    "ATR sizing needs period >= 2, got {period}"
                )));
            }
            if base_risk_amount <= Decimal::ZERO || risk_per_unit <= Decimal::ZERO {
                return Err(PortfolioError::InvalidConfig(
                    "ATR sizing needs positive base_risk_amount and risk_per_unit".into(),
                ));
            }
        }
        Ok(())
    }
}
