//! Slippage models: adjust the base execution price against the trader.
//!
//! - Buys pay more than the base price, sells receive less.
//! - Limit orders are priced by the simulator at their limit and never reach
//!   a slippage model (passive fill).

use crate::domain::Direction;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Slippage model: maps a base price to an execution price.
pub trait SlippageModel: Send + Sync {
    fn apply(&self, base: Decimal, direction: Direction) -> Decimal;

    /// Name of this model
    fn name(&self) -> &str;
}

/// Proportional slippage: buy at `base * (1 + rate)`, sell at `base * (1 - rate)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateSlippage {
    pub rate: Decimal,
}

impl SlippageModel for RateSlippage {
    fn apply(&self, base: Decimal, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => base * (Decimal::ONE + self.rate),
            Direction::Short => base * (Decimal::ONE - self.rate),
        }
    }

    fn name(&self) -> &str {
        "RateSlippage"
    }
}

/// Absolute slippage: a constant price offset, e.g. one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSlippage {
    pub amount: Decimal,
}

impl SlippageModel for FixedSlippage {
    fn apply(&self, base: Decimal, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => base + self.amount,
            Direction::Short => base - self.amount,
        }
    }

    fn name(&self) -> &str {
        "FixedSlippage"
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoSlippage;

impl SlippageModel for NoSlippage {
    fn apply(&self, base: Decimal, _direction: Direction) -> Decimal {
        base
    }

    fn name(&self) -> &str {
        "NoSlippage"
    }
}

/// Serializable choice of slippage model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlippageConfig {
    Rate { rate: Decimal },
    Fixed { amount: Decimal },
    None,
}

impl SlippageConfig {
    pub fn build(&self) -> Box<dyn SlippageModel> {
        match *self {
            SlippageConfig::Rate { rate } => Box::new(RateSlippage { rate }),
            SlippageConfig::Fixed { amount } => Box::new(FixedSlippage { amount }),
            SlippageConfig::None => Box::new(NoSlippage),
        }
    }

    /// Same price the built model would produce, without boxing.
    pub fn apply(&self, base: Decimal, direction: Direction) -> Decimal {
        match *self {
            SlippageConfig::Rate { rate } => RateSlippage { rate }.apply(base, direction),
            SlippageConfig::Fixed { amount } => FixedSlippage { amount }.apply(base, direction),
            SlippageConfig::None => base,
        }
    }

    pub fn is_valid(&self) -> bool {
        match *self {
            SlippageConfig::Rate { rate } => rate >= Decimal::ZERO && rate < Decimal::ONE,
            SlippageConfig::Fixed { amount } => amount >= Decimal::ZERO,
            SlippageConfig::None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rate_slippage_is_adverse_on_both_sides() {
        let model = RateSlippage { rate: dec!(0.001) };
        assert_eq!(model.apply(dec!(10.00), Direction::Long), dec!(10.01));
        assert_eq!(model.apply(dec!(10.00), Direction::Short), dec!(9.99));
    }

    #[test]
    fn fixed_slippage_offsets_by_amount() {
        let model = FixedSlippage { amount: dec!(0.01) };
        assert_eq!(model.apply(dec!(10.00), Direction::Long), dec!(10.01));
        assert_eq!(model.apply(dec!(10.00), Direction::Short), dec!(9.99));
    }

    #[test]
    fn no_slippage_is_identity() {
        assert_eq!(NoSlippage.apply(dec!(10), Direction::Long), dec!(10));
    }

    #[test]
    fn config_builds_named_model() {
        let config = SlippageConfig::Rate { rate: dec!(0.001) };
        assert_eq!(config.build().name(), "RateSlippage");
        assert!(config.is_valid());
        assert!(!SlippageConfig::Rate { rate: dec!(1) }.is_valid());
        assert!(!SlippageConfig::Fixed { amount: dec!(-0.01) }.is_valid());
    }

    #[test]
    fn config_apply_matches_built_model() {
        for config in [
            SlippageConfig::Rate { rate: dec!(0.002) },
            SlippageConfig::Fixed { amount: dec!(0.05) },
            SlippageConfig::None,
        ] {
            let model = config.build();
            for direction in [Direction::Long, Direction::Short] {
                assert_eq!(
                    config.apply(dec!(12.34), direction),
                    model.apply(dec!(12.34), direction)
                );
            }
        }
    }
}
