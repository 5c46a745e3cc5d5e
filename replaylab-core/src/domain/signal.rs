//! Signal events: a strategy's trading intention, with no quantity attached.

use super::order::Direction;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub direction: Direction,
    /// Conviction in `[0, 1]`. Only the signal-weighted sizer reads it.
    pub strength: f64,
    /// When set, the resulting order is a limit order at this price.
    #[serde(default)]
    pub limit_price: Option<Decimal>,
}

impl SignalEvent {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        direction: Direction,
        strength: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            direction,
            strength,
            limit_price: None,
        }
    }

    pub fn long(symbol: impl Into<String>, timestamp: NaiveDateTime, strength: f64) -> Self {
        Self::new(symbol, timestamp, Direction::Long, strength)
    }

    pub fn short(symbol: impl Into<String>, timestamp: NaiveDateTime, strength: f64) -> Self {
        Self::new(symbol, timestamp, Direction::Short, strength)
    }

    pub fn with_limit(mut self, limit_price: Decimal) -> Self {
        self.limit_price = Some(limit_price);
        self
    }

    /// Strength is finite and inside `[0, 1]`.
    pub fn has_valid_strength(&self) -> bool {
        self.strength.is_finite() && (0.0..=1.0).contains(&self.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ts() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    #[test]
    fn strength_bounds() {
        assert!(SignalEvent::long("X", ts(), 0.0).has_valid_strength());
        assert!(SignalEvent::long("X", ts(), 1.0).has_valid_strength());
        assert!(!SignalEvent::long("X", ts(), 1.01).has_valid_strength());
        assert!(!SignalEvent::long("X", ts(), -0.1).has_valid_strength());
        assert!(!SignalEvent::long("X", ts(), f64::NAN).has_valid_strength());
    }

    #[test]
    fn with_limit_sets_price() {
        let s = SignalEvent::short("X", ts(), 0.5).with_limit(dec!(10.1));
        assert_eq!(s.direction, Direction::Short);
        assert_eq!(s.limit_price, Some(dec!(10.1)));
    }
}
