//! Bar: the fundamental market data unit.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tolerance used when comparing a close against its exchange price limit.
const LIMIT_TOLERANCE: Decimal = dec!(0.01);

/// Immutable OHLCV bar for one instrument at one timestamp.
///
/// `turnover` is the traded notional. `pre_close`, `limit_up` and
/// `limit_down` are present only when the data vendor supplies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: u64,
    #[serde(default)]
    pub turnover: Decimal,
    #[serde(default)]
    pub pre_close: Option<Decimal>,
    #[serde(default)]
    pub limit_up: Option<Decimal>,
    #[serde(default)]
    pub limit_down: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BarError {
    #[error("{symbol} @ {timestamp}: negative price field")]
    NegativePrice {
        symbol: String,
        timestamp: NaiveDateTime,
    },
    #[error("{symbol} @ {timestamp}: OHLC out of order (o={open} h={high} l={low} c={close})")]
    InconsistentOhlc {
        symbol: String,
        timestamp: NaiveDateTime,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    },
    #[error("{symbol} @ {timestamp}: negative turnover {turnover}")]
    NegativeTurnover {
        symbol: String,
        timestamp: NaiveDateTime,
        turnover: Decimal,
    },
}

impl Bar {
    /// Bar with only the OHLCV fields populated.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: NaiveDateTime,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            turnover: Decimal::ZERO,
            pre_close: None,
            limit_up: None,
            limit_down: None,
        }
    }

    /// Checks `high >= max(open, close) >= min(open, close) >= low >= 0`.
    pub fn validate(&self) -> Result<(), BarError> {
        if self.low < Decimal::ZERO
            || self.open < Decimal::ZERO
            || self.close < Decimal::ZERO
            || self.high < Decimal::ZERO
        {
            return Err(BarError::NegativePrice {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
            });
        }
        let body_top = self.open.max(self.close);
        let body_bottom = self.open.min(self.close);
        if self.high < body_top || body_bottom < self.low {
            return Err(BarError::InconsistentOhlc {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }
        if self.turnover < Decimal::ZERO {
            return Err(BarError::NegativeTurnover {
                symbol: self.symbol.clone(),
                timestamp: self.timestamp,
                turnover: self.turnover,
            });
        }
        Ok(())
    }

    pub fn is_sane(&self) -> bool {
        self.validate().is_ok()
    }

    /// True when `price` lies inside the traded range `[low, high]`.
    pub fn contains_price(&self, price: Decimal) -> bool {
        self.low <= price && price <= self.high
    }

    /// `close - pre_close`.
    pub fn price_change(&self) -> Option<Decimal> {
        self.pre_close.map(|pre| self.close - pre)
    }

    /// Percentage change versus the previous close.
    pub fn price_change_pct(&self) -> Option<Decimal> {
        let pre = self.pre_close.filter(|p| !p.is_zero())?;
        Some((self.close - pre) / pre * dec!(100))
    }

    /// Intrabar range as a percentage of the previous close.
    pub fn amplitude(&self) -> Option<Decimal> {
        let pre = self.pre_close.filter(|p| !p.is_zero())?;
        Some((self.high - self.low) / pre * dec!(100))
    }

    /// Volume-weighted average price, `turnover / volume`.
    pub fn average_price(&self) -> Option<Decimal> {
        if self.volume == 0 || self.turnover.is_zero() {
            return None;
        }
        Some(self.turnover / Decimal::from(self.volume))
    }

    pub fn is_limit_up(&self) -> bool {
        self.limit_up
            .map_or(false, |limit| (self.close - limit).abs() < LIMIT_TOLERANCE)
    }

    pub fn is_limit_down(&self) -> bool {
        self.limit_down
            .map_or(false, |limit| (self.close - limit).abs() < LIMIT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    fn sample_bar() -> Bar {
        Bar {
            symbol: "600000.SH".into(),
            timestamp: ts(4),
            open: dec!(10.00),
            high: dec!(10.50),
            low: dec!(9.80),
            close: dec!(10.20),
            volume: 1_000_000,
            turnover: dec!(10_150_000),
            pre_close: Some(dec!(10.00)),
            limit_up: Some(dec!(11.00)),
            limit_down: Some(dec!(9.00)),
        }
    }

    #[test]
    fn sane_bar_validates() {
        assert!(sample_bar().validate().is_ok());
        assert!(sample_bar().is_sane());
    }

    #[test]
    fn high_below_close_is_rejected() {
        let mut bar = sample_bar();
        bar.high = dec!(10.10);
        assert!(matches!(
            bar.validate(),
            Err(BarError::InconsistentOhlc { .. })
        ));
    }

    #[test]
    fn low_above_open_is_rejected() {
        let mut bar = sample_bar();
        bar.low = dec!(10.05);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn negative_low_is_rejected() {
        let mut bar = sample_bar();
        bar.low = dec!(-0.01);
        assert!(matches!(bar.validate(), Err(BarError::NegativePrice { .. })));
    }

    #[test]
    fn flat_zero_bar_is_allowed() {
        let bar = Bar::new("X", ts(4), dec!(0), dec!(0), dec!(0), dec!(0), 0);
        assert!(bar.validate().is_ok());
    }

    #[test]
    fn derived_quantities() {
        let bar = sample_bar();
        assert_eq!(bar.price_change(), Some(dec!(0.20)));
        assert_eq!(bar.price_change_pct(), Some(dec!(2)));
        assert_eq!(bar.amplitude(), Some(dec!(7)));
        assert_eq!(bar.average_price(), Some(dec!(10.15)));
    }

    #[test]
    fn derived_quantities_absent_without_reference() {
        let bar = Bar::new("X", ts(4), dec!(1), dec!(2), dec!(1), dec!(2), 0);
        assert_eq!(bar.price_change(), None);
        assert_eq!(bar.amplitude(), None);
        assert_eq!(bar.average_price(), None);
        assert!(!bar.is_limit_up());
        assert!(!bar.is_limit_down());
    }

    #[test]
    fn limit_detection_uses_tolerance() {
        let mut bar = sample_bar();
        bar.close = dec!(10.995);
        bar.high = dec!(11.00);
        assert!(bar.is_limit_up());
        assert!(!bar.is_limit_down());

        bar.close = dec!(9.00);
        bar.low = dec!(9.00);
        assert!(bar.is_limit_down());
    }

    #[test]
    fn contains_price_is_inclusive() {
        let bar = sample_bar();
        assert!(bar.contains_price(dec!(9.80)));
        assert!(bar.contains_price(dec!(10.50)));
        assert!(!bar.contains_price(dec!(10.51)));
        assert!(!bar.contains_price(dec!(9.79)));
    }

    #[test]
    fn serde_roundtrip_keeps_optional_fields() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let back: Bar = serde_json::from_str(&json).unwrap();
        assert_eq!(bar, back);
    }
}
