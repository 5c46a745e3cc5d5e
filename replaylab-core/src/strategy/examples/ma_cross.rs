//! Moving Average Crossover strategy
//!
//! - Long when the fast SMA crosses above the slow SMA
//! - Short (close) when the fast SMA crosses below the slow SMA
//! - Nothing otherwise; the portfolio filters repeats

use crate::data::DataView;
use crate::domain::{Bar, MarketEvent, SignalEvent};
use crate::strategy::{Strategy, StrategyError};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct MovingAverageCross {
    fast_period: usize,
    slow_period: usize,
}

impl MovingAverageCross {
    pub fn new(fast_period: usize, slow_period: usize) -> Result<Self, StrategyError> {
        if fast_period == 0 {
            return Err(StrategyError::InvalidParameter(
                "fast_period must be > 0".into(),
            ));
        }
        if slow_period <= fast_period {
            return Err(StrategyError::InvalidParameter(format!(
                "slow_period ({slow_period}) must be > fast_period ({fast_period})"
            )));
        }
        Ok(Self {
            fast_period,
            slow_period,
        })
    }

    /// Bars needed before a cross can be detected.
    pub fn lookback(&self) -> usize {
        self.slow_period + 1
    }

    fn sma(bars: &[Bar], period: usize) -> Option<Decimal> {
        if bars.len() < period {
            return None;
        }
        let sum: Decimal = bars[bars.len() - period..].iter().map(|b| b.close).sum();
        Some(sum / Decimal::from(period))
    }

    /// Some(true) on a bullish cross, Some(false) on a bearish one.
    fn detect_cross(&self, bars: &[Bar]) -> Option<bool> {
        if bars.len() < self.lookback() {
            return None;
        }
        let fast_now = Self::sma(bars, self.fast_period)?;
        let slow_now = Self::sma(bars, self.slow_period)?;

        let prev = &bars[..bars.len() - 1];
        let fast_prev = Self::sma(prev, self.fast_period)?;
        let slow_prev = Self::sma(prev, self.slow_period)?;

        if fast_prev <= slow_prev && fast_now > slow_now {
            Some(true)
        } else if fast_prev >= slow_prev && fast_now < slow_now {
            Some(false)
        } else {
            None
        }
    }
}

impl Strategy for MovingAverageCross {
    fn on_market(
        &self,
        event: &MarketEvent,
        view: &dyn DataView,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        let bars = view.latest_n(event.symbol(), self.lookback());
        let signal = match self.detect_cross(bars) {
            Some(true) => SignalEvent::long(event.symbol(), event.timestamp(), 1.0),
            Some(false) => SignalEvent::short(event.symbol(), event.timestamp(), 1.0),
            None => return Ok(Vec::new()),
        };
        Ok(vec![signal])
    }

    fn name(&self) -> &str {
        "ma_cross"
    }
}
