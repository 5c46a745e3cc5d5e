//! Position sizing: turn an opening Long signal into a share count.
//!
//! Every policy produces a cash budget that never exceeds
//! `capital_fraction * cash`; the budget is then converted to whole lots.

use crate::domain::Bar;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SizingPolicy {
    /// Spend `capital_fraction` of current cash.
    #[default]
    CashFraction,
    /// Scale the cash-fraction budget by signal strength.
    SignalWeighted,
    /// Split total equity evenly across `max_positions` slots.
    EqualWeight { max_positions: u32 },
    /// Scale exposure inversely to volatility:
    /// `base_risk_amount / (ATR / close) * risk_per_unit`.
    Atr {
        /// Bars in the ATR window, including the current one.
        #[serde(default = "default_atr_period")]
        period: usize,
        #[serde(default = "default_base_risk_amount")]
        base_risk_amount: Decimal,
        #[serde(default = "default_risk_per_unit")]
        risk_per_unit: Decimal,
    },
}

fn default_atr_period() -> usize {
    20
}

fn default_base_risk_amount() -> Decimal {
    Decimal::from(10_000)
}

fn default_risk_per_unit() -> Decimal {
    Decimal::new(1, 2)
}

impl SizingPolicy {
    /// Cash to commit to one new position.
    ///
    /// `history` is the instrument's recent bars, oldest first. Returns
    /// `None` when the policy needs more history than was given.
    pub fn budget(
        &self,
        cash: Decimal,
        total_equity: Decimal,
        capital_fraction: Decimal,
        strength: f64,
        history: &[Bar],
    ) -> Option<Decimal> {
        let cap = (cash * capital_fraction).max(Decimal::ZERO);
        let budget = match self {
            SizingPolicy::CashFraction => cap,
            SizingPolicy::SignalWeighted => {
                let weight = Decimal::from_f64(strength.clamp(0.0, 1.0)).unwrap_or(Decimal::ZERO);
                cap * weight
            }
            SizingPolicy::EqualWeight { max_positions } => {
                if *max_positions == 0 {
                    return Some(Decimal::ZERO);
                }
                let slot = total_equity / Decimal::from(*max_positions);
                slot.min(cap).max(Decimal::ZERO)
            }
            SizingPolicy::Atr {
                period,
                base_risk_amount,
                risk_per_unit,
            } => {
                let atr = average_true_range(history, *period)?;
                let close = history.last()?.close;
                if atr <= Decimal::ZERO || close <= Decimal::ZERO {
                    return Some(Decimal::ZERO);
                }
                let target = *base_risk_amount / (atr / close) * *risk_per_unit;
                target.min(cap).max(Decimal::ZERO)
            }
        };
        Some(budget)
    }

    /// Bars of history `budget` needs; zero for policies that ignore it.
    pub fn history_window(&self) -> usize {
        match self {
            SizingPolicy::Atr { period, .. } => *period,
            _ => 0,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SizingPolicy::CashFraction => "cash_fraction",
            SizingPolicy::SignalWeighted => "signal_weighted",
            SizingPolicy::EqualWeight { .. } => "equal_weight",
            SizingPolicy::Atr { .. } => "atr",
        }
    }
}

/// `max(high - low, |high - prev_close|, |low - prev_close|)`
fn true_range(bar: &Bar, prev_close: Decimal) -> Decimal {
    (bar.high - bar.low)
        .max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}

/// Mean true range over the last `period` bars. The first bar of the window
/// only supplies a previous close. `None` with fewer than `period` bars.
pub fn average_true_range(bars: &[Bar], period: usize) -> Option<Decimal> {
    if period < 2 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    let sum: Decimal = window
        .windows(2)
        .map(|pair| true_range(&pair[1], pair[0].close))
        .sum();
    Some(sum / Decimal::from(period - 1))
}

/// `floor(budget / price / lot) * lot`. Zero when price or lot is not positive.
pub fn volume_for_budget(budget: Decimal, price: Decimal, lot_size: u64) -> u64 {
    if price <= Decimal::ZERO || lot_size == 0 || budget <= Decimal::ZERO {
        return 0;
    }
    let lots = (budget / price / Decimal::from(lot_size)).floor();
    lots.to_u64().unwrap_or(0).saturating_mul(lot_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn cash_fraction_budget_and_lots() {
        let budget = SizingPolicy::CashFraction
            .budget(dec!(100000), dec!(100000), dec!(0.9), 1.0, &[])
            .unwrap();
        assert_eq!(budget, dec!(90000));
        assert_eq!(volume_for_budget(budget, dec!(10.00), 100), 9_000);
    }

    #[test]
    fn lots_round_down() {
        assert_eq!(volume_for_budget(dec!(1999), dec!(10), 100), 100);
        assert_eq!(volume_for_budget(dec!(999.99), dec!(10), 100), 0);
    }

    #[test]
    fn degenerate_inputs_size_to_zero() {
        assert_eq!(volume_for_budget(dec!(1000), dec!(0), 100), 0);
        assert_eq!(volume_for_budget(dec!(1000), dec!(10), 0), 0);
        assert_eq!(volume_for_budget(dec!(-5), dec!(10), 100), 0);
    }

    #[test]
    fn signal_weighted_scales_by_strength() {
        let budget = SizingPolicy::SignalWeighted
            .budget(dec!(100000), dec!(100000), dec!(0.9), 0.5, &[])
            .unwrap();
        assert_eq!(budget, dec!(45000));
    }

    #[test]
    fn equal_weight_is_capped_by_cash() {
        let policy = SizingPolicy::EqualWeight { max_positions: 4 };
        assert_eq!(
            policy.budget(dec!(100000), dec!(100000), dec!(0.9), 1.0, &[]),
            Some(dec!(25000))
        );
        assert_eq!(
            policy.budget(dec!(10000), dec!(100000), dec!(0.9), 1.0, &[]),
            Some(dec!(9000))
        );
        let empty = SizingPolicy::EqualWeight { max_positions: 0 };
        assert_eq!(
            empty.budget(dec!(10000), dec!(100000), dec!(0.9), 1.0, &[]),
            Some(Decimal::ZERO)
        );
    }

    fn day(n: u32, low: Decimal, high: Decimal, close: Decimal) -> Bar {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 1, n)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap();
        Bar::new("X", ts, close, high, low, close, 1_000)
    }

    fn atr(period: usize) -> SizingPolicy {
        SizingPolicy::Atr {
            period,
            base_risk_amount: dec!(10000),
            risk_per_unit: dec!(0.01),
        }
    }

    #[test]
    fn true_range_includes_gaps() {
        let bars = [
            day(1, dec!(9), dec!(11), dec!(10)),
            // Gap up: range 0.5, but 13 - 10 = 3 from the previous close.
            day(2, dec!(12.5), dec!(13), dec!(12.8)),
            day(3, dec!(12), dec!(13), dec!(12.5)),
        ];
        // (3 + 1) / 2
        assert_eq!(average_true_range(&bars, 3), Some(dec!(2)));
        // Only the last two bars: TR of day 3 against 12.8.
        assert_eq!(average_true_range(&bars, 2), Some(dec!(1)));
    }

    #[test]
    fn atr_needs_a_full_window() {
        let bars = [
            day(1, dec!(9), dec!(11), dec!(10)),
            day(2, dec!(9), dec!(11), dec!(10)),
        ];
        assert_eq!(average_true_range(&bars, 3), None);
        assert_eq!(average_true_range(&bars, 1), None);
        assert_eq!(
            atr(3).budget(dec!(100000), dec!(100000), dec!(0.9), 1.0, &bars),
            None
        );
        assert_eq!(atr(3).history_window(), 3);
        assert_eq!(SizingPolicy::CashFraction.history_window(), 0);
    }

    #[test]
    fn atr_budget_scales_inversely_with_volatility() {
        // ATR 0.50 at close 10: 10,000 / 0.05 * 0.01 = 2,000
        let calm = [
            day(1, dec!(9.75), dec!(10.25), dec!(10)),
            day(2, dec!(9.75), dec!(10.25), dec!(10)),
        ];
        assert_eq!(
            atr(2).budget(dec!(100000), dec!(100000), dec!(0.9), 1.0, &calm),
            Some(dec!(2000))
        );
        // ATR 2.00 at close 10: 500
        let wild = [
            day(1, dec!(9), dec!(11), dec!(10)),
            day(2, dec!(9), dec!(11), dec!(10)),
        ];
        assert_eq!(
            atr(2).budget(dec!(100000), dec!(100000), dec!(0.9), 1.0, &wild),
            Some(dec!(500))
        );
    }

    #[test]
    fn atr_budget_is_capped_by_cash_fraction() {
        // ATR 0.01 at close 10: target 100,000 > 90% of 20,000
        let quiet = [
            day(1, dec!(9.995), dec!(10.005), dec!(10)),
            day(2, dec!(9.995), dec!(10.005), dec!(10)),
        ];
        assert_eq!(
            atr(2).budget(dec!(20000), dec!(100000), dec!(0.9), 1.0, &quiet),
            Some(dec!(18000))
        );
    }

    #[test]
    fn flat_bars_give_zero_atr_budget() {
        let flat = [
            day(1, dec!(10), dec!(10), dec!(10)),
            day(2, dec!(10), dec!(10), dec!(10)),
        ];
        assert_eq!(
            atr(2).budget(dec!(100000), dec!(100000), dec!(0.9), 1.0, &flat),
            Some(Decimal::ZERO)
        );
    }

    #[test]
    fn atr_policy_fills_defaults() {
        let policy: SizingPolicy = serde_json::from_str(r#"{"type":"ATR"}"#).unwrap();
        assert_eq!(policy, atr(20));
        assert_eq!(policy.name(), "atr");
    }

    #[test]
    fn policy_deserializes_from_tagged_form() {
        let policy: SizingPolicy =
            serde_json::from_str(r#"{"type":"EQUAL_WEIGHT","max_positions":5}"#).unwrap();
        assert_eq!(policy, SizingPolicy::EqualWeight { max_positions: 5 });
    }
}
