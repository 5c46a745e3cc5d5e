use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Long-only holding in one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub volume: u64,
    /// Volume-weighted entry price, commission excluded.
    pub avg_cost: Decimal,
    pub opened_at: NaiveDateTime,
}

impl Position {
    pub fn open(symbol: impl Into<String>, volume: u64, price: Decimal, at: NaiveDateTime) -> Self {
        Self {
            symbol: symbol.into(),
            volume,
            avg_cost: price,
            opened_at: at,
        }
    }

    /// Adds `volume` bought at `price`, re-weighting the average cost.
    pub fn add(&mut self, volume: u64, price: Decimal) {
        let held = Decimal::from(self.volume);
        let added = Decimal::from(volume);
        let total = held + added;
        if !total.is_zero() {
            self.avg_cost = (self.avg_cost * held + price * added) / total;
        }
        self.volume += volume;
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        Decimal::from(self.volume) * price
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        Decimal::from(self.volume) * (price - self.avg_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    #[test]
    fn add_reweights_average_cost() {
        let mut pos = Position::open("X", 100, dec!(10), at());
        pos.add(300, dec!(12));
        assert_eq!(pos.volume, 400);
        assert_eq!(pos.avg_cost, dec!(11.5));
    }

    #[test]
    fn valuation() {
        let pos = Position::open("X", 200, dec!(10), at());
        assert_eq!(pos.market_value(dec!(11)), dec!(2200));
        assert_eq!(pos.unrealized_pnl(dec!(9.5)), dec!(-100));
    }
}
