//! Read-only view over bars that have already been replayed.

use crate::domain::Bar;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

/// What strategies and the execution simulator may see of market history.
///
/// Every bar returned has already been emitted as a Market event, so no
/// implementation can expose a bar later than the event being processed.
pub trait DataView {
    /// Most recent emitted bar for `symbol`.
    fn latest(&self, symbol: &str) -> Option<&Bar>;

    /// Up to `n` most recent emitted bars, oldest first. Empty for unknown
    /// symbols or `n == 0`.
    fn latest_n(&self, symbol: &str, n: usize) -> &[Bar];

    /// Timestamp of the last emitted Market event.
    fn current_time(&self) -> Option<NaiveDateTime>;

    /// Instruments in the replay universe, in configured order.
    fn symbols(&self) -> &[String];

    fn latest_price(&self, symbol: &str) -> Option<Decimal> {
        self.latest(symbol).map(|bar| bar.close)
    }

    fn has_symbol(&self, symbol: &str) -> bool {
        self.symbols().iter().any(|s| s == symbol)
    }
}
