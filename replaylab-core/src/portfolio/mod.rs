//! Portfolio accounting and risk gating.
//!
//! The portfolio is the only owner of cash and positions. It turns signals
//! into capital-constrained orders and reconciles fills back into state.
//! Total equity is always recomputed from cash and marked positions, never
//! carried forward incrementally.

pub mod config;
pub mod ledger;
pub mod sizing;

pub use config::PortfolioConfig;
pub use ledger::{PendingOrder, PortfolioSnapshot, PortfolioStats, RejectedSignal, RejectionReason};
pub use sizing::{volume_for_budget, SizingPolicy};

use crate::domain::{Bar, Direction, FillEvent, OrderEvent, OrderType, Position, SignalEvent};
use crate::execution::TradeCosts;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortfolioError {
    #[error("invalid portfolio config: {0}")]
    InvalidConfig(String),

    #[error("fill for {symbol} at {timestamp} would leave cash at {cash}")]
    NegativeCash {
        symbol: String,
        timestamp: NaiveDateTime,
        cash: Decimal,
    },

    #[error("fill for {symbol} at {timestamp} sells {sold} but only {held} held")]
    Oversell {
        symbol: String,
        timestamp: NaiveDateTime,
        held: u64,
        sold: u64,
    },

    #[error("fill for {symbol} at {timestamp} has zero volume")]
    EmptyFill {
        symbol: String,
        timestamp: NaiveDateTime,
    },
}

#[derive(Debug, Clone)]
pub struct Portfolio {
    config: PortfolioConfig,
    /// Fill pricing used to size and reserve orders.
    costs: TradeCosts,
    cash: Decimal,
    positions: BTreeMap<String, Position>,
    latest_prices: BTreeMap<String, Decimal>,
    /// Orders issued this tick whose fill or refusal has not come back yet.
    pending: BTreeMap<String, PendingOrder>,
    total_equity: Decimal,
    snapshots: Vec<PortfolioSnapshot>,
    fills: Vec<FillEvent>,
    rejections: Vec<RejectedSignal>,
    stats: PortfolioStats,
}

impl Portfolio {
    pub fn new(config: PortfolioConfig) -> Result<Self, PortfolioError> {
        config.validate()?;
        let cash = config.initial_capital;
        Ok(Self {
            config,
            costs: TradeCosts::frictionless(),
            cash,
            positions: BTreeMap::new(),
            latest_prices: BTreeMap::new(),
            pending: BTreeMap::new(),
            total_equity: cash,
            snapshots: Vec::new(),
            fills: Vec::new(),
            rejections: Vec::new(),
            stats: PortfolioStats::default(),
        })
    }

    /// Sizes orders against the given fill costs instead of frictionless ones.
    pub fn with_trade_costs(mut self, costs: TradeCosts) -> Self {
        self.costs = costs;
        self
    }

    pub fn set_trade_costs(&mut self, costs: TradeCosts) {
        self.costs = costs;
    }

    pub fn trade_costs(&self) -> &TradeCosts {
        &self.costs
    }

    // ── Market ──

    /// Marks `bar.symbol` at its close, recomputes equity and appends a snapshot.
    pub fn update_on_market(&mut self, bar: &Bar) {
        self.latest_prices.insert(bar.symbol.clone(), bar.close);
        self.recompute_equity();
        self.snapshots.push(PortfolioSnapshot {
            timestamp: bar.timestamp,
            cash: self.cash,
            total_equity: self.total_equity,
            positions: self
                .positions
                .iter()
                .map(|(symbol, pos)| (symbol.clone(), pos.volume))
                .collect(),
        });
    }

    // ── Signal ──

    /// Applies the risk gates and sizes an order, or records why not.
    ///
    /// `history` holds the signal instrument's most recent bars, oldest
    /// first; only volatility-based sizing reads it.
    pub fn process_signal(&mut self, signal: &SignalEvent, history: &[Bar]) -> Option<OrderEvent> {
        self.stats.signals_processed += 1;

        let price = match self.latest_prices.get(&signal.symbol) {
            Some(p) if *p > Decimal::ZERO => *p,
            _ => return self.reject(signal, RejectionReason::NoPrice),
        };

        if self.pending.contains_key(&signal.symbol) {
            return self.reject(signal, RejectionReason::OrderPending);
        }

        let fill_price = self
            .costs
            .fill_price(price, signal.limit_price, signal.direction);

        let (volume, reserved) = match signal.direction {
            Direction::Long => {
                if self.positions.contains_key(&signal.symbol) {
                    return self.reject(signal, RejectionReason::AlreadyHolding);
                }
                if !self.cash_ratio_allows_entry() {
                    return self.reject(signal, RejectionReason::CashFloor);
                }
                let budget = match self.config.sizing.budget(
                    self.available_cash(),
                    self.total_equity,
                    self.config.capital_fraction,
                    signal.strength,
                    history,
                ) {
                    Some(budget) => budget,
                    None => return self.reject(signal, RejectionReason::InsufficientHistory),
                };
                let sizing_price = match signal.limit_price {
                    Some(limit) => price.max(limit),
                    None => price,
                };
                let volume = volume_for_budget(budget, sizing_price, self.config.lot_size);
                if volume == 0 {
                    return self.reject(signal, RejectionReason::ZeroVolume);
                }
                match self.affordable_volume(volume, fill_price) {
                    0 => return self.reject(signal, RejectionReason::InsufficientCash),
                    volume => (volume, self.costs.buy_cost(fill_price, volume)),
                }
            }
            Direction::Short => {
                let held = match self.positions.get(&signal.symbol) {
                    Some(pos) if pos.volume > 0 => pos.volume,
                    _ => return self.reject(signal, RejectionReason::NoPosition),
                };
                if price * Decimal::from(held) < self.config.min_trade_value {
                    return self.reject(signal, RejectionReason::BelowMinTradeValue);
                }
                // A sell only needs cash when its commission exceeds its value.
                let shortfall = (-self.costs.sell_proceeds(fill_price, held)).max(Decimal::ZERO);
                if shortfall > self.available_cash() {
                    return self.reject(signal, RejectionReason::InsufficientCash);
                }
                (held, shortfall)
            }
        };

        let order_type = match signal.limit_price {
            Some(limit_price) => OrderType::Limit { limit_price },
            None => OrderType::Market,
        };
        let order = OrderEvent {
            symbol: signal.symbol.clone(),
            timestamp: signal.timestamp,
            order_type,
            direction: signal.direction,
            volume,
        };
        self.pending.insert(
            order.symbol.clone(),
            PendingOrder {
                direction: order.direction,
                volume,
                reserved,
            },
        );
        self.stats.orders_generated += 1;
        info!(
            symbol = %order.symbol,
            direction = %order.direction,
            volume = order.volume,
            "order generated"
        );
        Some(order)
    }

    /// Largest whole-lot volume up to `volume` whose buy cost at `price`
    /// fits in available cash.
    fn affordable_volume(&self, volume: u64, price: Decimal) -> u64 {
        let cash = self.available_cash();
        let lot = self.config.lot_size;
        let mut volume = volume;
        while volume > 0 && self.costs.buy_cost(price, volume) > cash {
            volume = volume.saturating_sub(lot);
        }
        volume
    }

    fn cash_ratio_allows_entry(&self) -> bool {
        if self.total_equity <= Decimal::ZERO {
            return false;
        }
        self.available_cash() / self.total_equity >= self.config.min_cash_ratio
    }

    /// Cash not earmarked for buy orders still in flight.
    pub fn available_cash(&self) -> Decimal {
        let reserved: Decimal = self.pending.values().map(|p| p.reserved).sum();
        (self.cash - reserved).max(Decimal::ZERO)
    }

    /// Drops the reservation of an order the execution side refused.
    pub fn release_pending(&mut self, order: &OrderEvent) {
        if self.pending.remove(&order.symbol).is_some() {
            debug!(symbol = %order.symbol, "pending order released");
        }
    }

    pub fn pending(&self) -> &BTreeMap<String, PendingOrder> {
        &self.pending
    }

    fn reject(&mut self, signal: &SignalEvent, reason: RejectionReason) -> Option<OrderEvent> {
        info!(
            symbol = %signal.symbol,
            direction = %signal.direction,
            %reason,
            "signal rejected"
        );
        self.stats.signals_rejected += 1;
        self.rejections.push(RejectedSignal {
            timestamp: signal.timestamp,
            symbol: signal.symbol.clone(),
            direction: signal.direction,
            reason,
        });
        None
    }

    // ── Fill ──

    /// Reconciles a fill into cash and positions.
    ///
    /// State is untouched when an error is returned. Any error here is an
    /// accounting invariant violation and should end the run.
    pub fn update_on_fill(&mut self, fill: &FillEvent) -> Result<(), PortfolioError> {
        if fill.volume == 0 {
            return Err(PortfolioError::EmptyFill {
                symbol: fill.symbol.clone(),
                timestamp: fill.timestamp,
            });
        }

        let held = self.position(&fill.symbol);
        if !fill.direction.is_buy() && fill.volume > held {
            return Err(PortfolioError::Oversell {
                symbol: fill.symbol.clone(),
                timestamp: fill.timestamp,
                held,
                sold: fill.volume,
            });
        }

        let cash = self.cash + fill.cash_delta();
        if cash < Decimal::ZERO {
            return Err(PortfolioError::NegativeCash {
                symbol: fill.symbol.clone(),
                timestamp: fill.timestamp,
                cash,
            });
        }
        self.cash = cash;
        self.pending.remove(&fill.symbol);

        match fill.direction {
            Direction::Long => match self.positions.get_mut(&fill.symbol) {
                Some(pos) => pos.add(fill.volume, fill.price),
                None => {
                    self.positions.insert(
                        fill.symbol.clone(),
                        Position::open(&fill.symbol, fill.volume, fill.price, fill.timestamp),
                    );
                }
            },
            Direction::Short => {
                if let Some(pos) = self.positions.get_mut(&fill.symbol) {
                    self.stats.realized_pnl +=
                        (fill.price - pos.avg_cost) * Decimal::from(fill.volume);
                    pos.volume -= fill.volume;
                    if pos.volume == 0 {
                        self.positions.remove(&fill.symbol);
                    }
                }
            }
        }

        self.stats.total_commission += fill.commission;
        self.stats.fills_processed += 1;
        self.fills.push(fill.clone());
        self.recompute_equity();
        debug!(
            symbol = %fill.symbol,
            cash = %self.cash,
            equity = %self.total_equity,
            "fill applied"
        );
        Ok(())
    }

    // ── Valuation ──

    /// Cash plus every position marked at its latest close.
    ///
    /// A position without a mark (never happens when fills follow Market
    /// events) is valued at its average cost.
    pub fn marked_equity(&self) -> Decimal {
        let held: Decimal = self
            .positions
            .values()
            .map(|pos| {
                let price = self
                    .latest_prices
                    .get(&pos.symbol)
                    .copied()
                    .unwrap_or(pos.avg_cost);
                pos.market_value(price)
            })
            .sum();
        self.cash + held
    }

    fn recompute_equity(&mut self) {
        self.total_equity = self.marked_equity();
    }

    // ── Accessors ──

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn cash(&self) -> Decimal {
        self.cash
    }

    pub fn total_equity(&self) -> Decimal {
        self.total_equity
    }

    /// Volume held in `symbol`; zero when flat.
    pub fn position(&self, symbol: &str) -> u64 {
        self.positions.get(symbol).map_or(0, |p| p.volume)
    }

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn latest_price(&self, symbol: &str) -> Option<Decimal> {
        self.latest_prices.get(symbol).copied()
    }

    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    pub fn fills(&self) -> &[FillEvent] {
        &self.fills
    }

    pub fn rejections(&self) -> &[RejectedSignal] {
        &self.rejections
    }

    pub fn stats(&self) -> &PortfolioStats {
        &self.stats
    }

    /// Splits the portfolio into its append-only ledgers.
    pub fn into_ledgers(self) -> (Vec<PortfolioSnapshot>, Vec<FillEvent>, Vec<RejectedSignal>) {
        (self.snapshots, self.fills, self.rejections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionConfig;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    fn bar(symbol: &str, day: u32, close: Decimal) -> Bar {
        Bar::new(symbol, ts(day), close, close, close, close, 10_000)
    }

    fn portfolio() -> Portfolio {
        Portfolio::new(PortfolioConfig::default()).unwrap()
    }

    fn fill(direction: Direction, volume: u64, price: Decimal, commission: Decimal) -> FillEvent {
        FillEvent {
            symbol: "X".into(),
            timestamp: ts(2),
            direction,
            volume,
            price,
            commission,
        }
    }

    // ── Construction ──

    #[test]
    fn starts_all_cash() {
        let p = portfolio();
        assert_eq!(p.cash(), dec!(100000));
        assert_eq!(p.total_equity(), dec!(100000));
        assert!(p.positions().is_empty());
    }

    #[test]
    fn rejects_non_positive_capital() {
        let err = Portfolio::new(PortfolioConfig::with_capital(dec!(0))).unwrap_err();
        assert!(matches!(err, PortfolioError::InvalidConfig(_)));
    }

    // ── Signals ──

    #[test]
    fn opening_long_sizes_to_whole_lots() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10.00)));
        let order = p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).unwrap();
        assert_eq!(order.volume, 9_000);
        assert_eq!(order.direction, Direction::Long);
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.timestamp, ts(1));
    }

    #[test]
    fn signal_without_price_is_rejected() {
        let mut p = portfolio();
        assert!(p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::NoPrice);
    }

    #[test]
    fn no_pyramiding() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 1_000, dec!(10), dec!(5))).unwrap();
        assert!(p.process_signal(&SignalEvent::long("X", ts(2), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::AlreadyHolding);
        assert_eq!(p.position("X"), 1_000);
    }

    #[test]
    fn short_without_position_is_rejected() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        assert!(p.process_signal(&SignalEvent::short("X", ts(1), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::NoPosition);
    }

    #[test]
    fn short_closes_full_position() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 500, dec!(10), dec!(5))).unwrap();
        let order = p.process_signal(&SignalEvent::short("X", ts(2), 0.1), &[]).unwrap();
        assert_eq!(order.volume, 500);
        assert_eq!(order.direction, Direction::Short);
    }

    #[test]
    fn small_close_is_rejected_below_min_trade_value() {
        let mut config = PortfolioConfig::default();
        config.min_trade_value = dec!(10000);
        let mut p = Portfolio::new(config).unwrap();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 500, dec!(10), dec!(5))).unwrap();
        assert!(p.process_signal(&SignalEvent::short("X", ts(2), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::BelowMinTradeValue);
    }

    #[test]
    fn cash_floor_blocks_new_entries() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_market(&bar("Y", 1, dec!(10)));
        // 97,000 of 100,000 committed: cash ratio ~3% < 5%.
        p.update_on_fill(&fill(Direction::Long, 9_700, dec!(10), dec!(0))).unwrap();
        assert!(p.process_signal(&SignalEvent::long("Y", ts(2), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::CashFloor);
    }

    #[test]
    fn tiny_cash_sizes_to_zero() {
        let mut p = Portfolio::new(PortfolioConfig::with_capital(dec!(500))).unwrap();
        p.update_on_market(&bar("X", 1, dec!(10)));
        assert!(p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::ZeroVolume);
    }

    #[test]
    fn second_signal_for_in_flight_order_is_rejected() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        assert!(p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).is_some());
        assert!(p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::OrderPending);
    }

    #[test]
    fn in_flight_buys_reserve_cash_for_sizing() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_market(&bar("Y", 1, dec!(10)));
        let first = p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).unwrap();
        assert_eq!(first.volume, 9_000);
        assert_eq!(p.available_cash(), dec!(10000));
        let second = p.process_signal(&SignalEvent::long("Y", ts(1), 1.0), &[]).unwrap();
        // 90% of the 10,000 left after the first reservation.
        assert_eq!(second.volume, 900);
    }

    #[test]
    fn released_order_frees_reservation() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        let order = p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).unwrap();
        p.release_pending(&order);
        assert!(p.pending().is_empty());
        assert_eq!(p.available_cash(), dec!(100000));
        assert!(p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).is_some());
    }

    #[test]
    fn fill_clears_reservation() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        let order = p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).unwrap();
        p.update_on_fill(&fill(Direction::Long, order.volume, dec!(10.01), dec!(27.03)))
            .unwrap();
        assert!(p.pending().is_empty());
        assert_eq!(p.available_cash(), p.cash());
    }

    #[test]
    fn limit_signal_becomes_limit_order() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        let signal = SignalEvent::long("X", ts(1), 1.0).with_limit(dec!(9.90));
        let order = p.process_signal(&signal, &[]).unwrap();
        assert_eq!(order.order_type, OrderType::Limit { limit_price: dec!(9.90) });
    }

    // ── Cost-aware sizing ──

    fn costed(config: PortfolioConfig) -> Portfolio {
        Portfolio::new(config)
            .unwrap()
            .with_trade_costs(ExecutionConfig::default().trade_costs())
    }

    #[test]
    fn limit_buy_above_close_is_sized_and_reserved_at_the_limit() {
        let mut p = costed(PortfolioConfig::default());
        p.update_on_market(&bar("X", 1, dec!(10)));
        let signal = SignalEvent::long("X", ts(1), 1.0).with_limit(dec!(11.50));
        let order = p.process_signal(&signal, &[]).unwrap();
        // floor(90,000 / 11.50 / 100) lots
        assert_eq!(order.volume, 7_800);
        // 89,700 + 26.91 commission
        assert_eq!(p.pending()["X"].reserved, dec!(89726.91));
        assert!(p.pending()["X"].reserved <= p.cash());
    }

    #[test]
    fn full_capital_fraction_shrinks_by_lots_to_cover_costs() {
        let mut config = PortfolioConfig::default();
        config.capital_fraction = Decimal::ONE;
        let mut p = costed(config);
        p.update_on_market(&bar("X", 1, dec!(10)));
        let order = p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).unwrap();
        // 10,000 shares at 10.01 plus commission would cost 100,130.03.
        assert_eq!(order.volume, 9_900);
        assert_eq!(p.pending()["X"].reserved, dec!(99128.73));
        assert!(p.available_cash() >= Decimal::ZERO);
    }

    #[test]
    fn minimum_commission_beyond_cash_rejects_the_buy() {
        let mut p = costed(PortfolioConfig::with_capital(dec!(50)));
        p.update_on_market(&bar("X", 1, dec!(0.45)));
        assert!(p.process_signal(&SignalEvent::long("X", ts(1), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::InsufficientCash);
        assert!(p.pending().is_empty());
        assert_eq!(p.stats().orders_generated, 0);
    }

    #[test]
    fn sell_whose_commission_exceeds_cash_is_rejected() {
        let mut p = costed(PortfolioConfig::with_capital(dec!(1000)));
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 100, dec!(9.97), dec!(3))).unwrap();
        assert_eq!(p.cash(), Decimal::ZERO);
        p.update_on_market(&bar("X", 2, dec!(0.03)));
        assert!(p.process_signal(&SignalEvent::short("X", ts(2), 1.0), &[]).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::InsufficientCash);
        assert_eq!(p.position("X"), 100);
    }

    #[test]
    fn sell_reserves_commission_shortfall() {
        let mut p = costed(PortfolioConfig::with_capital(dec!(1000)));
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 100, dec!(9.97), dec!(0))).unwrap();
        assert_eq!(p.cash(), dec!(3));
        p.update_on_market(&bar("X", 2, dec!(0.03)));
        let order = p.process_signal(&SignalEvent::short("X", ts(2), 1.0), &[]).unwrap();
        assert_eq!(order.volume, 100);
        // 100 * 0.02997 = 2.997 against a 5.00 minimum commission.
        assert_eq!(p.pending()["X"].reserved, dec!(2.003));
        assert_eq!(p.available_cash(), dec!(0.997));
    }

    #[test]
    fn frictionless_by_default() {
        let p = portfolio();
        assert_eq!(*p.trade_costs(), TradeCosts::frictionless());
    }

    // ── Volatility sizing ──

    fn atr_portfolio(period: usize) -> Portfolio {
        let config = PortfolioConfig {
            sizing: SizingPolicy::Atr {
                period,
                base_risk_amount: dec!(10000),
                risk_per_unit: dec!(0.01),
            },
            ..PortfolioConfig::default()
        };
        Portfolio::new(config).unwrap()
    }

    fn ranged(day: u32, low: Decimal, high: Decimal, close: Decimal) -> Bar {
        Bar::new("X", ts(day), close, high, low, close, 10_000)
    }

    #[test]
    fn atr_sizing_rejects_short_history() {
        let mut p = atr_portfolio(3);
        let history = vec![
            ranged(1, dec!(9.5), dec!(10.5), dec!(10)),
            ranged(2, dec!(9.5), dec!(10.5), dec!(10)),
        ];
        p.update_on_market(&history[1]);
        assert!(p.process_signal(&SignalEvent::long("X", ts(2), 1.0), &history).is_none());
        assert_eq!(p.rejections()[0].reason, RejectionReason::InsufficientHistory);
    }

    #[test]
    fn atr_sizing_uses_history_window() {
        let mut p = atr_portfolio(3);
        // True range 1.00 on both later bars: ATR 1.00 at a close of 10.
        let history = vec![
            ranged(1, dec!(9.5), dec!(10.5), dec!(10)),
            ranged(2, dec!(9.5), dec!(10.5), dec!(10)),
            ranged(3, dec!(9.5), dec!(10.5), dec!(10)),
        ];
        p.update_on_market(&history[2]);
        let order = p
            .process_signal(&SignalEvent::long("X", ts(3), 1.0), &history)
            .unwrap();
        // 10,000 / 0.1 * 0.01 = 1,000 of budget at 10.00
        assert_eq!(order.volume, 100);
    }

    // ── Fills ──

    #[test]
    fn buy_fill_debits_value_and_commission() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 9_000, dec!(10.01), dec!(27.03))).unwrap();
        assert_eq!(p.cash(), dec!(100000) - dec!(90090) - dec!(27.03));
        assert_eq!(p.position("X"), 9_000);
        assert_eq!(p.positions()["X"].avg_cost, dec!(10.01));
        // Marked at the close, not the fill price.
        assert_eq!(p.total_equity(), p.cash() + dec!(90000));
    }

    #[test]
    fn sell_fill_credits_value_minus_commission() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 500, dec!(10), dec!(5))).unwrap();
        let before = p.cash();
        p.update_on_fill(&fill(Direction::Short, 500, dec!(9.80), dec!(5.00))).unwrap();
        assert_eq!(p.cash() - before, dec!(4895.00));
        assert_eq!(p.position("X"), 0);
        assert!(p.positions().get("X").is_none());
        assert_eq!(p.stats().realized_pnl, dec!(-100));
        assert_eq!(p.stats().total_commission, dec!(10));
    }

    #[test]
    fn overdrawing_fill_is_fatal_and_leaves_state() {
        let mut p = Portfolio::new(PortfolioConfig::with_capital(dec!(1000))).unwrap();
        p.update_on_market(&bar("X", 1, dec!(10)));
        let err = p
            .update_on_fill(&fill(Direction::Long, 100, dec!(10), dec!(5)))
            .unwrap_err();
        assert!(matches!(err, PortfolioError::NegativeCash { .. }));
        assert_eq!(p.cash(), dec!(1000));
        assert_eq!(p.position("X"), 0);
    }

    #[test]
    fn overselling_is_fatal() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        let err = p
            .update_on_fill(&fill(Direction::Short, 100, dec!(10), dec!(5)))
            .unwrap_err();
        assert!(matches!(err, PortfolioError::Oversell { held: 0, sold: 100, .. }));
    }

    #[test]
    fn zero_volume_fill_is_fatal() {
        let mut p = portfolio();
        let err = p
            .update_on_fill(&fill(Direction::Long, 0, dec!(10), dec!(0)))
            .unwrap_err();
        assert!(matches!(err, PortfolioError::EmptyFill { .. }));
    }

    // ── Valuation ──

    #[test]
    fn market_updates_remark_positions_and_snapshot() {
        let mut p = portfolio();
        p.update_on_market(&bar("X", 1, dec!(10)));
        p.update_on_fill(&fill(Direction::Long, 1_000, dec!(10), dec!(0))).unwrap();
        p.update_on_market(&bar("X", 2, dec!(12)));
        assert_eq!(p.total_equity(), dec!(102000));
        assert_eq!(p.total_equity(), p.marked_equity());

        let snaps = p.snapshots();
        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].positions.get("X"), None);
        assert_eq!(snaps[1].positions.get("X"), Some(&1_000));
        assert_eq!(snaps[1].total_equity, dec!(102000));
    }
}
