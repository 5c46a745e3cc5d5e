//! The closed set of events that flow through the engine queue.

use super::bar::Bar;
use super::fill::FillEvent;
use super::order::OrderEvent;
use super::signal::SignalEvent;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// New bar visible for one instrument. Only the data cursor creates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    pub bar: Bar,
}

impl MarketEvent {
    pub fn symbol(&self) -> &str {
        &self.bar.symbol
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.bar.timestamp
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Market,
    Signal,
    Order,
    Fill,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::Market => "MARKET",
            EventKind::Signal => "SIGNAL",
            EventKind::Order => "ORDER",
            EventKind::Fill => "FILL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Market(MarketEvent),
    Signal(SignalEvent),
    Order(OrderEvent),
    Fill(FillEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Market(_) => EventKind::Market,
            Event::Signal(_) => EventKind::Signal,
            Event::Order(_) => EventKind::Order,
            Event::Fill(_) => EventKind::Fill,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Event::Market(e) => e.timestamp(),
            Event::Signal(e) => e.timestamp,
            Event::Order(e) => e.timestamp,
            Event::Fill(e) => e.timestamp,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Event::Market(e) => e.symbol(),
            Event::Signal(e) => &e.symbol,
            Event::Order(e) => &e.symbol,
            Event::Fill(e) => &e.symbol,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.kind(), self.symbol(), self.timestamp())?;
        match self {
            Event::Market(e) => write!(f, " close={}", e.bar.close),
            Event::Signal(e) => write!(f, " {} strength={}", e.direction, e.strength),
            Event::Order(e) => write!(f, " {} {} {:?}", e.direction, e.volume, e.order_type),
            Event::Fill(e) => write!(
                f,
                " {} {}@{} commission={}",
                e.direction, e.volume, e.price, e.commission
            ),
        }
    }
}

impl From<MarketEvent> for Event {
    fn from(e: MarketEvent) -> Self {
        Event::Market(e)
    }
}

impl From<SignalEvent> for Event {
    fn from(e: SignalEvent) -> Self {
        Event::Signal(e)
    }
}

impl From<OrderEvent> for Event {
    fn from(e: OrderEvent) -> Self {
        Event::Order(e)
    }
}

impl From<FillEvent> for Event {
    fn from(e: FillEvent) -> Self {
        Event::Fill(e)
    }
}
