//! Record model: bars and the four event kinds.

pub mod bar;
pub mod event;
pub mod fill;
pub mod order;
pub mod position;
pub mod signal;

pub use bar::{Bar, BarError};
pub use event::{Event, EventKind, MarketEvent};
pub use fill::FillEvent;
pub use order::{Direction, OrderEvent, OrderType};
pub use position::Position;
pub use signal::SignalEvent;
