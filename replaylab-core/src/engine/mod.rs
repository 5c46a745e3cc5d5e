//! Backtest engine: event queue, dispatcher and run bookkeeping.
//!
//! The engine owns the cursor, the strategy, the portfolio and the execution
//! simulator for one run. It is single-threaded and deterministic: the same
//! inputs always produce the same ledgers.

pub mod error;
pub mod event_loop;
pub mod state;

pub use error::{Component, EngineError};
pub use event_loop::Engine;
pub use state::{EngineState, EngineStats, EngineStatus, EventRecord, RunResult};
