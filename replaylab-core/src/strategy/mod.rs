//! Strategy interface: portfolio-agnostic signal generation.
//!
//! A strategy sees one Market event and a read-only view of bars already
//! replayed. It never sees cash, positions or orders, and it cannot mutate
//! the view: `DataView` has no mutating methods.

pub mod examples;

pub use examples::{MomentumStrategy, MovingAverageCross};

use crate::data::DataView;
use crate::domain::{MarketEvent, SignalEvent};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("invalid strategy parameter: {0}")]
    InvalidParameter(String),

    #[error("strategy failed: {0}")]
    Failed(String),
}

/// Signal generator driven by Market events.
///
/// # Invariants
/// - `on_market()` MUST NOT depend on portfolio state
/// - `on_market()` MUST be deterministic for the same event sequence
/// - Emitted signals carry the event's instrument universe and a timestamp
///   no later than the event being processed
pub trait Strategy: Send + Sync {
    fn on_market(
        &self,
        event: &MarketEvent,
        view: &dyn DataView,
    ) -> Result<Vec<SignalEvent>, StrategyError>;

    /// Strategy name for logs and reports
    fn name(&self) -> &str;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn on_market(
        &self,
        event: &MarketEvent,
        view: &dyn DataView,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        (**self).on_market(event, view)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Wraps a closure as a strategy.
pub struct FnStrategy<F> {
    name: String,
    f: F,
}

impl<F> FnStrategy<F>
where
    F: Fn(&MarketEvent, &dyn DataView) -> Result<Vec<SignalEvent>, StrategyError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: Fn(&MarketEvent, &dyn DataView) -> Result<Vec<SignalEvent>, StrategyError> + Send + Sync,
{
    fn on_market(
        &self,
        event: &MarketEvent,
        view: &dyn DataView,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        (self.f)(event, view)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Never signals. Useful as a buy-nothing benchmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStrategy;

impl Strategy for NullStrategy {
    fn on_market(
        &self,
        _event: &MarketEvent,
        _view: &dyn DataView,
    ) -> Result<Vec<SignalEvent>, StrategyError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "null"
    }
}
